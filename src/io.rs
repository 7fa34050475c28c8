//! GeoJSON point source and result sinks.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use geo_types::LineString;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};
use serde_json::json;

use crate::error::{NaturalCitiesError, Result};
use crate::model::{Crs, Hierarchy, Point, PointSet};

/// Reads a GeoJSON file of `Point` / `MultiPoint` geometries.
pub fn read_points(path: impl AsRef<Path>) -> Result<PointSet> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let geojson: GeoJson = serde_json::from_reader(reader)
        .map_err(|e| NaturalCitiesError::InputRead(format!("{}: {}", path.display(), e)))?;
    points_from_geojson(&geojson)
}

pub fn points_from_str(s: &str) -> Result<PointSet> {
    let geojson: GeoJson = s
        .parse()
        .map_err(|e| NaturalCitiesError::InputRead(format!("{}", e)))?;
    points_from_geojson(&geojson)
}

/// Collects every point of `geojson`. A numeric feature id, or a numeric
/// `id` property, becomes the point id. A point without one takes its
/// position in the output, or the next id above it that no other point
/// claims.
pub fn points_from_geojson(geojson: &GeoJson) -> Result<PointSet> {
    let mut reader = PointReader::default();
    let crs = match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                reader.read_feature(feature)?;
            }
            crs_of(fc.foreign_members.as_ref())
        }
        GeoJson::Feature(feature) => {
            reader.read_feature(feature)?;
            crs_of(feature.foreign_members.as_ref())
        }
        GeoJson::Geometry(geometry) => {
            reader.read_value(&geometry.value, None)?;
            crs_of(geometry.foreign_members.as_ref())
        }
    };

    if reader.records.is_empty() {
        return Err(NaturalCitiesError::InputRead(
            "input contains no points".into(),
        ));
    }
    if reader.skipped > 0 {
        log::warn!("skipped {} non-point geometries", reader.skipped);
    }
    Ok(PointSet::new(reader.into_points()?, crs))
}

#[derive(Default)]
struct PointReader {
    /// Explicit id (if any) and position, in input order.
    records: Vec<(Option<u64>, f64, f64)>,
    skipped: usize,
}

impl PointReader {
    fn read_feature(&mut self, feature: &Feature) -> Result<()> {
        let Some(geometry) = &feature.geometry else {
            self.skipped += 1;
            return Ok(());
        };
        let id = match &feature.id {
            Some(Id::Number(n)) => n.as_u64(),
            _ => feature.property("id").and_then(JsonValue::as_u64),
        };
        self.read_value(&geometry.value, id)
    }

    fn read_value(&mut self, value: &Value, id: Option<u64>) -> Result<()> {
        match value {
            Value::Point(position) => self.push(position, id),
            // members of a multipoint cannot share the feature id
            Value::MultiPoint(positions) => positions.iter().try_for_each(|p| self.push(p, None)),
            Value::GeometryCollection(geometries) => geometries
                .iter()
                .try_for_each(|g| self.read_value(&g.value, None)),
            _ => {
                self.skipped += 1;
                Ok(())
            }
        }
    }

    fn push(&mut self, position: &[f64], id: Option<u64>) -> Result<()> {
        let (x, y) = match position {
            [x, y, ..] if x.is_finite() && y.is_finite() => (*x, *y),
            _ => {
                return Err(NaturalCitiesError::InputRead(format!(
                    "invalid position {:?}",
                    position
                )))
            }
        };
        self.records.push((id, x, y));
        Ok(())
    }

    fn into_points(self) -> Result<Vec<Point>> {
        let mut taken = HashSet::with_capacity(self.records.len());
        for id in self.records.iter().filter_map(|(id, _, _)| *id) {
            if !taken.insert(id) {
                return Err(NaturalCitiesError::InputRead(format!(
                    "duplicate point id {}",
                    id
                )));
            }
        }

        let mut points = Vec::with_capacity(self.records.len());
        for (position, (id, x, y)) in self.records.into_iter().enumerate() {
            let id = match id {
                Some(id) => id,
                None => {
                    let mut candidate = position as u64;
                    while !taken.insert(candidate) {
                        candidate += 1;
                    }
                    candidate
                }
            };
            points.push(Point::new(id, x, y));
        }
        Ok(points)
    }
}

/// Name from a legacy `"crs": {"type": "name", "properties": {"name": ..}}` member.
fn crs_of(foreign_members: Option<&JsonObject>) -> Crs {
    let name = foreign_members
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(JsonValue::as_str);
    Crs(name.map(str::to_owned))
}

fn crs_members(crs: &Crs) -> Option<JsonObject> {
    let name = crs.0.as_ref()?;
    let mut members = JsonObject::new();
    members.insert(
        "crs".to_string(),
        json!({ "type": "name", "properties": { "name": name } }),
    );
    Some(members)
}

fn feature(value: Value, properties: JsonValue) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: match properties {
            JsonValue::Object(map) => Some(map),
            _ => None,
        },
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>, crs: &Crs) -> GeoJson {
    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: crs_members(crs),
    })
}

/// Every polygon of every level.
pub fn polygons_to_geojson(hierarchy: &Hierarchy) -> GeoJson {
    let features = hierarchy
        .polygons()
        .map(|p| {
            feature(
                Value::from(&p.geometry),
                json!({
                    "level": p.level,
                    "poly_id": p.poly_id,
                    "parent_poly_id": p.parent_poly_id,
                    "member_count": p.member_count,
                }),
            )
        })
        .collect();
    collection(features, &hierarchy.crs)
}

/// The retained linework of every level, with edge lengths.
pub fn linework_to_geojson(hierarchy: &Hierarchy) -> GeoJson {
    let features = hierarchy
        .linework()
        .map(|e| {
            let line = LineString::new(vec![e.edge.line.start, e.edge.line.end]);
            feature(
                Value::from(&line),
                json!({
                    "level": e.level,
                    "edge_id": e.edge_id,
                    "parent_poly_id": e.parent_poly_id,
                    "from": e.edge.from.0,
                    "to": e.edge.to.0,
                    "length": e.edge.length,
                }),
            )
        })
        .collect();
    collection(features, &hierarchy.crs)
}

/// The input points, each with its `poly_id` at every level it reached.
pub fn membership_to_geojson(points: &PointSet, hierarchy: &Hierarchy) -> GeoJson {
    let table = hierarchy.membership_table();
    let features = points
        .points
        .iter()
        .map(|p| {
            let poly_ids = table.get(&p.id).cloned().unwrap_or_default();
            let mut f = feature(
                Value::Point(vec![p.coord.x, p.coord.y]),
                json!({
                    "depth": poly_ids.len(),
                    "poly_ids": poly_ids,
                }),
            );
            f.id = Some(Id::Number(p.id.0.into()));
            f
        })
        .collect();
    collection(features, &hierarchy.crs)
}

pub fn write_geojson(path: impl AsRef<Path>, geojson: &GeoJson) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, geojson)?;
    Ok(())
}
