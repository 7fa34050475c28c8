use clap::Parser;
use natural_cities::io::{
    linework_to_geojson, membership_to_geojson, polygons_to_geojson, read_points, write_geojson,
};
use natural_cities::{HierarchyConfig, LengthMetric, LevelHierarchyBuilder};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input GeoJSON file (Points)
    #[arg(short, long)]
    input: PathBuf,

    /// Output GeoJSON file (Polygons of every level)
    #[arg(short, long, alias = "out_path")]
    output: PathBuf,

    /// Also write the retained linework of every level
    #[arg(long)]
    lines: Option<PathBuf>,

    /// Also write the points with their poly_id at each level
    #[arg(long)]
    membership: Option<PathBuf>,

    /// Maximum number of levels
    #[arg(short, long, default_value_t = 3)]
    depth: usize,

    /// A polygon is recursed into only if it holds more points than this
    #[arg(long, default_value_t = 500)]
    min_cluster_size: usize,

    /// Measure edges in metres on lon/lat input
    #[arg(long, default_value_t = false)]
    geodesic: bool,

    /// Count edges shared by two triangles once in the mean length
    #[arg(long, default_value_t = false)]
    dedup_edges: bool,

    /// Snap-round the linework to this grid size before polygonizing
    #[arg(long)]
    snap_grid: Option<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    log::info!("Reading points from {:?}", args.input);
    let points = read_points(&args.input)?;
    log::info!("Loaded {} points", points.len());

    let mut config = HierarchyConfig::new(args.depth, args.min_cluster_size)
        .with_dedup_edges(args.dedup_edges);
    if args.geodesic {
        config = config.with_length_metric(LengthMetric::Haversine);
    }
    if let Some(grid) = args.snap_grid {
        config = config.with_snap_grid(grid);
    }

    let hierarchy = LevelHierarchyBuilder::new(config).build(&points)?;
    log::info!(
        "Built {} levels, {} polygons",
        hierarchy.depth(),
        hierarchy.polygons().count()
    );

    write_geojson(&args.output, &polygons_to_geojson(&hierarchy))?;
    log::info!("Wrote polygons to {:?}", args.output);

    if let Some(path) = &args.lines {
        write_geojson(path, &linework_to_geojson(&hierarchy))?;
        log::info!("Wrote linework to {:?}", path);
    }
    if let Some(path) = &args.membership {
        write_geojson(path, &membership_to_geojson(&points, &hierarchy))?;
        log::info!("Wrote membership to {:?}", path);
    }

    Ok(())
}
