use geo::Line;
use geo_types::{Coord, LineString};
use smallvec::SmallVec;
use std::collections::HashMap;

use crate::utils::parallel;

// Type aliases for indices to ensure we don't mix them up
pub type NodeId = usize;
pub type EdgeId = usize;
pub type DirEdgeId = usize;

/// Delaunay nodes average six incident edges.
pub type Outgoing = SmallVec<[DirEdgeId; 8]>;

#[derive(Clone, Debug)]
pub struct Node {
    pub coordinate: Coord<f64>,
    /// Indices of outgoing DirectedEdges.
    /// CRITICAL INVARIANT: Sorted by polar angle (CCW) once `sort_edges` ran.
    pub outgoing_edges: Outgoing,
    /// Live (unmarked) incident edges.
    pub degree: usize,
    /// Removed while pruning dangles.
    pub is_marked: bool,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub line: Line<f64>,
    // Indices of the two directed edges associated with this undirected edge.
    pub dir_edges: [DirEdgeId; 2],
    pub is_marked: bool,
}

#[derive(Clone, Debug)]
pub struct DirectedEdge {
    pub src: NodeId,
    pub dst: NodeId,
    /// Reference to the parent geometry (undirected edge)
    pub edge_idx: EdgeId,
    /// Index of the symmetric (reverse) edge
    pub sym_idx: DirEdgeId,
    /// Precomputed angle for efficient sorting
    pub angle: f64,
    /// Traversal state: has this edge been processed into a ring?
    pub is_visited: bool,
    /// Dangle or cut edge, excluded from ring building.
    pub is_marked: bool,
}

/// A traced ring: the directed edges walked, in order.
#[derive(Clone, Debug)]
pub struct TracedRing {
    pub dir_edges: Vec<DirEdgeId>,
    /// False when the walk ran into an already visited edge before closing.
    pub is_closed: bool,
}

pub struct PlanarGraph {
    /// All nodes in the graph. Index is `NodeId`.
    pub nodes: Vec<Node>,
    /// All undirected edges (geometry owners). Index is `EdgeId`.
    pub edges: Vec<Edge>,
    /// All directed half-edges. Index is `DirEdgeId`.
    pub directed_edges: Vec<DirectedEdge>,
    /// Lookup map to dedup nodes during incremental construction.
    /// Bulk load bypasses this.
    pub node_map: HashMap<NodeKey, NodeId>,
}

// Wrapper for Coord to be Hashable (since f64 is not Hash)
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct NodeKey(u64, u64);

impl From<Coord<f64>> for NodeKey {
    fn from(c: Coord<f64>) -> Self {
        // Normalise -0.0 so it keys like 0.0.
        NodeKey((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
    }
}

fn cmp_coord(a: &Coord<f64>, b: &Coord<f64>) -> std::cmp::Ordering {
    a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
}

fn is_degenerate(p0: Coord<f64>, p1: Coord<f64>) -> bool {
    (p0.x - p1.x).abs() < 1e-12 && (p0.y - p1.y).abs() < 1e-12
}

impl Default for PlanarGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanarGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            directed_edges: Vec::new(),
            node_map: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, coord: Coord<f64>) -> NodeId {
        let key = NodeKey::from(coord);
        if let Some(&id) = self.node_map.get(&key) {
            return id;
        }

        let id = self.nodes.len();
        self.nodes.push(Node {
            coordinate: coord,
            outgoing_edges: Outgoing::new(),
            degree: 0,
            is_marked: false,
        });
        self.node_map.insert(key, id);
        id
    }

    fn push_edge(&mut self, u: NodeId, v: NodeId, line: Line<f64>) {
        let p0 = line.start;
        let p1 = line.end;

        let edge_idx = self.edges.len();
        let de_u_v_idx = self.directed_edges.len();
        let de_v_u_idx = self.directed_edges.len() + 1;

        self.directed_edges.push(DirectedEdge {
            src: u,
            dst: v,
            edge_idx,
            sym_idx: de_v_u_idx,
            angle: (p1.y - p0.y).atan2(p1.x - p0.x),
            is_visited: false,
            is_marked: false,
        });
        self.directed_edges.push(DirectedEdge {
            src: v,
            dst: u,
            edge_idx,
            sym_idx: de_u_v_idx,
            angle: (p0.y - p1.y).atan2(p0.x - p1.x),
            is_visited: false,
            is_marked: false,
        });
        self.edges.push(Edge {
            line,
            dir_edges: [de_u_v_idx, de_v_u_idx],
            is_marked: false,
        });

        self.nodes[u].outgoing_edges.push(de_u_v_idx);
        self.nodes[u].degree += 1;
        self.nodes[v].outgoing_edges.push(de_v_u_idx);
        self.nodes[v].degree += 1;
    }

    /// Bulk loads edges into an empty graph.
    /// Faster than `add_line_string` for large inputs as it avoids HashMap lookups;
    /// segment endpoints must match exactly where they meet (noded input).
    pub fn bulk_load(&mut self, lines: Vec<Line<f64>>) {
        if lines.is_empty() {
            return;
        }

        let mut coords = Vec::with_capacity(lines.len() * 2);
        for line in &lines {
            coords.push(line.start);
            coords.push(line.end);
        }
        coords.sort_by(cmp_coord);
        coords.dedup();

        let start_node_idx = self.nodes.len();
        for coord in &coords {
            self.nodes.push(Node {
                coordinate: *coord,
                outgoing_edges: Outgoing::new(),
                degree: 0,
                is_marked: false,
            });
        }

        // coords is sorted, so node lookup is a binary search
        let get_node_id = |pt: Coord<f64>| -> Option<NodeId> {
            coords
                .binary_search_by(|c| cmp_coord(c, &pt))
                .ok()
                .map(|i| start_node_idx + i)
        };

        self.edges.reserve(lines.len());
        self.directed_edges.reserve(lines.len() * 2);

        for line in lines {
            if is_degenerate(line.start, line.end) {
                continue;
            }
            let (Some(u), Some(v)) = (get_node_id(line.start), get_node_id(line.end)) else {
                continue;
            };
            self.push_edge(u, v, line);
        }
    }

    /// Adds a line string to the graph.
    /// Assumes the line string is properly noded.
    pub fn add_line_string(&mut self, line: LineString<f64>) {
        for segment in line.lines() {
            if is_degenerate(segment.start, segment.end) {
                continue;
            }
            let u = self.add_node(segment.start);
            let v = self.add_node(segment.end);
            self.push_edge(u, v, segment);
        }
    }

    /// Sorts all outgoing edges of all nodes by angle.
    pub fn sort_edges(&mut self) {
        let directed_edges = &self.directed_edges;
        parallel::iterate_mut(&mut self.nodes, |node| {
            node.outgoing_edges.sort_by(|&a_idx, &b_idx| {
                let a = &directed_edges[a_idx];
                let b = &directed_edges[b_idx];
                a.angle.total_cmp(&b.angle)
            });
        });
    }

    fn mark_edge(&mut self, edge_idx: EdgeId) {
        self.edges[edge_idx].is_marked = true;
        let [a, b] = self.edges[edge_idx].dir_edges;
        self.directed_edges[a].is_marked = true;
        self.directed_edges[b].is_marked = true;
    }

    /// Prunes dangles (chains ending in a degree-1 node) from the graph
    /// iteratively. Returns the removed segments.
    pub fn prune_dangles(&mut self) -> Vec<Line<f64>> {
        let mut dangles = Vec::new();
        let mut to_process: Vec<NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.degree == 1 && !n.is_marked)
            .map(|(i, _)| i)
            .collect();

        while let Some(node_idx) = to_process.pop() {
            if self.nodes[node_idx].degree != 1 {
                continue;
            }

            self.nodes[node_idx].is_marked = true;
            self.nodes[node_idx].degree = 0;

            let found = self.nodes[node_idx]
                .outgoing_edges
                .iter()
                .copied()
                .find(|&de_idx| !self.directed_edges[de_idx].is_marked);

            let Some(de_idx) = found else {
                continue;
            };
            let edge_idx = self.directed_edges[de_idx].edge_idx;
            let neighbor_idx = self.directed_edges[de_idx].dst;
            self.mark_edge(edge_idx);
            dangles.push(self.edges[edge_idx].line);

            let neighbor = &mut self.nodes[neighbor_idx];
            if neighbor.degree > 0 {
                neighbor.degree -= 1;
                if neighbor.degree == 1 && !neighbor.is_marked {
                    to_process.push(neighbor_idx);
                }
            }
        }
        dangles
    }

    /// Next half-edge of the ring arriving through `de_idx`: the left-most
    /// turn, i.e. the unmarked edge just clockwise of the way back.
    fn next_in_ring(&self, de_idx: DirEdgeId) -> Option<DirEdgeId> {
        let de = &self.directed_edges[de_idx];
        let outgoing = &self.nodes[de.dst].outgoing_edges;
        let len = outgoing.len();
        let pos = outgoing.iter().position(|&idx| idx == de.sym_idx)?;

        (1..=len)
            .map(|i| outgoing[(pos + len - i) % len])
            .find(|&candidate| !self.directed_edges[candidate].is_marked)
    }

    fn trace_rings(&mut self) -> Vec<TracedRing> {
        for de in &mut self.directed_edges {
            de.is_visited = false;
        }

        let mut rings = Vec::new();
        for start in 0..self.directed_edges.len() {
            if self.directed_edges[start].is_visited || self.directed_edges[start].is_marked {
                continue;
            }

            let mut ring = Vec::new();
            let mut curr = start;
            let is_closed = loop {
                self.directed_edges[curr].is_visited = true;
                ring.push(curr);

                let Some(next) = self.next_in_ring(curr) else {
                    break false;
                };
                if next == start {
                    break true;
                }
                if self.directed_edges[next].is_visited {
                    break false;
                }
                curr = next;
            };

            rings.push(TracedRing {
                dir_edges: ring,
                is_closed,
            });
        }
        rings
    }

    /// Marks edges whose two sides lie on the same ring. In a planar graph
    /// those are exactly the bridges between otherwise separate rings.
    /// Returns the removed segments.
    pub fn mark_cut_edges(&mut self) -> Vec<Line<f64>> {
        let rings = self.trace_rings();
        let mut ring_of = vec![usize::MAX; self.directed_edges.len()];
        for (ring_id, ring) in rings.iter().enumerate() {
            for &de in &ring.dir_edges {
                ring_of[de] = ring_id;
            }
        }

        let mut cut = Vec::new();
        for edge_idx in 0..self.edges.len() {
            if self.edges[edge_idx].is_marked {
                continue;
            }
            let [a, b] = self.edges[edge_idx].dir_edges;
            if ring_of[a] != usize::MAX && ring_of[a] == ring_of[b] {
                self.mark_edge(edge_idx);
                cut.push(self.edges[edge_idx].line);

                let (src, dst) = (self.directed_edges[a].src, self.directed_edges[a].dst);
                self.nodes[src].degree = self.nodes[src].degree.saturating_sub(1);
                self.nodes[dst].degree = self.nodes[dst].degree.saturating_sub(1);
            }
        }
        cut
    }

    fn ring_coords(&self, dir_edges: &[DirEdgeId]) -> LineString<f64> {
        let mut coords = Vec::with_capacity(dir_edges.len() + 1);
        let start_node_idx = self.directed_edges[dir_edges[0]].src;
        coords.push(self.nodes[start_node_idx].coordinate);
        for &de_idx in dir_edges {
            coords.push(self.nodes[self.directed_edges[de_idx].dst].coordinate);
        }
        LineString::new(coords)
    }

    /// Extracts rings from the graph using the left-most turn rule.
    /// Bounded faces come out counter-clockwise, the outer boundary of each
    /// connected component clockwise.
    pub fn get_edge_rings(&mut self) -> Vec<LineString<f64>> {
        self.get_all_rings().0
    }

    /// Like `get_edge_rings`, also returning walks that failed to close.
    pub fn get_all_rings(&mut self) -> (Vec<LineString<f64>>, Vec<LineString<f64>>) {
        let mut closed = Vec::new();
        let mut open = Vec::new();
        for ring in self.trace_rings() {
            if ring.dir_edges.is_empty() {
                continue;
            }
            let coords = self.ring_coords(&ring.dir_edges);
            if ring.is_closed {
                closed.push(coords);
            } else {
                open.push(coords);
            }
        }
        (closed, open)
    }

    /// Merges edges into maximal lines. A line runs through nodes of
    /// degree two and stops at every other node; isolated cycles come out
    /// as closed lines. Marks are ignored.
    pub fn merge_lines(&self) -> Vec<LineString<f64>> {
        let mut used = vec![false; self.edges.len()];
        let mut merged = Vec::new();

        let walk = |start: DirEdgeId, used: &mut Vec<bool>| -> LineString<f64> {
            let mut coords = vec![self.nodes[self.directed_edges[start].src].coordinate];
            let mut curr = start;
            loop {
                let de = &self.directed_edges[curr];
                used[de.edge_idx] = true;
                let node = &self.nodes[de.dst];
                coords.push(node.coordinate);

                if node.outgoing_edges.len() != 2 {
                    break;
                }
                let next = node.outgoing_edges[0];
                let next = if next == de.sym_idx {
                    node.outgoing_edges[1]
                } else {
                    next
                };
                if used[self.directed_edges[next].edge_idx] {
                    break;
                }
                curr = next;
            }
            LineString::new(coords)
        };

        for node in &self.nodes {
            if node.outgoing_edges.len() == 2 {
                continue;
            }
            for &de_idx in &node.outgoing_edges {
                if !used[self.directed_edges[de_idx].edge_idx] {
                    merged.push(walk(de_idx, &mut used));
                }
            }
        }

        // Whatever is left forms cycles through degree-2 nodes only.
        for edge_idx in 0..self.edges.len() {
            if !used[edge_idx] {
                merged.push(walk(self.edges[edge_idx].dir_edges[0], &mut used));
            }
        }

        merged
    }
}
