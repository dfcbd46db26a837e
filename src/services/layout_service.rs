//! Dual-hub cluster layout
//!
//! Focal nodes sit on fixed anchors. Neighbors unique to one focal node fan out
//! on a half circle facing away from the other, shared neighbors stack on the
//! vertical bisector, and anything left over gets a seeded spring layout around
//! the origin. Parallel edges get increasing curvature so they render apart.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::f64::consts::FRAC_PI_2;
use tracing::debug;

use crate::models::{Address, ClusterPartition, EdgeLayout, LayoutResult, Point};
use crate::services::graph_service::{NodeKind, TransactionGraph};

pub const FOCAL1_ANCHOR: Point = Point { x: -2.0, y: 0.0 };
pub const FOCAL2_ANCHOR: Point = Point { x: 2.0, y: 0.0 };
pub const CLUSTER_RADIUS: f64 = 1.0;
const COMMON_COLUMN_HEIGHT: f64 = 4.0;
const CURVATURE_STEP: f64 = 0.1;
/// A quadratic arc peaks at half its control-point offset
const LABEL_PEAK_FACTOR: f64 = 0.5;

const SPRING_ITERATIONS: usize = 50;
const SPRING_THRESHOLD: f64 = 1e-4;
const SPRING_SEED: u64 = 42;
const MIN_DISTANCE: f64 = 0.01;

/// Lay out the graph around the two focal addresses. Deterministic.
pub fn compute_layout(graph: &TransactionGraph, focal1: &Address, focal2: &Address) -> LayoutResult {
    if graph.node_count() == 0 {
        return LayoutResult::default();
    }

    let mut positions = BTreeMap::new();
    if graph.contains(focal1.as_str()) {
        positions.insert(focal1.to_string(), FOCAL1_ANCHOR);
    }
    if focal2 != focal1 && graph.contains(focal2.as_str()) {
        positions.insert(focal2.to_string(), FOCAL2_ANCHOR);
    }

    let partition = partition_nodes(graph, focal1, focal2);

    arrange_arc(&partition.unique1, FOCAL1_ANCHOR, CLUSTER_RADIUS, FRAC_PI_2, 3.0 * FRAC_PI_2, &mut positions);
    // Swept clockwise so the right cluster mirrors the left one
    arrange_arc(&partition.unique2, FOCAL2_ANCHOR, CLUSTER_RADIUS, FRAC_PI_2, -FRAC_PI_2, &mut positions);
    arrange_column(&partition.common, &mut positions);

    if !partition.unplaced.is_empty() {
        debug!("Spring layout for {} unplaced nodes", partition.unplaced.len());
        positions.extend(spring_layout(graph, &partition.unplaced, Point::ORIGIN));
    }

    let edges = edge_layouts(graph, &positions);
    let labels = graph
        .nodes()
        .filter(|n| n.kind == NodeKind::Focal)
        .filter_map(|n| Some((n.address.clone(), n.label.clone()?)))
        .collect();

    LayoutResult {
        positions,
        edges,
        partition,
        labels,
    }
}

/// Classify non-focal nodes by which focal nodes they touch directly
pub fn partition_nodes(graph: &TransactionGraph, focal1: &Address, focal2: &Address) -> ClusterPartition {
    let is_focal = |n: &str| n == focal1.as_str() || n == focal2.as_str();

    let mut neighbors1 = graph.neighbors(focal1.as_str());
    neighbors1.retain(|n| !is_focal(n));
    let mut neighbors2 = graph.neighbors(focal2.as_str());
    neighbors2.retain(|n| !is_focal(n));

    let common: BTreeSet<String> = neighbors1.intersection(&neighbors2).cloned().collect();
    let unique1: BTreeSet<String> = neighbors1.difference(&neighbors2).cloned().collect();
    let unique2: BTreeSet<String> = neighbors2.difference(&neighbors1).cloned().collect();

    let unplaced = graph
        .nodes()
        .map(|n| n.address.as_str())
        .filter(|&n| !is_focal(n) && !neighbors1.contains(n) && !neighbors2.contains(n))
        .map(str::to_string)
        .collect();

    ClusterPartition {
        unique1,
        unique2,
        common,
        unplaced,
    }
}

/// Spread nodes evenly over the arc from `start` to `end` (radians), one per
/// equal slice, each at its slice's midpoint
fn arrange_arc(
    nodes: &BTreeSet<String>,
    center: Point,
    radius: f64,
    start: f64,
    end: f64,
    positions: &mut BTreeMap<String, Point>,
) {
    if nodes.is_empty() {
        return;
    }

    let step = (end - start) / nodes.len() as f64;
    for (i, node) in nodes.iter().enumerate() {
        let angle = start + (i as f64 + 0.5) * step;
        let point = Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin());
        positions.insert(node.clone(), point);
    }
}

/// Stack nodes on the bisector between the anchors
fn arrange_column(nodes: &BTreeSet<String>, positions: &mut BTreeMap<String, Point>) {
    if nodes.is_empty() {
        return;
    }

    let x = FOCAL1_ANCHOR.midpoint(FOCAL2_ANCHOR).x;
    let step = COMMON_COLUMN_HEIGHT / (nodes.len() + 1) as f64;
    let bottom = -COMMON_COLUMN_HEIGHT / 2.0;
    for (i, node) in nodes.iter().enumerate() {
        positions.insert(node.clone(), Point::new(x, bottom + (i + 1) as f64 * step));
    }
}

/// Fruchterman-Reingold placement of `nodes` using only the edges among them,
/// rescaled to fit a unit box around `center`. Seeded, so repeatable.
fn spring_layout(
    graph: &TransactionGraph,
    nodes: &BTreeSet<String>,
    center: Point,
) -> BTreeMap<String, Point> {
    let names: Vec<&String> = nodes.iter().collect();
    let n = names.len();
    if n == 0 {
        return BTreeMap::new();
    }
    if n == 1 {
        return BTreeMap::from([(names[0].clone(), center)]);
    }

    let index: HashMap<&str, usize> = names.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();

    // Symmetric adjacency counting parallel edges
    let mut adjacency = vec![vec![0.0f64; n]; n];
    for (from, to, _) in graph.edges() {
        if let (Some(&i), Some(&j)) = (index.get(from), index.get(to)) {
            if i != j {
                adjacency[i][j] += 1.0;
                adjacency[j][i] += 1.0;
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(SPRING_SEED);
    let mut pos: Vec<Point> = (0..n).map(|_| Point::new(rng.gen::<f64>(), rng.gen::<f64>())).collect();

    let k = (1.0 / n as f64).sqrt();
    let (min, max) = bounds(&pos);
    let mut temperature = (max.x - min.x).max(max.y - min.y) * 0.1;
    let cooling = temperature / (SPRING_ITERATIONS + 1) as f64;

    for _ in 0..SPRING_ITERATIONS {
        let mut total_shift = 0.0;
        let mut displacement = vec![Point::ORIGIN; n];

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let delta = pos[i] - pos[j];
                let distance = delta.length().max(MIN_DISTANCE);
                let force = k * k / (distance * distance) - adjacency[i][j] * distance / k;
                displacement[i] = displacement[i] + delta * force;
            }
        }

        for i in 0..n {
            let length = displacement[i].length().max(MIN_DISTANCE);
            let shift = displacement[i] * (temperature / length);
            pos[i] = pos[i] + shift;
            total_shift += shift.length();
        }

        temperature -= cooling;
        if total_shift / (n as f64) < SPRING_THRESHOLD {
            break;
        }
    }

    rescale(&mut pos, center);

    names.into_iter().cloned().zip(pos).collect()
}

fn bounds(points: &[Point]) -> (Point, Point) {
    points.iter().fold(
        (Point::new(f64::INFINITY, f64::INFINITY), Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY)),
        |(lo, hi), p| (Point::new(lo.x.min(p.x), lo.y.min(p.y)), Point::new(hi.x.max(p.x), hi.y.max(p.y))),
    )
}

/// Center on the mean and scale so the largest coordinate is 1
fn rescale(points: &mut [Point], center: Point) {
    let n = points.len() as f64;
    let mean = points.iter().fold(Point::ORIGIN, |acc, &p| acc + p) * (1.0 / n);
    for p in points.iter_mut() {
        *p = *p - mean;
    }

    let limit = points.iter().fold(0.0f64, |acc, p| acc.max(p.x.abs()).max(p.y.abs()));
    for p in points.iter_mut() {
        if limit > 0.0 {
            *p = *p * (1.0 / limit);
        }
        *p = *p + center;
    }
}

/// Curvature and label anchor for every edge, numbering parallel edges per ordered pair
fn edge_layouts(graph: &TransactionGraph, positions: &BTreeMap<String, Point>) -> Vec<EdgeLayout> {
    let mut seen: HashMap<(&str, &str), usize> = HashMap::new();
    let mut edges = Vec::with_capacity(graph.edge_count());

    for (from, to, data) in graph.edges() {
        let (Some(&p1), Some(&p2)) = (positions.get(from), positions.get(to)) else {
            debug!("No position for edge {} -> {}", from, to);
            continue;
        };

        let rank = seen.entry((from, to)).or_insert(0);
        let curvature = CURVATURE_STEP + *rank as f64 * CURVATURE_STEP;
        *rank += 1;

        edges.push(EdgeLayout {
            source: from.to_string(),
            target: to.to_string(),
            tx_hash: data.tx_hash.clone(),
            weight: data.weight,
            curvature,
            label_anchor: label_anchor(p1, p2, curvature),
        });
    }

    edges
}

/// Approximate peak of an arc bent to the right of the chord `p1 -> p2`
pub fn label_anchor(p1: Point, p2: Point, curvature: f64) -> Point {
    let chord = p2 - p1;
    p1.midpoint(p2) + chord.right_normal() * (curvature * LABEL_PEAK_FACTOR)
}
