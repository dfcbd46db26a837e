//! Layout models handed to renderers

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Add, Mul, Sub};

/// A 2-D coordinate in layout space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Right-hand normal of this vector, `(y, -x)`
    pub fn right_normal(self) -> Point {
        Point::new(self.y, -self.x)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// How non-focal nodes were classified relative to the two focal nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterPartition {
    pub unique1: BTreeSet<String>,
    pub unique2: BTreeSet<String>,
    pub common: BTreeSet<String>,
    /// Nodes adjacent to neither focal node
    pub unplaced: BTreeSet<String>,
}

/// Rendering parameters for one parallel edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeLayout {
    pub source: String,
    pub target: String,
    pub tx_hash: String,
    pub weight: f64,
    /// Arc bend, increasing across edges that share an ordered pair
    pub curvature: f64,
    pub label_anchor: Point,
}

/// Node coordinates plus per-edge curve metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutResult {
    pub positions: BTreeMap<String, Point>,
    pub edges: Vec<EdgeLayout>,
    pub partition: ClusterPartition,
    /// Display names for nodes that carry one (the focal nodes)
    pub labels: BTreeMap<String, String>,
}

impl LayoutResult {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, node: &str) -> Option<Point> {
        self.positions.get(node).copied()
    }

    pub fn label(&self, node: &str) -> Option<&str> {
        self.labels.get(node).map(String::as_str)
    }
}
