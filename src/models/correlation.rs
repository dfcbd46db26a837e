//! Correlation result models

use serde::Serialize;

use super::Address;

/// Score reported until a scoring model exists
pub const PLACEHOLDER_SCORE: f64 = 0.0;

/// Graph-level metrics backing a correlation result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationDetails {
    pub nodes: usize,
    pub edges: usize,
    pub notes: String,
    pub has_path: bool,
}

/// Outcome of correlating two addresses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub source: Address,
    pub target: Address,
    pub score: f64,
    /// Always empty: no path-finding is performed
    pub path: Vec<Address>,
    pub details: CorrelationDetails,
}
