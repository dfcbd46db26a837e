use tracing::info;

use crate::models::{Address, CorrelationDetails, CorrelationResult, PLACEHOLDER_SCORE};
use crate::services::graph_service::{build_graph, TransactionGraph};
use crate::services::transaction_service::{FetchError, TransactionFetcher};

/// Compute graph-level metrics for a focal pair. Pure; the graph is not modified.
pub fn analyze(graph: &TransactionGraph, focal1: &Address, focal2: &Address) -> CorrelationResult {
    let has_path = graph.has_directed_path(focal1.as_str(), focal2.as_str())
        || graph.has_directed_path(focal2.as_str(), focal1.as_str());

    CorrelationResult {
        source: focal1.clone(),
        target: focal2.clone(),
        score: PLACEHOLDER_SCORE,
        path: Vec::new(),
        details: CorrelationDetails {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            notes: "Graph built successfully".to_string(),
            has_path,
        },
    }
}

/// Runs one correlation request: fetch, build, analyze
pub struct CorrelationService {
    fetcher: TransactionFetcher,
    row_limit: u32,
}

impl CorrelationService {
    pub fn new(fetcher: TransactionFetcher, row_limit: u32) -> Self {
        Self { fetcher, row_limit }
    }

    /// Build a fresh graph for the pair and analyze it
    pub async fn calculate_score(
        &self,
        focal1: &Address,
        focal2: &Address,
    ) -> Result<(TransactionGraph, CorrelationResult), FetchError> {
        let rows = self
            .fetcher
            .fetch_transactions(focal1, focal2, self.row_limit)
            .await?;

        let graph = build_graph(focal1, focal2, &rows);
        let result = analyze(&graph, focal1, focal2);
        info!(
            "Correlation {} <-> {}: nodes={} edges={} has_path={}",
            focal1, focal2, result.details.nodes, result.details.edges, result.details.has_path
        );

        Ok((graph, result))
    }
}
