use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::models::{Address, Timestamp, Transaction, TransactionRow};

/// Whether a node is one of the two addresses being correlated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Focal,
    Peripheral,
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub address: String,
    pub kind: NodeKind,
    pub label: Option<String>,
}

/// One transfer; parallel edges keep one of these each
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub weight: f64,
    pub tx_hash: String,
    pub timestamp: Timestamp,
}

/// Directed multigraph of transfers keyed by normalized address
#[derive(Debug, Clone, Default)]
pub struct TransactionGraph {
    graph: DiGraph<NodeData, EdgeData>,
    node_map: HashMap<String, NodeIndex>,
}

impl TransactionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_add_node(&mut self, address: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(address) {
            return idx;
        }

        let idx = self.graph.add_node(NodeData {
            address: address.to_string(),
            kind: NodeKind::Peripheral,
            label: None,
        });
        self.node_map.insert(address.to_string(), idx);
        idx
    }

    /// Insert `address` as a focal node, promoting it if it already exists
    pub fn add_focal(&mut self, address: &Address, label: &str) -> NodeIndex {
        let idx = self.get_or_add_node(address.as_str());
        let node = &mut self.graph[idx];
        node.kind = NodeKind::Focal;
        if node.label.is_none() {
            node.label = Some(label.to_string());
        }
        idx
    }

    /// Add one parallel edge for `tx`, creating endpoints as needed
    pub fn add_transfer(&mut self, tx: &Transaction) -> EdgeIndex {
        let from = self.get_or_add_node(tx.sender.as_str());
        let to = self.get_or_add_node(tx.receiver.as_str());
        self.graph.add_edge(
            from,
            to,
            EdgeData {
                weight: tx.value,
                tx_hash: tx.tx_hash.clone(),
                timestamp: tx.timestamp.clone(),
            },
        )
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges with multiplicity
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.node_map.contains_key(address)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.graph.node_weights()
    }

    /// All edges in insertion order as `(sender, receiver, data)`
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &EdgeData)> {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].address.as_str(),
                self.graph[e.target()].address.as_str(),
                e.weight(),
            )
        })
    }

    /// Earliest and latest parsed edge timestamps; raw ones are ignored
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e.timestamp {
                Timestamp::Parsed(at) => Some(at),
                Timestamp::Raw(_) => None,
            })
            .fold(None, |span, at| match span {
                None => Some((at, at)),
                Some((first, last)) => Some((first.min(at), last.max(at))),
            })
    }

    /// Direct successors and predecessors of `address`
    pub fn neighbors(&self, address: &str) -> BTreeSet<String> {
        let Some(&idx) = self.node_map.get(address) else {
            return BTreeSet::new();
        };

        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .chain(self.graph.neighbors_directed(idx, Direction::Incoming))
            .map(|n| self.graph[n].address.clone())
            .collect()
    }

    /// True when a directed path leads from `from` to `to`
    pub fn has_directed_path(&self, from: &str, to: &str) -> bool {
        match (self.node_map.get(from), self.node_map.get(to)) {
            (Some(&a), Some(&b)) => petgraph::algo::has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }
}

/// Build the transfer graph around two focal addresses.
///
/// Both focal nodes are always present. A row becomes exactly one edge when it
/// touches either focal address; malformed rows and rows touching neither are
/// dropped.
pub fn build_graph(
    focal1: &Address,
    focal2: &Address,
    rows: &[TransactionRow],
) -> TransactionGraph {
    let mut graph = TransactionGraph::new();
    graph.add_focal(focal1, "Addr1");
    graph.add_focal(focal2, "Addr2");

    if rows.is_empty() {
        info!("No transactions found.");
        return graph;
    }

    let mut skipped = 0usize;
    for row in rows {
        let tx = match Transaction::try_from(row) {
            Ok(tx) => tx,
            Err(e) => {
                debug!("Skipping malformed row {:?}: {}", row.hash, e);
                skipped += 1;
                continue;
            }
        };

        let touches = |focal: &Address| tx.sender == *focal || tx.receiver == *focal;

        // A transfer between the two focal addresses matches both arms but is added once
        if touches(focal1) || touches(focal2) {
            debug!(
                "Transfer {}: {} -> {} {} {} at {}",
                tx.tx_hash, tx.sender, tx.receiver, tx.value, tx.token_symbol, tx.timestamp
            );
            graph.add_transfer(&tx);
        } else {
            debug!("Skipping transaction {} unrelated to either focal address", tx.tx_hash);
            skipped += 1;
        }
    }

    info!(
        "Built graph: {} nodes, {} edges ({} rows skipped)",
        graph.node_count(),
        graph.edge_count(),
        skipped
    );

    graph
}
