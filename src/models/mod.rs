//! Data models for the correlation pipeline
//!
//! Value objects shared between the fetcher, the graph services and the renderer.

pub mod address;
pub mod transaction;
pub mod correlation;
pub mod layout;

// Re-export commonly used types for convenience
pub use address::Address;
pub use transaction::{RowError, Table, Timestamp, Transaction, TransactionRow};
pub use correlation::{CorrelationDetails, CorrelationResult, PLACEHOLDER_SCORE};
pub use layout::{ClusterPartition, EdgeLayout, LayoutResult, Point};
