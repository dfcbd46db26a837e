use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Table, TransactionRow};

/// Request body for POST /sql/execute
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteSqlRequest<'a> {
    pub sql: &'a str,
    pub performance: &'a str,
}

/// Response from POST /sql/execute
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResponse {
    pub execution_id: String,
    pub state: ExecutionState,
}

/// Response from GET /execution/{id}/status
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStatusResponse {
    pub state: ExecutionState,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Response from GET /execution/{id}/results
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResultsResponse {
    pub state: ExecutionState,
    #[serde(default)]
    pub result: Option<ResultSet>,
}

/// Result rows as delivered; each one is decoded on its own
#[derive(Debug, Clone, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
}

impl ResultSet {
    /// Decode every row, dropping the ones that do not fit a [`TransactionRow`]
    pub fn into_table(self) -> Table {
        let total = self.rows.len();
        let table: Table = self
            .rows
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<TransactionRow>(raw) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!("Dropping undecodable result row: {}", e);
                    None
                }
            })
            .collect();

        if table.len() != total {
            warn!("Kept {} of {} result rows", table.len(), total);
        }
        table
    }
}

/// Lifecycle states reported by the execution endpoints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum ExecutionState {
    #[serde(rename = "QUERY_STATE_PENDING")]
    Pending,
    #[serde(rename = "QUERY_STATE_EXECUTING")]
    Executing,
    #[serde(rename = "QUERY_STATE_COMPLETED")]
    Completed,
    #[serde(rename = "QUERY_STATE_COMPLETED_PARTIAL")]
    CompletedPartial,
    #[serde(rename = "QUERY_STATE_FAILED")]
    Failed,
    #[serde(rename = "QUERY_STATE_CANCELLED")]
    Cancelled,
    #[serde(rename = "QUERY_STATE_EXPIRED")]
    Expired,
    #[serde(other)]
    Unknown,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionState::Pending | ExecutionState::Executing)
    }

    pub fn has_results(&self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::CompletedPartial)
    }
}

/// Error body returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: Option<String>,
}

/// Comprehensive error type for API operations
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(String),
    /// 401 Unauthorized
    Unauthorized(String),
    /// 402 Payment Required (credits exhausted)
    OutOfCredits(String),
    /// 404 Not Found
    NotFound(String),
    /// 429 Too Many Requests
    RateLimited(String),
    /// 5xx Server Error
    ServerError(u16, String),
    /// Other HTTP errors
    HttpError(u16, String),
    /// Network/request error
    RequestError(String),
    /// Deserialization error
    DeserializationError(String),
    /// Execution finished without results
    ExecutionFailed(String),
    /// Execution still running after the last poll
    Timeout(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::OutOfCredits(msg) => write!(f, "Out of credits: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::RateLimited(msg) => write!(f, "Rate Limited: {}", msg),
            ApiError::ServerError(code, msg) => write!(f, "Server Error ({}): {}", code, msg),
            ApiError::HttpError(code, msg) => write!(f, "HTTP Error ({}): {}", code, msg),
            ApiError::RequestError(msg) => write!(f, "Request Error: {}", msg),
            ApiError::DeserializationError(msg) => write!(f, "Deserialization Error: {}", msg),
            ApiError::ExecutionFailed(msg) => write!(f, "Execution Failed: {}", msg),
            ApiError::Timeout(id) => write!(f, "Execution {} did not finish in time", id),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_response_parses_rows() {
        let body = r#"{
            "execution_id": "01HX",
            "state": "QUERY_STATE_COMPLETED",
            "result": {
                "rows": [
                    {"from": "0xaaa", "to": "0xccc", "value_eth": 1.5, "hash": "h1", "block_time": "2024-01-01 00:00:00.000 UTC"}
                ],
                "metadata": {"column_names": ["from", "to", "value_eth", "hash", "block_time"]}
            }
        }"#;

        let parsed: ExecutionResultsResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.state.has_results());
        let rows = parsed.result.unwrap().into_table();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hash.as_deref(), Some("h1"));
    }

    #[test]
    fn test_bad_row_dropped_without_losing_the_rest() {
        let body = r#"{
            "state": "QUERY_STATE_COMPLETED",
            "result": {
                "rows": [
                    {"from": "0xaaa", "to": "0xccc", "value_eth": "0.25", "hash": "h1"},
                    {"from": "0xaaa", "to": "0xddd", "value_eth": "lots", "hash": "h2"},
                    {"from": "0xccc", "to": "0xbbb", "value_eth": 0.5, "hash": "h3"}
                ]
            }
        }"#;

        let parsed: ExecutionResultsResponse = serde_json::from_str(body).unwrap();
        let rows = parsed.result.unwrap().into_table();

        let hashes: Vec<_> = rows.iter().filter_map(|r| r.hash.as_deref()).collect();
        assert_eq!(hashes, vec!["h1", "h3"]);
        assert_eq!(rows[0].value_eth, Some(0.25));
    }

    #[test]
    fn test_unknown_state_is_terminal() {
        let parsed: ExecutionResponse =
            serde_json::from_str(r#"{"execution_id": "x", "state": "QUERY_STATE_SOMETHING_NEW"}"#).unwrap();
        assert_eq!(parsed.state, ExecutionState::Unknown);
        assert!(parsed.state.is_terminal());
        assert!(!ExecutionState::Executing.is_terminal());
    }
}
