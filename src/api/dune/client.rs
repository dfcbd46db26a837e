use reqwest::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;
use super::models::{
    ApiError, ErrorResponse, ExecuteSqlRequest, ExecutionResponse, ExecutionResultsResponse,
    ExecutionStatusResponse,
};
use crate::models::Table;
use tracing::{debug, warn};

/// Dune Analytics API client for running ad hoc SQL against ledger tables
pub struct DuneClient {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl DuneClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.dune.com/api/v1";
    const API_KEY_HEADER: &'static str = "x-dune-api-key";
    const PERFORMANCE_TIER: &'static str = "medium";

    /// Create a new client against `base_url` (normally [`Self::DEFAULT_BASE_URL`])
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(1),
            max_polls: 120,
        }
    }

    /// Override how often and how long execution status is polled
    pub fn with_polling(mut self, poll_interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls.max(1);
        self
    }

    /// Create default headers with the API key
    fn create_headers(&self) -> Result<HeaderMap, String> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key_value = HeaderValue::from_str(&self.api_key)
            .map_err(|e| format!("Failed to create API key header: {}", e))?;
        headers.insert(Self::API_KEY_HEADER, key_value);

        Ok(headers)
    }

    /// Parse error response based on HTTP status code
    async fn handle_error_response(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ApiError {
        let status_code = status.as_u16();
        let body_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body_text)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or(body_text);

        match status_code {
            400 => ApiError::BadRequest(message),
            401 | 403 => ApiError::Unauthorized(message),
            402 => ApiError::OutOfCredits(message),
            404 => ApiError::NotFound(message),
            429 => {
                warn!("Rate limited by Dune: {}", message);
                ApiError::RateLimited(message)
            }
            500..=599 => {
                warn!("Server error {}: {}", status_code, message);
                ApiError::ServerError(status_code, message)
            }
            _ => ApiError::HttpError(status_code, message),
        }
    }

    /// Decode a successful response or map the failure status
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))
    }

    /// POST /sql/execute
    ///
    /// Submits raw SQL for execution and returns the execution handle.
    pub async fn execute_sql(&self, sql: &str) -> Result<ExecutionResponse, ApiError> {
        let url = format!("{}/sql/execute", self.base_url);
        let headers = self.create_headers()
            .map_err(ApiError::RequestError)?;

        let body = ExecuteSqlRequest {
            sql,
            performance: Self::PERFORMANCE_TIER,
        };

        let response = self.http_client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        Self::read_json(response).await
    }

    /// GET /execution/{execution_id}/status
    pub async fn get_execution_status(
        &self,
        execution_id: &str,
    ) -> Result<ExecutionStatusResponse, ApiError> {
        let url = format!("{}/execution/{}/status", self.base_url, execution_id);
        let headers = self.create_headers()
            .map_err(ApiError::RequestError)?;

        let response = self.http_client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        Self::read_json(response).await
    }

    /// GET /execution/{execution_id}/results
    pub async fn get_execution_results(
        &self,
        execution_id: &str,
    ) -> Result<ExecutionResultsResponse, ApiError> {
        let url = format!("{}/execution/{}/results", self.base_url, execution_id);
        let headers = self.create_headers()
            .map_err(ApiError::RequestError)?;

        let response = self.http_client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        Self::read_json(response).await
    }

    /// Execute SQL, wait for completion and return every result row.
    ///
    /// # Returns
    /// * `Ok(Table)` - Rows of a completed (or partially completed) execution
    /// * `Err(ApiError)` - Transport failure, failed execution, or poll budget exhausted
    pub async fn run_sql(&self, sql: &str) -> Result<Table, ApiError> {
        let execution = self.execute_sql(sql).await?;
        let execution_id = execution.execution_id;
        let mut state = execution.state;
        debug!("Dune execution {} submitted ({:?})", execution_id, state);

        let mut polls = 0;
        while !state.is_terminal() {
            if polls >= self.max_polls {
                return Err(ApiError::Timeout(execution_id));
            }
            tokio::time::sleep(self.poll_interval).await;
            polls += 1;

            let status = self.get_execution_status(&execution_id).await?;
            if let Some(error) = &status.error {
                debug!("Dune execution {} reported: {}", execution_id, error);
            }
            state = status.state;
        }

        if !state.has_results() {
            return Err(ApiError::ExecutionFailed(format!(
                "execution {} ended in state {:?}",
                execution_id, state
            )));
        }

        let results = self.get_execution_results(&execution_id).await?;
        if !results.state.has_results() {
            return Err(ApiError::ExecutionFailed(format!(
                "results for {} reported state {:?}",
                execution_id, results.state
            )));
        }
        debug!("Dune execution {} finished after {} polls", execution_id, polls);

        Ok(results.result.map(|r| r.into_table()).unwrap_or_default())
    }
}
