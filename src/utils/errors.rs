use thiserror::Error;

use crate::services::render_service::RenderError;
use crate::services::transaction_service::FetchError;

/// Anything that can end a correlation run early
#[derive(Debug, Error)]
pub enum CorrelateError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
}
