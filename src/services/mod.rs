pub mod transaction_service;
pub mod graph_service;
pub mod correlation_service;
pub mod layout_service;
pub mod render_service;
