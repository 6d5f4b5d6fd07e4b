//! HTTP surface for taskmatch: an axum router over one shared SQLite
//! connection.

pub mod api;
pub mod server;

pub use api::{api_router, ApiError, AppState, SharedState};
pub use server::{build_router, start_server, ServerError};
