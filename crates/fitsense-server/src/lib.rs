//! fitsense HTTP server
//!
//! Exposes workout video analysis and the pulse sensor feed over axum.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
