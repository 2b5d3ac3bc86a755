//! Transport layer: axum router, handlers and graceful shutdown.

mod handler;
mod server;
mod signal;
pub mod state;

pub use handler::ApiError;
pub use server::Server;
pub use signal::shutdown_signal;
pub use state::AppState;
