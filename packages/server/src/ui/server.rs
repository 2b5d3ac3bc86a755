//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        cancel_ticket, claim_ticket, close_ticket, get_room_messages, get_rooms, get_ticket,
        health_check, list_open_tickets, submit_ticket, websocket_handler,
    },
    state::AppState,
};

/// Broker server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(app_state);
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// server.serve(listener, shutdown_signal()).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Build the router with every endpoint
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/tickets", get(list_open_tickets).post(submit_ticket))
            .route("/api/tickets/{ticket_id}", get(get_ticket))
            .route("/api/tickets/{ticket_id}/claim", post(claim_ticket))
            .route("/api/tickets/{ticket_id}/close", post(close_ticket))
            .route("/api/tickets/{ticket_id}/cancel", post(cancel_ticket))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{room_id}/messages", get(get_room_messages))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Kakehashi broker listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("Server shutdown complete");
        Ok(())
    }
}
