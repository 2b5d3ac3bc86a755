//! Kakehashi broker server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kakehashi-server
//! cargo run --bin kakehashi-server -- --host 0.0.0.0 --port 3000
//! KAKEHASHI_QUEUE_PARTITIONS=8 cargo run --bin kakehashi-server
//! ```

use std::sync::Arc;

use clap::Parser;
use kakehashi_server::{Application, BrokerConfig};
use kakehashi_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    let config = BrokerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    let app = match Application::build(config, Arc::new(SystemClock)) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
