//! Kakehashi: support session and ticket broker.
//!
//! Users submit tickets onto a partitioned queue, a dispatch loop records them as open
//! tickets and offers them to connected agents, and the first agent to claim a ticket gets
//! a private room with the requester. Room messages are relayed live to attached members
//! and replayed from history on join.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// wiring
pub mod app;
pub mod config;

pub use app::Application;
pub use config::{BrokerConfig, ConfigError};
