//! Broker configuration (command line flags and `KAKEHASHI_*` environment variables).

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than 0")]
    MustBePositive(&'static str),

    #[error("room_capacity must be at least 2 (got {0})")]
    RoomCapacityTooSmall(usize),
}

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "kakehashi-server")]
#[command(about = "Support session and ticket broker", long_about = None)]
pub struct BrokerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "KAKEHASHI_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "KAKEHASHI_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Number of ticket queue partitions (keyed by requester identity)
    #[arg(long, env = "KAKEHASHI_QUEUE_PARTITIONS", default_value_t = 4)]
    pub queue_partitions: usize,

    /// Maximum uncommitted records per partition
    #[arg(long, env = "KAKEHASHI_QUEUE_PARTITION_CAPACITY", default_value_t = 1024)]
    pub queue_partition_capacity: usize,

    /// Back-off before a failed ticket.created record is redelivered
    #[arg(long, env = "KAKEHASHI_DISPATCH_RETRY_MILLIS", default_value_t = 500)]
    pub dispatch_retry_millis: u64,

    /// How long a closed room's history stays available
    #[arg(long, env = "KAKEHASHI_ROOM_RETENTION_SECS", default_value_t = 3600)]
    pub room_retention_secs: u64,

    /// Period of the closed room eviction sweep
    #[arg(long, env = "KAKEHASHI_EVICTION_INTERVAL_SECS", default_value_t = 60)]
    pub eviction_interval_secs: u64,

    /// Member capacity of a room
    #[arg(long, env = "KAKEHASHI_ROOM_CAPACITY", default_value_t = 2)]
    pub room_capacity: usize,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, env = "KAKEHASHI_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            queue_partitions: 4,
            queue_partition_capacity: 1024,
            dispatch_retry_millis: 500,
            room_retention_secs: 3600,
            eviction_interval_secs: 60,
            room_capacity: 2,
            log_level: "info".to_string(),
        }
    }
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_partitions == 0 {
            return Err(ConfigError::MustBePositive("queue_partitions"));
        }
        if self.queue_partition_capacity == 0 {
            return Err(ConfigError::MustBePositive("queue_partition_capacity"));
        }
        if self.eviction_interval_secs == 0 {
            return Err(ConfigError::MustBePositive("eviction_interval_secs"));
        }
        if self.room_capacity < 2 {
            return Err(ConfigError::RoomCapacityTooSmall(self.room_capacity));
        }
        Ok(())
    }

    pub fn dispatch_retry_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_retry_millis)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }

    pub fn room_retention_millis(&self) -> i64 {
        i64::try_from(self.room_retention_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}
