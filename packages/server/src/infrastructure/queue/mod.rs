//! Ticket Queue 実装
//!
//! - `inmemory`: プロセス内のパーティション付きログ
//! - 将来的に: `kafka` など（プロセス再起動後もチケットを残す場合）

pub mod inmemory;

pub use inmemory::InMemoryTicketQueue;
