//! Repository 実装
//!
//! - `inmemory`: HashMap を使ったインメモリ実装
//! - 将来的に: `postgres` など（チケットと履歴をプロセス再起動後も残す場合）

pub mod inmemory;

pub use inmemory::{InMemoryRoomRepository, InMemoryTicketRepository};
