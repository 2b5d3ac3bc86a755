//! インメモリ実装

pub mod room;
pub mod ticket;

pub use room::InMemoryRoomRepository;
pub use ticket::InMemoryTicketRepository;
