//! Infrastructure layer: in-memory stores, the ticket queue, delivery and wire DTOs.

pub mod dto;
pub mod message_pusher;
pub mod presence;
pub mod queue;
pub mod repository;
