//! HTTP and WebSocket handlers.

mod error;
mod http;
mod websocket;

pub use error::ApiError;
pub use http::{
    cancel_ticket, claim_ticket, close_ticket, get_room_messages, get_rooms, get_ticket,
    health_check, list_open_tickets, submit_ticket,
};
pub use websocket::websocket_handler;
