//! Data Transfer Objects (DTOs) for the broker.
//!
//! DTOs are organized by protocol:
//! - `websocket`: client commands and server events on `/ws`
//! - `http`: HTTP API request / response bodies

pub mod conversion;
pub mod http;
pub mod websocket;
