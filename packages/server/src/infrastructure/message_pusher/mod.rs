//! メッセージ送信（通知）の実装
//!
//! ## 実装
//!
//! - `websocket`: Presence Registry に登録された WebSocket チャンネルへの送信
//! - `relay`: ルームのメッセージ配信（MessagePusher の上に構築）

pub mod relay;
pub mod websocket;

pub use relay::PusherRelay;
pub use websocket::WebSocketMessagePusher;
