//! MessagePusher を使った Relay 実装
//!
//! Room Store の排他区間の中から呼ばれる。配信先は join 時に記録した接続 ID と
//! Presence の現在の接続が一致するものだけで、一致しなければ（切断・再接続済み）
//! 配信せず、次の join のリプレイに任せる。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    Attachment, BrokerEvent, ChatMessage, MessagePushError, MessagePusher, MessageRelay, Room,
};

pub struct PusherRelay {
    message_pusher: Arc<dyn MessagePusher>,
}

impl PusherRelay {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    async fn deliver(&self, attachment: &Attachment, event: &BrokerEvent) {
        match self
            .message_pusher
            .push_to_connection(&attachment.identity, attachment.connection_id, event)
            .await
        {
            Ok(()) => {}
            Err(MessagePushError::NotConnected(_) | MessagePushError::StaleConnection(_)) => {
                tracing::debug!(
                    "'{}' is not live on connection {}, leaving delivery to replay",
                    attachment.identity,
                    attachment.connection_id
                );
            }
            Err(e) => tracing::warn!("Failed to relay to '{}': {}", attachment.identity, e),
        }
    }
}

#[async_trait]
impl MessageRelay for PusherRelay {
    async fn replay(&self, room: &Room, attachment: &Attachment) {
        self.deliver(attachment, &BrokerEvent::RoomHistory(room.clone()))
            .await;
    }

    async fn relay(&self, message: &ChatMessage, recipients: Vec<Attachment>) {
        let event = BrokerEvent::RoomMessage(message.clone());
        for recipient in &recipients {
            self.deliver(recipient, &event).await;
        }
    }
}
