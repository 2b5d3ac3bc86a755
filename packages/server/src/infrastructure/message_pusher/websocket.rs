//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - `BrokerEvent` を DTO 経由で JSON にエンコード
//! - Presence Registry が持つ接続のチャンネルへ送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! UI 層が作ったチャンネルは Presence Registry に登録され、この実装は
//! 送信のたびに Presence Registry から現在の接続を引きます。
//! 送信はチャンネルへの enqueue だけで、ネットワーク I/O を待ちません。

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{
        BrokerEvent, ConnectionId, Identity, LiveHandle, MessagePushError, MessagePusher,
        PresenceRegistry, PusherChannel,
    },
    infrastructure::dto::websocket::ServerEvent,
};

/// WebSocket を使った MessagePusher 実装
pub struct WebSocketMessagePusher {
    presence: Arc<dyn PresenceRegistry>,
}

impl WebSocketMessagePusher {
    /// 新しい WebSocketMessagePusher を作成
    pub fn new(presence: Arc<dyn PresenceRegistry>) -> Self {
        Self { presence }
    }

    fn encode(event: &BrokerEvent) -> Result<String, MessagePushError> {
        ServerEvent::from(event)
            .to_json()
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }

    fn send(
        target: &Identity,
        channel: &PusherChannel,
        text: String,
    ) -> Result<(), MessagePushError> {
        channel
            .send(text)
            .map_err(|_| MessagePushError::NotConnected(target.clone()))
    }

    async fn current(&self, target: &Identity) -> Result<LiveHandle, MessagePushError> {
        self.presence
            .lookup(target)
            .await
            .ok_or_else(|| MessagePushError::NotConnected(target.clone()))
    }

    async fn matching(
        &self,
        target: &Identity,
        connection_id: ConnectionId,
    ) -> Result<LiveHandle, MessagePushError> {
        let handle = self.current(target).await?;
        if handle.connection_id != connection_id {
            return Err(MessagePushError::StaleConnection(target.clone()));
        }
        Ok(handle)
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn push_to(
        &self,
        target: &Identity,
        event: &BrokerEvent,
    ) -> Result<(), MessagePushError> {
        let handle = self.current(target).await?;
        Self::send(target, &handle.channel, Self::encode(event)?)?;
        tracing::debug!("Pushed event to '{}'", target);
        Ok(())
    }

    async fn push_to_connection(
        &self,
        target: &Identity,
        connection_id: ConnectionId,
        event: &BrokerEvent,
    ) -> Result<(), MessagePushError> {
        let handle = self.matching(target, connection_id).await?;
        Self::send(target, &handle.channel, Self::encode(event)?)?;
        tracing::debug!("Pushed event to '{}' on connection {}", target, connection_id);
        Ok(())
    }

    async fn push_text(
        &self,
        target: &Identity,
        connection_id: ConnectionId,
        text: String,
    ) -> Result<(), MessagePushError> {
        let handle = self.matching(target, connection_id).await?;
        Self::send(target, &handle.channel, text)
    }

    async fn push_to_channel(
        &self,
        channel: &PusherChannel,
        event: &BrokerEvent,
    ) -> Result<(), MessagePushError> {
        channel
            .send(Self::encode(event)?)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }

    async fn broadcast(&self, targets: Vec<Identity>, event: &BrokerEvent) {
        let text = match Self::encode(event) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to encode broadcast event: {}", e);
                return;
            }
        };

        for target in targets {
            // ブロードキャストでは一部の送信失敗を許容
            match self.current(&target).await {
                Ok(handle) => match Self::send(&target, &handle.channel, text.clone()) {
                    Ok(()) => tracing::debug!("Broadcasted event to '{}'", target),
                    Err(e) => tracing::warn!("Failed to push event to '{}': {}", target, e),
                },
                Err(_) => {
                    tracing::debug!("'{}' not connected during broadcast, skipping", target)
                }
            }
        }
    }
}
