//! UseCase: ルームへの join
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - 接続のルームへの紐付け、履歴のリプレイ、相手への room.peer_joined 通知
//!
//! ### なぜこのテストが必要か
//! - join 前に送られたメッセージは履歴で受け取れなければならない
//! - 履歴（room.history）はそれ以降のライブ配信より先に届かなければならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：join 前のメッセージを含む履歴の受信
//! - 異常系：メンバー以外の join

use std::sync::Arc;

use crate::domain::{
    BrokerEvent, ConnectionId, Identity, MessagePusher, MessageRelay, PresenceRegistry, Room,
    RoomError, RoomId, RoomRepository,
};

/// ルーム join のユースケース
pub struct JoinRoomUseCase {
    room_repository: Arc<dyn RoomRepository>,
    presence: Arc<dyn PresenceRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    relay: Arc<dyn MessageRelay>,
}

impl JoinRoomUseCase {
    pub fn new(
        room_repository: Arc<dyn RoomRepository>,
        presence: Arc<dyn PresenceRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        relay: Arc<dyn MessageRelay>,
    ) -> Self {
        Self {
            room_repository,
            presence,
            message_pusher,
            relay,
        }
    }

    /// 接続をルームに紐付ける
    ///
    /// 履歴は Relay 経由で `room.history` としてこの接続へ送られる。
    ///
    /// # Returns
    ///
    /// join 時点のルームのスナップショット
    pub async fn execute(
        &self,
        room_id: &RoomId,
        identity: &Identity,
        connection_id: ConnectionId,
    ) -> Result<Room, RoomError> {
        // 1. ルームの排他区間で履歴のスナップショットと接続の紐付けを行う
        let room = self
            .room_repository
            .attach(room_id, identity, connection_id, self.relay.as_ref())
            .await?;

        // 2. 参加者の現在のルームを記録（切断時の peer_left に使う）
        self.presence
            .set_current_room(identity, room_id.clone())
            .await;

        // 3. 相手に通知
        if let Some(member) = room.member(identity) {
            let event = BrokerEvent::PeerJoined {
                room_id: room_id.clone(),
                identity: identity.clone(),
                role: member.role,
            };
            self.message_pusher
                .broadcast(room.other_members(identity), &event)
                .await;
        }

        tracing::info!(
            "'{}' joined room '{}' ({} messages replayed)",
            identity,
            room_id,
            room.messages.len()
        );
        Ok(room)
    }
}
