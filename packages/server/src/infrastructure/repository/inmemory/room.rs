//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! ## 排他
//!
//! ルームごとに `Mutex<Room>` を持つ。メッセージの追加と配信、join 時の
//! 履歴スナップショットと接続の紐付けは、すべてこのロックの中で行う。
//! これにより「リプレイされた履歴 + それ以降のライブ配信」が追加順と一致する。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    Attachment, ChatMessage, ConnectionId, DEFAULT_ROOM_CAPACITY, Identity, Member, MessageBody,
    MessageRelay, Room, RoomError, RoomId, RoomRepository, TicketId, Timestamp,
};

type RoomSlot = Arc<Mutex<Room>>;

/// インメモリ Room Repository 実装
pub struct InMemoryRoomRepository {
    rooms: RwLock<HashMap<RoomId, RoomSlot>>,
    /// 新規ルームの定員
    room_capacity: usize,
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::with_room_capacity(DEFAULT_ROOM_CAPACITY)
    }

    pub fn with_room_capacity(room_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            room_capacity,
        }
    }

    async fn slot(&self, room_id: &RoomId) -> Result<RoomSlot, RoomError> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn ensure_room(
        &self,
        room_id: RoomId,
        ticket_id: Option<TicketId>,
        members: Vec<Member>,
        created_at: Timestamp,
    ) -> Result<Room, RoomError> {
        let slot = {
            let mut rooms = self.rooms.write().await;
            rooms
                .entry(room_id.clone())
                .or_insert_with(|| {
                    tracing::info!("Room '{}' created", room_id);
                    Arc::new(Mutex::new(Room::with_capacity(
                        room_id.clone(),
                        ticket_id,
                        created_at,
                        self.room_capacity,
                    )))
                })
                .clone()
        };

        let mut room = slot.lock().await;
        // 全員追加できることを確認してから反映する
        let mut next = room.clone();
        for member in members {
            next.add_member(member)?;
        }
        *room = next;
        Ok(room.clone())
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        let slot = self.slot(room_id).await?;
        let room = slot.lock().await;
        Ok(room.clone())
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let slots: Vec<RoomSlot> = {
            let rooms = self.rooms.read().await;
            rooms.values().cloned().collect()
        };

        let mut result = Vec::with_capacity(slots.len());
        for slot in slots {
            result.push(slot.lock().await.clone());
        }
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        result
    }

    async fn open_rooms_of(&self, identity: &Identity) -> Vec<Room> {
        self.list_rooms()
            .await
            .into_iter()
            .filter(|room| room.is_member(identity) && !room.is_closed())
            .collect()
    }

    async fn attach(
        &self,
        room_id: &RoomId,
        identity: &Identity,
        connection_id: ConnectionId,
        relay: &dyn MessageRelay,
    ) -> Result<Room, RoomError> {
        let slot = self.slot(room_id).await?;
        let mut room = slot.lock().await;
        room.attach(identity, connection_id)?;
        tracing::debug!(
            "'{}' attached to room '{}' on connection {}",
            identity,
            room_id,
            connection_id
        );

        let snapshot = room.clone();
        let attachment = Attachment {
            identity: identity.clone(),
            connection_id,
        };
        relay.replay(&snapshot, &attachment).await;
        Ok(snapshot)
    }

    async fn append_message(
        &self,
        room_id: &RoomId,
        sender: &Identity,
        body: MessageBody,
        timestamp: Timestamp,
        relay: &dyn MessageRelay,
    ) -> Result<ChatMessage, RoomError> {
        let slot = self.slot(room_id).await?;
        let mut room = slot.lock().await;

        let message = room.append_message(sender, body, timestamp)?;
        let recipients = room.live_recipients(sender);
        relay.relay(&message, recipients).await;

        Ok(message)
    }

    async fn history(
        &self,
        room_id: &RoomId,
        identity: &Identity,
    ) -> Result<Vec<ChatMessage>, RoomError> {
        let slot = self.slot(room_id).await?;
        let room = slot.lock().await;
        if !room.is_member(identity) {
            return Err(RoomError::NotAMember {
                room_id: room_id.clone(),
                identity: identity.clone(),
            });
        }
        Ok(room.messages.clone())
    }

    async fn close_room(&self, room_id: &RoomId, at: Timestamp) -> Result<bool, RoomError> {
        let slot = self.slot(room_id).await?;
        let mut room = slot.lock().await;
        Ok(room.close(at))
    }

    async fn evict_expired(&self, now: Timestamp, retention_millis: i64) -> Vec<RoomId> {
        let mut rooms = self.rooms.write().await;

        let mut expired = Vec::new();
        for (room_id, slot) in rooms.iter() {
            // 使用中のルームはクローズ済みでも今回は見送る
            if let Ok(room) = slot.try_lock()
                && room.is_expired(now, retention_millis)
            {
                expired.push(room_id.clone());
            }
        }
        for room_id in &expired {
            rooms.remove(room_id);
            tracing::info!("Room '{}' evicted after retention period", room_id);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - ensure_room の冪等性とメンバー追加
    // - 追加と配信がルームの排他区間の中で行われ、順序が崩れないこと
    // - join（attach）時の履歴スナップショットとライブ配信の境界
    // - 保持期間を過ぎたルームの削除
    //
    // 【なぜこのテストが必要か】
    // - リプレイ + ライブ配信で欠落・重複がないことが Relay の中核要件
    // ========================================

    /// 配信されたメッセージを記録するだけの Relay
    #[derive(Default)]
    struct RecordingRelay {
        replayed: Mutex<Vec<(Vec<ChatMessage>, Attachment)>>,
        delivered: Mutex<Vec<(ChatMessage, Vec<Attachment>)>>,
    }

    #[async_trait]
    impl MessageRelay for RecordingRelay {
        async fn replay(&self, room: &Room, attachment: &Attachment) {
            self.replayed
                .lock()
                .await
                .push((room.messages.clone(), attachment.clone()));
        }

        async fn relay(&self, message: &ChatMessage, recipients: Vec<Attachment>) {
            self.delivered
                .lock()
                .await
                .push((message.clone(), recipients));
        }
    }

    fn identity(value: &str) -> Identity {
        Identity::new(value.to_string()).unwrap()
    }

    fn room_id() -> RoomId {
        RoomId::new("room-tkt-1".to_string()).unwrap()
    }

    fn members() -> Vec<Member> {
        vec![
            Member::new(identity("user"), Role::User),
            Member::new(identity("agent"), Role::Agent),
        ]
    }

    async fn create_test_repository() -> InMemoryRoomRepository {
        let repo = InMemoryRoomRepository::new();
        repo.ensure_room(room_id(), None, members(), Timestamp::new(0))
            .await
            .unwrap();
        repo
    }

    fn body(text: &str) -> MessageBody {
        MessageBody::new(text.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_open_rooms_of_lists_only_open_memberships() {
        // テスト項目: メンバーになっているクローズ前のルームだけが古い順に返る
        // given (前提条件):
        let repo = create_test_repository().await;
        let second = RoomId::new("room-tkt-2".to_string()).unwrap();
        let closed = RoomId::new("room-tkt-3".to_string()).unwrap();
        let other = RoomId::new("room-tkt-4".to_string()).unwrap();
        repo.ensure_room(second.clone(), None, members(), Timestamp::new(10))
            .await
            .unwrap();
        repo.ensure_room(closed.clone(), None, members(), Timestamp::new(20))
            .await
            .unwrap();
        repo.close_room(&closed, Timestamp::new(30)).await.unwrap();
        repo.ensure_room(
            other,
            None,
            vec![
                Member::new(identity("someone"), Role::User),
                Member::new(identity("agent"), Role::Agent),
            ],
            Timestamp::new(40),
        )
        .await
        .unwrap();

        // when (操作):
        let rooms = repo.open_rooms_of(&identity("user")).await;

        // then (期待する結果):
        let ids: Vec<RoomId> = rooms.into_iter().map(|room| room.id).collect();
        assert_eq!(ids, vec![room_id(), second]);
    }

    #[tokio::test]
    async fn test_ensure_room_is_idempotent() {
        // テスト項目: ensure_room を繰り返してもルームは 1 つでメンバーは増えない
        // given (前提条件):
        let repo = create_test_repository().await;

        // when (操作):
        let room = repo
            .ensure_room(room_id(), None, members(), Timestamp::new(100))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(room.members.len(), 2);
        assert_eq!(room.created_at, Timestamp::new(0));
        assert_eq!(repo.list_rooms().await.len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_room_full_leaves_room_unchanged() {
        // テスト項目: 定員を超えるメンバー追加は失敗し、ルームは変更されない
        // given (前提条件):
        let repo = create_test_repository().await;

        // when (操作):
        let result = repo
            .ensure_room(
                room_id(),
                None,
                vec![Member::new(identity("other-agent"), Role::Agent)],
                Timestamp::new(1),
            )
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), RoomError::RoomFull(room_id()));
        assert_eq!(repo.get_room(&room_id()).await.unwrap().members.len(), 2);
    }

    #[tokio::test]
    async fn test_message_before_join_is_in_history_only() {
        // テスト項目: join 前に送られたメッセージは履歴で受け取り、ライブ配信されない
        // given (前提条件):
        let repo = create_test_repository().await;
        let relay = RecordingRelay::default();
        repo.append_message(&room_id(), &identity("user"), body("hello"), Timestamp::new(1), &relay)
            .await
            .unwrap();

        // when (操作):
        let agent_conn = ConnectionId::generate();
        let room = repo
            .attach(&room_id(), &identity("agent"), agent_conn, &relay)
            .await
            .unwrap();
        repo.append_message(&room_id(), &identity("user"), body("are you there?"), Timestamp::new(2), &relay)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(room.messages.len(), 1);
        assert_eq!(room.messages[0].body.as_str(), "hello");
        let replayed = relay.replayed.lock().await;
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].0, room.messages);
        assert_eq!(replayed[0].1.connection_id, agent_conn);
        let delivered = relay.delivered.lock().await;
        assert!(delivered[0].1.is_empty());
        assert_eq!(
            delivered[1].1,
            vec![Attachment {
                identity: identity("agent"),
                connection_id: agent_conn,
            }]
        );
    }

    #[tokio::test]
    async fn test_attach_by_non_member_is_rejected() {
        // テスト項目: メンバー以外の join は NotAMember
        // given (前提条件):
        let repo = create_test_repository().await;

        // when (操作):
        let relay = RecordingRelay::default();
        let result = repo
            .attach(&room_id(), &identity("intruder"), ConnectionId::generate(), &relay)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(RoomError::NotAMember { .. })));
        assert!(relay.replayed.lock().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sends_are_totally_ordered() {
        // テスト項目: 両メンバーからの同時送信でも、履歴と配信順が一致し ID に欠番がない
        // given (前提条件):
        let repo = Arc::new(create_test_repository().await);
        let relay = Arc::new(RecordingRelay::default());

        // when (操作):
        let mut handles = Vec::new();
        for sender in ["user", "agent"] {
            let repo = repo.clone();
            let relay = relay.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    repo.append_message(
                        &room_id(),
                        &identity(sender),
                        body(&format!("{sender}-{i}")),
                        Timestamp::new(i),
                        relay.as_ref(),
                    )
                    .await
                    .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // then (期待する結果):
        let history = repo.history(&room_id(), &identity("user")).await.unwrap();
        let ids: Vec<u64> = history.iter().map(|m| m.id.value()).collect();
        assert_eq!(ids, (1..=100).collect::<Vec<u64>>());
        let delivered: Vec<ChatMessage> = relay
            .delivered
            .lock()
            .await
            .iter()
            .map(|(m, _)| m.clone())
            .collect();
        assert_eq!(delivered, history);
    }

    #[tokio::test]
    async fn test_history_requires_membership() {
        // テスト項目: 履歴参照はメンバーのみ可能
        // given (前提条件):
        let repo = create_test_repository().await;

        // when (操作):
        let member = repo.history(&room_id(), &identity("agent")).await;
        let outsider = repo.history(&room_id(), &identity("intruder")).await;
        let missing = repo
            .history(&RoomId::new("nope".to_string()).unwrap(), &identity("agent"))
            .await;

        // then (期待する結果):
        assert!(member.is_ok());
        assert!(matches!(outsider, Err(RoomError::NotAMember { .. })));
        assert!(matches!(missing, Err(RoomError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_evict_expired_removes_only_rooms_past_retention() {
        // テスト項目: クローズ後に保持期間を過ぎたルームだけが削除される
        // given (前提条件):
        let repo = create_test_repository().await;
        let open_room = RoomId::new("room-open".to_string()).unwrap();
        repo.ensure_room(open_room.clone(), None, members(), Timestamp::new(0))
            .await
            .unwrap();
        assert!(repo.close_room(&room_id(), Timestamp::new(1_000)).await.unwrap());
        assert!(!repo.close_room(&room_id(), Timestamp::new(2_000)).await.unwrap());

        // when (操作):
        let too_early = repo.evict_expired(Timestamp::new(1_500), 1_000).await;
        let evicted = repo.evict_expired(Timestamp::new(2_000), 1_000).await;

        // then (期待する結果):
        assert!(too_early.is_empty());
        assert_eq!(evicted, vec![room_id()]);
        assert!(matches!(
            repo.get_room(&room_id()).await,
            Err(RoomError::NotFound(_))
        ));
        assert!(repo.get_room(&open_room).await.is_ok());
    }
}
