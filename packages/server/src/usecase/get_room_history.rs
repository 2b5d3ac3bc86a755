//! UseCase: ルーム履歴の参照
//!
//! 接続を紐付けずに履歴だけを読む（HTTP でのポーリングや監査向け）。

use std::sync::Arc;

use crate::domain::{ChatMessage, Identity, RoomError, RoomId, RoomRepository};

pub struct GetRoomHistoryUseCase {
    room_repository: Arc<dyn RoomRepository>,
}

impl GetRoomHistoryUseCase {
    pub fn new(room_repository: Arc<dyn RoomRepository>) -> Self {
        Self { room_repository }
    }

    /// メンバーとして履歴を取得する。メンバー以外は `RoomError::NotAMember`。
    pub async fn execute(
        &self,
        room_id: &RoomId,
        identity: &Identity,
    ) -> Result<Vec<ChatMessage>, RoomError> {
        self.room_repository.history(room_id, identity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Attachment, Member, MessageBody, MessageRelay, Role, Room, Timestamp},
        infrastructure::repository::InMemoryRoomRepository,
    };

    struct NoopRelay;

    #[async_trait::async_trait]
    impl MessageRelay for NoopRelay {
        async fn replay(&self, _room: &Room, _attachment: &Attachment) {}

        async fn relay(&self, _message: &ChatMessage, _recipients: Vec<Attachment>) {}
    }

    #[tokio::test]
    async fn test_history_for_member_and_outsider() {
        // テスト項目: メンバーは履歴を読め、メンバー以外は NotAMember
        // given (前提条件):
        let repository = Arc::new(InMemoryRoomRepository::new());
        let room_id = RoomId::new("room-tkt-1".to_string()).unwrap();
        let user = Identity::new("user".to_string()).unwrap();
        repository
            .ensure_room(
                room_id.clone(),
                None,
                vec![Member::new(user.clone(), Role::User)],
                Timestamp::new(0),
            )
            .await
            .unwrap();
        repository
            .append_message(
                &room_id,
                &user,
                MessageBody::new("hello".to_string()).unwrap(),
                Timestamp::new(1),
                &NoopRelay,
            )
            .await
            .unwrap();
        let usecase = GetRoomHistoryUseCase::new(repository);

        // when (操作):
        let history = usecase.execute(&room_id, &user).await.unwrap();
        let outsider = usecase
            .execute(&room_id, &Identity::new("intruder".to_string()).unwrap())
            .await;

        // then (期待する結果):
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].body.as_str(), "hello");
        assert!(matches!(outsider, Err(RoomError::NotAMember { .. })));
    }
}
