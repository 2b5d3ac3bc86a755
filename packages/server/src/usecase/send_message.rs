//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - メッセージ履歴への追加と、join 済みの相手へのライブ配信
//!
//! ### なぜこのテストが必要か
//! - 送信者以外のメンバーにだけ配信されること（エコーしない）
//! - 同時送信でも、各メンバーが観測する順序が履歴の順序と一致すること
//! - メンバー以外の送信、クローズ済みルームへの送信が拒否されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージ送信とライブ配信
//! - 異常系：NotAMember、Closed
//! - エッジケース：相手が未接続（履歴にのみ残る）

use std::sync::Arc;

use kakehashi_shared::time::Clock;

use crate::domain::{
    ChatMessage, Identity, MessageBody, MessageRelay, RoomError, RoomId, RoomRepository,
    Timestamp,
};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Repository（データアクセス層の抽象化）
    room_repository: Arc<dyn RoomRepository>,
    /// Relay（ルームの排他区間の中からの配信）
    relay: Arc<dyn MessageRelay>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        room_repository: Arc<dyn RoomRepository>,
        relay: Arc<dyn MessageRelay>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            room_repository,
            relay,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// 追加されたメッセージは配信の成否に関わらず履歴に残る。
    ///
    /// # Returns
    ///
    /// * `Ok(ChatMessage)` - 追加されたメッセージ（ID 採番済み）
    /// * `Err(RoomError)` - ルームが存在しない、メンバーでない、クローズ済み
    pub async fn execute(
        &self,
        room_id: &RoomId,
        sender: &Identity,
        body: MessageBody,
    ) -> Result<ChatMessage, RoomError> {
        let timestamp = Timestamp::new(self.clock.now_millis());
        let message = self
            .room_repository
            .append_message(room_id, sender, body, timestamp, self.relay.as_ref())
            .await?;
        tracing::debug!(
            "Message {} appended to room '{}' by '{}'",
            message.id.value(),
            room_id,
            sender
        );
        Ok(message)
    }
}
