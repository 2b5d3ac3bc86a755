//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - ライブ接続の解除と、メンバーになっている全ルームの相手への room.peer_left 通知
//!
//! ### なぜこのテストが必要か
//! - 切断はエラーではなく通常のプレゼンス遷移であり、ルームもチケットも閉じない
//! - 置き換えられた古い接続の遅れた切断が、新しい接続を消したり通知を出したりしないこと
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム参加中の切断（相手に通知）、複数ルームのメンバーの切断、join 前のメンバーの切断
//! - エッジケース：ルーム未参加の切断、置き換え済み接続の切断、クローズ済みルーム

use std::sync::Arc;

use kakehashi_shared::time::Clock;

use crate::domain::{
    BrokerEvent, ConnectionId, Identity, MessagePusher, PresenceRegistry, RoomRepository,
    Timestamp,
};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    presence: Arc<dyn PresenceRegistry>,
    room_repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(
        presence: Arc<dyn PresenceRegistry>,
        room_repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            presence,
            room_repository,
            message_pusher,
            clock,
        }
    }

    /// 参加者切断を実行
    ///
    /// # Returns
    ///
    /// room.peer_left を通知した相手の identity リスト
    pub async fn execute(&self, identity: Identity, connection_id: ConnectionId) -> Vec<Identity> {
        let now = Timestamp::new(self.clock.now_millis());

        // 1. Presence から接続を解除（置き換え済みの接続なら何もしない）
        let Some(participant) = self.presence.disconnect(&identity, connection_id, now).await
        else {
            return Vec::new();
        };
        tracing::info!("'{}' disconnected (connection {})", identity, connection_id);

        // 2. メンバーになっているクローズ前の全ルームで、相手に通知
        //    （join したかどうか、最後に join したルームかどうかは問わない）
        let mut notified = Vec::new();
        for room in self.room_repository.open_rooms_of(&participant.identity).await {
            let targets = room.other_members(&identity);
            let event = BrokerEvent::PeerLeft {
                room_id: room.id,
                identity: identity.clone(),
                at: now,
            };
            self.message_pusher.broadcast(targets.clone(), &event).await;
            notified.extend(targets);
        }
        notified
    }
}
