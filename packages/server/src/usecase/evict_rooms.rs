//! UseCase: 保持期間を過ぎたルームの削除
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - EvictRoomsUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - クローズ後も保持期間中は履歴を参照できなければならない
//! - 保持期間を過ぎたルームだけが削除され、開いているルームは残ること
//!
//! ### どのような状況を想定しているか
//! - 保持期間内 / 保持期間の境界 / 開いたままのルーム

use std::sync::Arc;

use kakehashi_shared::time::Clock;

use crate::domain::{RoomId, RoomRepository, Timestamp};

/// ルーム削除のユースケース
pub struct EvictRoomsUseCase {
    room_repository: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
    retention_millis: i64,
}

impl EvictRoomsUseCase {
    pub fn new(
        room_repository: Arc<dyn RoomRepository>,
        clock: Arc<dyn Clock>,
        retention_millis: i64,
    ) -> Self {
        Self {
            room_repository,
            clock,
            retention_millis,
        }
    }

    /// 削除したルームの ID を返す
    pub async fn execute(&self) -> Vec<RoomId> {
        let now = Timestamp::new(self.clock.now_millis());
        let evicted = self
            .room_repository
            .evict_expired(now, self.retention_millis)
            .await;
        if !evicted.is_empty() {
            tracing::info!("Evicted {} closed room(s)", evicted.len());
        }
        evicted
    }
}
