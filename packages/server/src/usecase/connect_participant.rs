//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - ライブ接続の登録、同じ identity の古い接続の置き換え、エージェントへの open チケット一覧
//!
//! ### なぜこのテストが必要か
//! - 1 identity 1 接続のポリシーを保証する
//! - 置き換えられた接続に session.superseded が届き、その接続が閉じられることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規接続（ユーザー / エージェント）
//! - エッジケース：同じ identity の二重接続

use std::sync::Arc;

use kakehashi_shared::time::Clock;

use crate::domain::{
    BrokerEvent, ConnectionId, Identity, MessagePusher, Participant, PresenceRegistry,
    PusherChannel, Role, Ticket, TicketRepository, Timestamp,
};

/// 接続完了時の情報
#[derive(Debug, Clone)]
pub struct ConnectedSession {
    pub participant: Participant,
    pub connection_id: ConnectionId,
    /// エージェントの場合のみ、接続時点の open チケット
    pub open_tickets: Vec<Ticket>,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    presence: Arc<dyn PresenceRegistry>,
    ticket_repository: Arc<dyn TicketRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        presence: Arc<dyn PresenceRegistry>,
        ticket_repository: Arc<dyn TicketRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            presence,
            ticket_repository,
            message_pusher,
            clock,
        }
    }

    /// 参加者接続を実行
    ///
    /// # Arguments
    ///
    /// * `identity` - 接続する参加者の identity
    /// * `role` - 参加者の役割
    /// * `channel` - この接続へのメッセージ送信用チャンネル
    pub async fn execute(
        &self,
        identity: Identity,
        role: Role,
        channel: PusherChannel,
    ) -> ConnectedSession {
        let now = Timestamp::new(self.clock.now_millis());

        // 1. Presence に登録（既存の接続は置き換えられる）
        let outcome = self
            .presence
            .connect(identity.clone(), role, channel, now)
            .await;

        // 2. 置き換えられた接続に通知してからチャンネルを破棄する
        if let Some(stale) = outcome.superseded {
            let event = BrokerEvent::SessionSuperseded {
                identity: identity.clone(),
            };
            if let Err(e) = self.message_pusher.push_to_channel(&stale, &event).await {
                tracing::debug!("Superseded connection of '{}' already gone: {}", identity, e);
            }
        }

        // 3. エージェントには現在の open チケットを渡す
        let open_tickets = match role {
            Role::Agent => match self.ticket_repository.list_open().await {
                Ok(tickets) => tickets,
                Err(e) => {
                    tracing::warn!("Failed to list open tickets for '{}': {}", identity, e);
                    Vec::new()
                }
            },
            Role::User => Vec::new(),
        };

        tracing::info!(
            "'{}' connected as {} (connection {})",
            identity,
            role,
            outcome.connection_id
        );

        ConnectedSession {
            participant: outcome.participant,
            connection_id: outcome.connection_id,
            open_tickets,
        }
    }
}
