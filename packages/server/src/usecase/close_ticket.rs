//! UseCase: チケットのクローズ
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - CloseTicketUseCase::execute() メソッド
//! - チケットの closed への遷移、ルームのクローズ、関係者への ticket.closed 通知
//!
//! ### なぜこのテストが必要か
//! - 依頼者とエージェントの両方から close が届いても、2 回目はエラーにならないこと
//! - クローズ後のルームには送信できないが、履歴は残ること
//! - open / cancelled のチケットは close できないこと
//!
//! ### どのような状況を想定しているか
//! - 正常系：active チケットのクローズ
//! - 冪等性：同じチケットへの 2 回目の close
//! - 異常系：open チケットの close、存在しないチケット

use std::sync::Arc;

use kakehashi_shared::time::Clock;

use crate::domain::{
    BrokerEvent, Identity, MessagePusher, RoomRepository, Ticket, TicketError, TicketId,
    TicketRepository, TicketTransition, Timestamp,
};

/// 理由が指定されなかった場合の close_reason
pub const DEFAULT_CLOSE_REASON: &str = "closed";

/// チケットクローズのユースケース
pub struct CloseTicketUseCase {
    ticket_repository: Arc<dyn TicketRepository>,
    room_repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl CloseTicketUseCase {
    pub fn new(
        ticket_repository: Arc<dyn TicketRepository>,
        room_repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ticket_repository,
            room_repository,
            message_pusher,
            clock,
        }
    }

    /// チケットをクローズする
    ///
    /// 既に closed なら何もせずにそのチケットを返す。
    ///
    /// # Arguments
    ///
    /// * `actor` - クローズした参加者。通知の対象から外す（HTTP からの操作では None）。
    pub async fn execute(
        &self,
        ticket_id: &TicketId,
        reason: Option<String>,
        actor: Option<&Identity>,
    ) -> Result<Ticket, TicketError> {
        let now = Timestamp::new(self.clock.now_millis());
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CLOSE_REASON.to_string());

        let update = self
            .ticket_repository
            .transition(ticket_id, TicketTransition::Close { reason, at: now })
            .await?;
        let ticket = update.ticket;
        if !update.changed {
            tracing::debug!("Ticket '{}' was already closed", ticket_id);
            return Ok(ticket);
        }
        tracing::info!(
            "Ticket '{}' closed ({})",
            ticket.id,
            ticket.close_reason.as_deref().unwrap_or(DEFAULT_CLOSE_REASON)
        );

        if let Some(room_id) = &ticket.room_id
            && let Err(e) = self.room_repository.close_room(room_id, now).await
        {
            tracing::warn!("Failed to close room '{}': {}", room_id, e);
        }

        let targets: Vec<Identity> = std::iter::once(ticket.requester.clone())
            .chain(ticket.claimed_by.clone())
            .filter(|identity| Some(identity) != actor)
            .collect();
        self.message_pusher
            .broadcast(targets, &BrokerEvent::TicketClosed(ticket.clone()))
            .await;

        Ok(ticket)
    }
}
