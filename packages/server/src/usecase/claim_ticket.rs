//! UseCase: チケットの claim
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ClaimTicketUseCase::execute() メソッド
//! - claim → ルーム作成 → activate の一連の流れと、関係者への通知
//!
//! ### なぜこのテストが必要か
//! - 同じチケットへの同時 claim でちょうど 1 人だけが勝つことを保証する
//! - 負けた側は「他のエージェントが対応済み」という通常の結果を受け取る（エラーではない）
//! - ルームを用意できなかった場合にチケットが claimed のまま放置されないこと
//!
//! ### どのような状況を想定しているか
//! - 正常系：claim 成功（依頼者に ticket.claimed、他のエージェントに ticket.taken）
//! - 競合：複数エージェントの同時 claim
//! - 異常系：キャンセル済みチケットの claim、存在しないチケット、ルーム作成失敗

use std::sync::Arc;

use kakehashi_shared::time::Clock;

use crate::domain::{
    BrokerEvent, Identity, Member, MessagePusher, PresenceRegistry, Role, RoomId, RoomRepository,
    Ticket, TicketError, TicketId, TicketRepository, TicketTransition, Timestamp,
};

use super::error::ClaimTicketError;

/// claim の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// claim に成功し、チケットは active になった
    Claimed { ticket: Ticket, room_id: RoomId },
    /// 他のエージェントが先に claim していた
    Rejected {
        ticket_id: TicketId,
        claimed_by: Identity,
    },
}

/// チケット claim のユースケース
pub struct ClaimTicketUseCase {
    ticket_repository: Arc<dyn TicketRepository>,
    room_repository: Arc<dyn RoomRepository>,
    presence: Arc<dyn PresenceRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ClaimTicketUseCase {
    pub fn new(
        ticket_repository: Arc<dyn TicketRepository>,
        room_repository: Arc<dyn RoomRepository>,
        presence: Arc<dyn PresenceRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ticket_repository,
            room_repository,
            presence,
            message_pusher,
            clock,
        }
    }

    /// チケットを claim し、依頼者とエージェントのルームを用意する
    ///
    /// # Returns
    ///
    /// * `Ok(ClaimOutcome::Claimed)` - claim 成功（チケットは active）
    /// * `Ok(ClaimOutcome::Rejected)` - 他のエージェントが claim 済み
    /// * `Err(ClaimTicketError)` - 不正な遷移、存在しないチケット、ルーム作成失敗
    pub async fn execute(
        &self,
        ticket_id: &TicketId,
        agent: Identity,
    ) -> Result<ClaimOutcome, ClaimTicketError> {
        let now = Timestamp::new(self.clock.now_millis());

        // 1. claim（チケットごとの排他区間で 1 人だけが成功する）
        let claim = TicketTransition::Claim {
            agent: agent.clone(),
            at: now,
        };
        let claimed = match self.ticket_repository.transition(ticket_id, claim).await {
            Ok(update) => update.ticket,
            Err(TicketError::AlreadyClaimed {
                ticket_id,
                claimed_by,
            }) => {
                tracing::info!(
                    "'{}' lost the claim race for '{}' to '{}'",
                    agent,
                    ticket_id,
                    claimed_by
                );
                return Ok(ClaimOutcome::Rejected {
                    ticket_id,
                    claimed_by,
                });
            }
            Err(e) => return Err(e.into()),
        };

        // 2. ルームを用意（ID はチケットから導出されるので再実行しても同じルーム）
        let room_id = RoomId::for_ticket(&claimed.id);
        let members = vec![
            Member::new(claimed.requester.clone(), Role::User),
            Member::new(agent.clone(), Role::Agent),
        ];
        if let Err(e) = self
            .room_repository
            .ensure_room(room_id.clone(), Some(claimed.id.clone()), members, now)
            .await
        {
            self.abandon(&claimed.id, &room_id, now).await;
            return Err(e.into());
        }

        // 3. activate
        let activate = TicketTransition::Activate {
            room_id: room_id.clone(),
        };
        let ticket = match self.ticket_repository.transition(&claimed.id, activate).await {
            Ok(update) => update.ticket,
            Err(e) => {
                self.abandon(&claimed.id, &room_id, now).await;
                return Err(e.into());
            }
        };
        tracing::info!(
            "Ticket '{}' claimed by '{}', room '{}' ready",
            ticket.id,
            agent,
            room_id
        );

        // 4. 通知（ベストエフォート）
        let claimed_event = BrokerEvent::TicketClaimed {
            ticket: ticket.clone(),
            room_id: room_id.clone(),
        };
        if let Err(e) = self
            .message_pusher
            .push_to(&ticket.requester, &claimed_event)
            .await
        {
            tracing::debug!("Requester '{}' not notified of claim: {}", ticket.requester, e);
        }

        let other_agents: Vec<Identity> = self
            .presence
            .connected(Role::Agent)
            .await
            .into_iter()
            .filter(|id| id != &agent)
            .collect();
        let taken_event = BrokerEvent::TicketTaken {
            ticket_id: ticket.id.clone(),
            claimed_by: agent,
        };
        self.message_pusher
            .broadcast(other_agents, &taken_event)
            .await;

        Ok(ClaimOutcome::Claimed { ticket, room_id })
    }

    /// activate まで進めなかった claim を closed にし、途中で作られたルームも閉じる
    ///
    /// activate 前に依頼者がチケットを閉じていた場合、チケットの close は no-op になる。
    async fn abandon(&self, ticket_id: &TicketId, room_id: &RoomId, at: Timestamp) {
        let close = TicketTransition::Close {
            reason: "claim abandoned: room unavailable".to_string(),
            at,
        };
        match self.ticket_repository.transition(ticket_id, close).await {
            Ok(update) if update.changed => {
                tracing::warn!("Ticket '{}' closed after failed activation", ticket_id)
            }
            Ok(_) => tracing::info!("Ticket '{}' was closed before activation", ticket_id),
            Err(e) => tracing::warn!("Failed to abandon claim of '{}': {}", ticket_id, e),
        }

        match self.room_repository.close_room(room_id, at).await {
            Ok(true) => tracing::info!("Room '{}' closed with the abandoned claim", room_id),
            Ok(false) => {}
            Err(e) => tracing::debug!("No room to close for '{}': {}", ticket_id, e),
        }
    }
}
