//! UseCase: チケットのキャンセル
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - CancelTicketUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - キャンセルできるのは open のチケットだけで、キャンセル後の claim は不正な遷移になる
//! - 一覧に表示していたエージェントへ ticket.cancelled が届くこと
//!
//! ### どのような状況を想定しているか
//! - 正常系：open チケットのキャンセル
//! - 異常系：キャンセル後の claim、claim 済みチケットのキャンセル

use std::sync::Arc;

use kakehashi_shared::time::Clock;

use crate::domain::{
    BrokerEvent, MessagePusher, PresenceRegistry, Role, Ticket, TicketError, TicketId,
    TicketRepository, TicketTransition, Timestamp,
};

/// チケットキャンセルのユースケース
pub struct CancelTicketUseCase {
    ticket_repository: Arc<dyn TicketRepository>,
    presence: Arc<dyn PresenceRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl CancelTicketUseCase {
    pub fn new(
        ticket_repository: Arc<dyn TicketRepository>,
        presence: Arc<dyn PresenceRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ticket_repository,
            presence,
            message_pusher,
            clock,
        }
    }

    /// 依頼者がエージェントの claim 前にチケットを取り下げる
    pub async fn execute(&self, ticket_id: &TicketId) -> Result<Ticket, TicketError> {
        let cancel = TicketTransition::Cancel {
            at: Timestamp::new(self.clock.now_millis()),
        };
        let ticket = self
            .ticket_repository
            .transition(ticket_id, cancel)
            .await?
            .ticket;
        tracing::info!("Ticket '{}' cancelled by requester", ticket.id);

        let agents = self.presence.connected(Role::Agent).await;
        self.message_pusher
            .broadcast(agents, &BrokerEvent::TicketCancelled(ticket.clone()))
            .await;
        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Identity, Issue, TicketAction, TicketState},
        infrastructure::{
            dto::websocket::ServerEvent, message_pusher::WebSocketMessagePusher,
            presence::InMemoryPresenceRegistry, repository::InMemoryTicketRepository,
        },
    };
    use kakehashi_shared::time::FixedClock;
    use tokio::sync::mpsc;

    struct Fixture {
        usecase: CancelTicketUseCase,
        tickets: Arc<InMemoryTicketRepository>,
        presence: Arc<InMemoryPresenceRegistry>,
    }

    fn create_fixture() -> Fixture {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let presence = Arc::new(InMemoryPresenceRegistry::new());
        let pusher = Arc::new(WebSocketMessagePusher::new(presence.clone()));
        let usecase = CancelTicketUseCase::new(
            tickets.clone(),
            presence.clone(),
            pusher,
            Arc::new(FixedClock::new(4_000)),
        );
        Fixture {
            usecase,
            tickets,
            presence,
        }
    }

    fn identity(value: &str) -> Identity {
        Identity::new(value.to_string()).unwrap()
    }

    fn ticket_id() -> TicketId {
        TicketId::new("tkt-1".to_string()).unwrap()
    }

    async fn create_open_ticket(fixture: &Fixture) {
        fixture
            .tickets
            .create(Ticket::open(
                ticket_id(),
                identity("user"),
                Issue::new("refund".to_string()).unwrap(),
                Timestamp::new(0),
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_open_ticket_notifies_agents() {
        // テスト項目: open チケットをキャンセルすると接続中のエージェントに通知される
        // given (前提条件):
        let fixture = create_fixture();
        create_open_ticket(&fixture).await;
        let (agent_tx, mut agent_rx) = mpsc::unbounded_channel();
        fixture
            .presence
            .connect(identity("agent"), Role::Agent, agent_tx, Timestamp::new(1))
            .await;

        // when (操作):
        let ticket = fixture.usecase.execute(&ticket_id()).await.unwrap();

        // then (期待する結果):
        assert_eq!(ticket.state, TicketState::Cancelled);
        assert_eq!(ticket.closed_at, Some(Timestamp::new(4_000)));
        assert!(ticket.claimed_by.is_none());
        let event: ServerEvent = serde_json::from_str(&agent_rx.recv().await.unwrap()).unwrap();
        assert!(matches!(event, ServerEvent::TicketCancelled { .. }));
        assert!(fixture.tickets.list_open().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_claim_after_cancel_is_invalid_transition() {
        // テスト項目: キャンセル後の claim は InvalidTransition
        // given (前提条件):
        let fixture = create_fixture();
        create_open_ticket(&fixture).await;
        fixture.usecase.execute(&ticket_id()).await.unwrap();

        // when (操作):
        let result = fixture
            .tickets
            .transition(
                &ticket_id(),
                TicketTransition::Claim {
                    agent: identity("agent"),
                    at: Timestamp::new(5_000),
                },
            )
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(TicketError::InvalidTransition {
                ticket_id: ticket_id(),
                from: TicketState::Cancelled,
                action: TicketAction::Claim,
            })
        );
    }

    #[tokio::test]
    async fn test_cancel_claimed_ticket_is_rejected() {
        // テスト項目: claim 済みのチケットはキャンセルできず、claim は保たれる
        // given (前提条件):
        let fixture = create_fixture();
        create_open_ticket(&fixture).await;
        fixture
            .tickets
            .transition(
                &ticket_id(),
                TicketTransition::Claim {
                    agent: identity("agent"),
                    at: Timestamp::new(1),
                },
            )
            .await
            .unwrap();

        // when (操作):
        let result = fixture.usecase.execute(&ticket_id()).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(TicketError::InvalidTransition {
                from: TicketState::Claimed,
                action: TicketAction::Cancel,
                ..
            })
        ));
        let ticket = fixture.tickets.get(&ticket_id()).await.unwrap();
        assert_eq!(ticket.claimed_by, Some(identity("agent")));
    }
}
