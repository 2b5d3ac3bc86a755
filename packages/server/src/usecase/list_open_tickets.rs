//! UseCase: open チケット一覧
//!
//! 接続していなかったエージェントが後から open チケットを見つけるための問い合わせ。

use std::sync::Arc;

use crate::domain::{Ticket, TicketError, TicketRepository};

pub struct ListOpenTicketsUseCase {
    ticket_repository: Arc<dyn TicketRepository>,
}

impl ListOpenTicketsUseCase {
    pub fn new(ticket_repository: Arc<dyn TicketRepository>) -> Self {
        Self { ticket_repository }
    }

    /// open 状態のチケットを作成日時の古い順に返す
    pub async fn execute(&self) -> Result<Vec<Ticket>, TicketError> {
        self.ticket_repository.list_open().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Identity, Issue, TicketId, TicketTransition, Timestamp},
        infrastructure::repository::InMemoryTicketRepository,
    };

    fn ticket(id: &str, created_at: i64) -> Ticket {
        Ticket::open(
            TicketId::new(id.to_string()).unwrap(),
            Identity::new("alice@example.com".to_string()).unwrap(),
            Issue::new("payment failed".to_string()).unwrap(),
            Timestamp::new(created_at),
        )
    }

    #[tokio::test]
    async fn test_list_open_excludes_claimed_and_cancelled() {
        // テスト項目: claim 済み・キャンセル済みのチケットは一覧に含まれない
        // given (前提条件):
        let repository = Arc::new(InMemoryTicketRepository::new());
        for (id, created_at) in [("tkt-1", 1), ("tkt-2", 2), ("tkt-3", 3)] {
            repository.create(ticket(id, created_at)).await.unwrap();
        }
        repository
            .transition(
                &TicketId::new("tkt-1".to_string()).unwrap(),
                TicketTransition::Claim {
                    agent: Identity::new("agent-1".to_string()).unwrap(),
                    at: Timestamp::new(10),
                },
            )
            .await
            .unwrap();
        repository
            .transition(
                &TicketId::new("tkt-3".to_string()).unwrap(),
                TicketTransition::Cancel {
                    at: Timestamp::new(10),
                },
            )
            .await
            .unwrap();
        let usecase = ListOpenTicketsUseCase::new(repository);

        // when (操作):
        let open = usecase.execute().await.unwrap();

        // then (期待する結果):
        let ids: Vec<&str> = open.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["tkt-2"]);
    }
}
