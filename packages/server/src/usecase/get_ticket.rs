//! UseCase: チケット取得

use std::sync::Arc;

use crate::domain::{Ticket, TicketError, TicketId, TicketRepository};

pub struct GetTicketUseCase {
    ticket_repository: Arc<dyn TicketRepository>,
}

impl GetTicketUseCase {
    pub fn new(ticket_repository: Arc<dyn TicketRepository>) -> Self {
        Self { ticket_repository }
    }

    pub async fn execute(&self, ticket_id: &TicketId) -> Result<Ticket, TicketError> {
        self.ticket_repository.get(ticket_id).await
    }
}
