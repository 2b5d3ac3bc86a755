//! InMemory Ticket Repository 実装
//!
//! チケットごとに `Mutex` を持ち、状態遷移はそのロックの中でだけ行う。
//! 索引（`RwLock<HashMap>`）は作成時のみ書き込みロックを取り、遷移中には保持しない。
//! そのため別々のチケットへの操作は互いにブロックしない。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    Ticket, TicketError, TicketId, TicketRepository, TicketTransition, TicketUpdate,
};

type TicketSlot = Arc<Mutex<Ticket>>;

/// インメモリ Ticket Repository 実装
#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<HashMap<TicketId, TicketSlot>>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, ticket_id: &TicketId) -> Result<TicketSlot, TicketError> {
        let tickets = self.tickets.read().await;
        tickets
            .get(ticket_id)
            .cloned()
            .ok_or_else(|| TicketError::NotFound(ticket_id.clone()))
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn create(&self, ticket: Ticket) -> Result<TicketUpdate, TicketError> {
        let slot = {
            let mut tickets = self.tickets.write().await;
            if let Some(existing) = tickets.get(&ticket.id) {
                existing.clone()
            } else {
                let created = ticket.clone();
                tickets.insert(ticket.id.clone(), Arc::new(Mutex::new(ticket)));
                tracing::debug!("Ticket '{}' created", created.id);
                return Ok(TicketUpdate {
                    ticket: created,
                    changed: true,
                });
            }
        };

        let existing = slot.lock().await.clone();
        tracing::debug!("Ticket '{}' already exists, create is a no-op", existing.id);
        Ok(TicketUpdate {
            ticket: existing,
            changed: false,
        })
    }

    async fn get(&self, ticket_id: &TicketId) -> Result<Ticket, TicketError> {
        let slot = self.slot(ticket_id).await?;
        let ticket = slot.lock().await;
        Ok(ticket.clone())
    }

    async fn transition(
        &self,
        ticket_id: &TicketId,
        transition: TicketTransition,
    ) -> Result<TicketUpdate, TicketError> {
        let slot = self.slot(ticket_id).await?;
        let mut ticket = slot.lock().await;

        // 失敗時に部分的な変更が残らないよう、コピーに適用してから書き戻す
        let mut next = ticket.clone();
        let changed = next.apply(transition)?;
        *ticket = next;

        Ok(TicketUpdate {
            ticket: ticket.clone(),
            changed,
        })
    }

    async fn list_open(&self) -> Result<Vec<Ticket>, TicketError> {
        let slots: Vec<TicketSlot> = {
            let tickets = self.tickets.read().await;
            tickets.values().cloned().collect()
        };

        let mut open = Vec::new();
        for slot in slots {
            let ticket = slot.lock().await;
            if ticket.is_open() {
                open.push(ticket.clone());
            }
        }
        open.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(open)
    }
}
