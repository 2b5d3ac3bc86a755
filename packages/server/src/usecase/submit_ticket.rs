//! UseCase: チケット投稿
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SubmitTicketUseCase::execute() メソッド
//! - `ticket.created` イベントの publish と、失敗時のエラー報告
//!
//! ### なぜこのテストが必要か
//! - キューに積めなかったチケットを黙って捨ててはならない（再試行可能なエラーとして返す）
//! - クライアント指定の ticketId が冪等キーとしてそのまま使われること
//!
//! ### どのような状況を想定しているか
//! - 正常系：ID 自動生成 / クライアント指定 ID
//! - 異常系：キューへの追記失敗

use std::sync::Arc;

use kakehashi_shared::time::Clock;

use crate::domain::{
    Identity, Issue, QueueReceipt, TicketCreatedEvent, TicketId, TicketIdFactory, TicketQueue,
    Timestamp,
};

use super::error::SubmitTicketError;

/// 投稿を受け付けたチケット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTicket {
    pub ticket_id: TicketId,
    pub receipt: QueueReceipt,
}

/// チケット投稿のユースケース
pub struct SubmitTicketUseCase {
    queue: Arc<dyn TicketQueue>,
    clock: Arc<dyn Clock>,
}

impl SubmitTicketUseCase {
    pub fn new(queue: Arc<dyn TicketQueue>, clock: Arc<dyn Clock>) -> Self {
        Self { queue, clock }
    }

    /// チケットをキューに投稿する
    ///
    /// チケットレコードはここでは作らない。キューのコンシューマ（dispatch）が作成する。
    ///
    /// # Arguments
    ///
    /// * `ticket_id` - 再送時に重複を防ぐための ID。None なら生成する。
    pub async fn execute(
        &self,
        requester: Identity,
        issue: Issue,
        ticket_id: Option<TicketId>,
    ) -> Result<SubmittedTicket, SubmitTicketError> {
        let ticket_id = ticket_id.unwrap_or_else(TicketIdFactory::generate);
        let event = TicketCreatedEvent {
            ticket_id: ticket_id.clone(),
            requester,
            issue,
            submitted_at: Timestamp::new(self.clock.now_millis()),
        };

        match self.queue.publish(event).await {
            Ok(receipt) => {
                tracing::info!(
                    "Ticket '{}' queued (partition {}, offset {})",
                    ticket_id,
                    receipt.partition,
                    receipt.offset
                );
                Ok(SubmittedTicket { ticket_id, receipt })
            }
            Err(e) => {
                tracing::warn!("Failed to queue ticket '{}': {}", ticket_id, e);
                Err(e.into())
            }
        }
    }
}
