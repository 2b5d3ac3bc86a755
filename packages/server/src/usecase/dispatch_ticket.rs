//! UseCase: キューからのチケット取り込みと、エージェントへの提示
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DispatchTicketUseCase::execute() メソッド
//! - TicketDispatcher のパーティションごとのワーカー
//!
//! ### なぜこのテストが必要か
//! - キューは少なくとも 1 回配信なので、同じイベントの再配信でチケットが重複してはならない
//! - 取り込みに失敗したレコードは commit されず、再配信されなければならない
//! - キューをクローズしたら、残っているレコードを処理してからワーカーが終了すること
//!
//! ### どのような状況を想定しているか
//! - 正常系：取り込みと ticket.incoming の通知
//! - 再配信：同じイベントの 2 回目の処理、保存失敗後のリトライ
//! - 終了：クローズ時の残りレコードの処理

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use crate::domain::{
    BrokerEvent, MessagePusher, PresenceRegistry, Role, Ticket, TicketCreatedEvent, TicketQueue,
    TicketRepository, TicketUpdate,
};

use super::error::DispatchError;

/// `ticket.created` イベントを Ticket Registry に取り込むユースケース
pub struct DispatchTicketUseCase {
    ticket_repository: Arc<dyn TicketRepository>,
    presence: Arc<dyn PresenceRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DispatchTicketUseCase {
    pub fn new(
        ticket_repository: Arc<dyn TicketRepository>,
        presence: Arc<dyn PresenceRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            ticket_repository,
            presence,
            message_pusher,
        }
    }

    /// チケットを open で作成し、接続中のエージェントに知らせる
    ///
    /// 作成済みのチケットなら何もしない（通知もしない）。claim は行わない。
    pub async fn execute(&self, event: TicketCreatedEvent) -> Result<TicketUpdate, DispatchError> {
        let ticket = Ticket::open(
            event.ticket_id,
            event.requester,
            event.issue,
            event.submitted_at,
        );
        let update = self.ticket_repository.create(ticket).await?;
        if !update.changed {
            tracing::debug!("Ticket '{}' redelivered, already recorded", update.ticket.id);
            return Ok(update);
        }

        let agents = self.presence.connected(Role::Agent).await;
        tracing::info!(
            "Ticket '{}' opened for '{}', offered to {} agent(s)",
            update.ticket.id,
            update.ticket.requester,
            agents.len()
        );
        self.message_pusher
            .broadcast(agents, &BrokerEvent::IncomingTicket(update.ticket.clone()))
            .await;
        Ok(update)
    }
}

/// Ticket Queue のコンシューマ
///
/// パーティションごとに 1 つのワーカーを動かす。レコードは処理に成功してから commit する。
pub struct TicketDispatcher {
    queue: Arc<dyn TicketQueue>,
    usecase: Arc<DispatchTicketUseCase>,
    retry_delay: Duration,
}

impl TicketDispatcher {
    pub fn new(
        queue: Arc<dyn TicketQueue>,
        usecase: Arc<DispatchTicketUseCase>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            queue,
            usecase,
            retry_delay,
        }
    }

    /// ワーカーを起動する。キューがクローズされ、残りを処理し終えると各ワーカーは終了する。
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        (0..self.queue.partition_count())
            .map(|partition| {
                let queue = self.queue.clone();
                let usecase = self.usecase.clone();
                let retry_delay = self.retry_delay;
                tokio::spawn(async move {
                    run_worker(queue, usecase, partition, retry_delay).await;
                })
            })
            .collect()
    }
}

async fn run_worker(
    queue: Arc<dyn TicketQueue>,
    usecase: Arc<DispatchTicketUseCase>,
    partition: usize,
    retry_delay: Duration,
) {
    tracing::debug!("Dispatch worker for partition {} started", partition);
    while let Some(record) = queue.next(partition).await {
        match usecase.execute(record.event.clone()).await {
            Ok(_) => {
                if let Err(e) = queue.commit(&record).await {
                    tracing::warn!(
                        "Failed to commit offset {} of partition {}: {}",
                        record.offset,
                        partition,
                        e
                    );
                }
            }
            Err(e) => {
                // commit しないので、同じレコードが次の next で返ってくる
                tracing::warn!(
                    "Dispatch of '{}' failed, retrying in {:?}: {}",
                    record.event.ticket_id,
                    retry_delay,
                    e
                );
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
    tracing::debug!("Dispatch worker for partition {} stopped", partition);
}
