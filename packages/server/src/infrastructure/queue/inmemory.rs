//! InMemory Ticket Queue 実装
//!
//! 依頼者 identity のハッシュでパーティションを決める追記専用ログ。
//! パーティションごとに未 commit のレコードを保持し、`next` は常にその先頭を返す。
//! commit されるまで同じレコードが返り続けるので、処理に失敗したレコードは
//! 自然に再配信される（少なくとも 1 回の配信）。

use std::{
    collections::VecDeque,
    hash::{DefaultHasher, Hash, Hasher},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::domain::{QueueError, QueueReceipt, QueueRecord, TicketCreatedEvent, TicketQueue};

pub const DEFAULT_PARTITION_COUNT: usize = 4;
pub const DEFAULT_PARTITION_CAPACITY: usize = 1024;

#[derive(Default)]
struct Partition {
    /// 未 commit のレコード（offset 昇順）
    pending: VecDeque<QueueRecord>,
    next_offset: u64,
}

/// インメモリ Ticket Queue 実装
pub struct InMemoryTicketQueue {
    partitions: Vec<Mutex<Partition>>,
    notifiers: Vec<Notify>,
    /// パーティションあたりの未 commit レコード数の上限
    capacity: usize,
    closed: AtomicBool,
}

impl Default for InMemoryTicketQueue {
    fn default() -> Self {
        Self::new(DEFAULT_PARTITION_COUNT, DEFAULT_PARTITION_CAPACITY)
    }
}

impl InMemoryTicketQueue {
    /// `partition_count` と `capacity` は 1 以上であること（設定の検証で保証する）
    pub fn new(partition_count: usize, capacity: usize) -> Self {
        let partition_count = partition_count.max(1);
        Self {
            partitions: (0..partition_count)
                .map(|_| Mutex::new(Partition::default()))
                .collect(),
            notifiers: (0..partition_count).map(|_| Notify::new()).collect(),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// キーからパーティションを決める（同じキーは常に同じパーティション）
    pub fn partition_for(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions.len() as u64) as usize
    }

    /// 全パーティションの未 commit レコード数
    pub async fn pending(&self) -> usize {
        let mut total = 0;
        for partition in &self.partitions {
            total += partition.lock().await.pending.len();
        }
        total
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TicketQueue for InMemoryTicketQueue {
    async fn publish(&self, event: TicketCreatedEvent) -> Result<QueueReceipt, QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        let index = self.partition_for(event.partition_key());
        let mut partition = self.partitions[index].lock().await;
        if partition.pending.len() >= self.capacity {
            return Err(QueueError::PublishFailed(format!(
                "partition {} has {} uncommitted records",
                index, self.capacity
            )));
        }

        let offset = partition.next_offset;
        partition.next_offset += 1;
        tracing::debug!(
            "Published {} '{}' to partition {} at offset {}",
            TicketCreatedEvent::TOPIC,
            event.ticket_id,
            index,
            offset
        );
        partition.pending.push_back(QueueRecord {
            partition: index,
            offset,
            event,
        });
        drop(partition);

        self.notifiers[index].notify_one();
        Ok(QueueReceipt {
            partition: index,
            offset,
        })
    }

    fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    async fn next(&self, partition: usize) -> Option<QueueRecord> {
        let slot = self.partitions.get(partition)?;
        loop {
            {
                let state = slot.lock().await;
                if let Some(record) = state.pending.front() {
                    return Some(record.clone());
                }
                if self.is_closed() {
                    return None;
                }
            }
            // パーティションごとにコンシューマは 1 つなので、notify_one の permit で取りこぼさない
            self.notifiers[partition].notified().await;
        }
    }

    async fn commit(&self, record: &QueueRecord) -> Result<(), QueueError> {
        let slot = self
            .partitions
            .get(record.partition)
            .ok_or(QueueError::UnknownPartition(record.partition))?;
        let mut state = slot.lock().await;
        // commit 済みのレコードの再 commit は何もしない
        if let Some(position) = state.pending.iter().position(|r| r.offset == record.offset) {
            state.pending.remove(position);
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for notifier in &self.notifiers {
            notifier.notify_one();
        }
        tracing::info!("Ticket queue closed");
    }
}
