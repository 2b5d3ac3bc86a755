//! Ticket Queue のインターフェース
//!
//! `ticket.created` イベントの追記専用ログ。少なくとも 1 回の配信を保証し、
//! パーティション（依頼者 identity で決まる）内では publish 順に配信する。
//!
//! コンシューマは `next` → 処理 → `commit` の順に呼ぶ。commit されるまで
//! `next` は同じレコードを返し続けるため、処理に失敗したレコードは再配信される。

use async_trait::async_trait;

use super::{QueueError, TicketCreatedEvent};

/// publish の受領情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueReceipt {
    pub partition: usize,
    pub offset: u64,
}

/// 配信されるレコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord {
    pub partition: usize,
    pub offset: u64,
    pub event: TicketCreatedEvent,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketQueue: Send + Sync {
    /// イベントを追記する
    ///
    /// 追記できなかった場合は `QueueError::PublishFailed` を返す。黙って捨てることはない。
    async fn publish(&self, event: TicketCreatedEvent) -> Result<QueueReceipt, QueueError>;

    fn partition_count(&self) -> usize;

    /// パーティションの未 commit のうち最も古いレコードを待って返す
    ///
    /// キューがクローズされ、未 commit のレコードもなければ `None`。
    async fn next(&self, partition: usize) -> Option<QueueRecord>;

    /// レコードの処理完了を記録する
    async fn commit(&self, record: &QueueRecord) -> Result<(), QueueError>;

    /// 以降の publish を拒否し、待機中のコンシューマを起こす
    fn close(&self);
}
