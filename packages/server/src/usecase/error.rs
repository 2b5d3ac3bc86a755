//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{QueueError, RoomError, TicketError};

/// チケット投稿のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitTicketError {
    /// キューへの追記に失敗した。投稿者は同じ ticketId で再送してよい。
    #[error("ticket could not be queued: {0}")]
    QueuePublishFailed(QueueError),
}

impl SubmitTicketError {
    pub fn code(&self) -> &'static str {
        "queue_publish_failed"
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            SubmitTicketError::QueuePublishFailed(e) => e.is_retryable(),
        }
    }
}

impl From<QueueError> for SubmitTicketError {
    fn from(e: QueueError) -> Self {
        SubmitTicketError::QueuePublishFailed(e)
    }
}

/// チケット claim のエラー
///
/// 競合による `AlreadyClaimed` はエラーではなく `ClaimOutcome::Rejected` で返る。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimTicketError {
    #[error(transparent)]
    Ticket(#[from] TicketError),

    /// ルームを用意できなかった（チケットは closed に戻される）
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl ClaimTicketError {
    pub fn code(&self) -> &'static str {
        match self {
            ClaimTicketError::Ticket(e) => e.code(),
            ClaimTicketError::Room(e) => e.code(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ClaimTicketError::Ticket(e) => e.is_retryable(),
            ClaimTicketError::Room(_) => false,
        }
    }
}

/// キューからのチケット取り込みのエラー（レコードは再配信される）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("failed to record ticket: {0}")]
    Ticket(#[from] TicketError),
}
