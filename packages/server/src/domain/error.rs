//! ドメイン層のエラー定義

use thiserror::Error;

use super::entity::{TicketAction, TicketState};
use super::value_object::{Identity, RoomId, TicketId};

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("unknown role '{0}' (expected 'user' or 'agent')")]
    InvalidRole(String),
}

/// Ticket Registry のエラー
///
/// `AlreadyClaimed` は競合時の通常の結果であり、呼び出し側は
/// 「他のエージェントが対応済み」として扱う。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    #[error("ticket '{0}' not found")]
    NotFound(TicketId),

    #[error("cannot {action} ticket '{ticket_id}' in state {from}")]
    InvalidTransition {
        ticket_id: TicketId,
        from: TicketState,
        action: TicketAction,
    },

    /// 依頼者は自分のチケットを claim できない
    #[error("'{requester}' cannot claim their own ticket '{ticket_id}'")]
    RequesterCannotClaim {
        ticket_id: TicketId,
        requester: Identity,
    },

    #[error("ticket '{ticket_id}' already claimed by '{claimed_by}'")]
    AlreadyClaimed {
        ticket_id: TicketId,
        claimed_by: Identity,
    },

    /// 永続化先が利用できない（インメモリ実装では発生しない）
    #[error("ticket storage unavailable: {0}")]
    Storage(String),
}

/// Room Store のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room '{0}' not found")]
    NotFound(RoomId),

    #[error("'{identity}' is not a member of room '{room_id}'")]
    NotAMember { room_id: RoomId, identity: Identity },

    #[error("room '{0}' is full")]
    RoomFull(RoomId),

    #[error("room '{0}' is closed")]
    Closed(RoomId),
}

/// Ticket Queue のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// 一時的な障害。投稿者はリトライしてよい。
    #[error("failed to publish to ticket queue: {0}")]
    PublishFailed(String),

    #[error("ticket queue is closed")]
    Closed,

    #[error("ticket queue has no partition {0}")]
    UnknownPartition(usize),
}

/// メッセージ送信（通知）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("'{0}' has no live connection")]
    NotConnected(Identity),

    /// 指定した接続は既に新しい接続に置き換えられている
    #[error("connection of '{0}' was superseded")]
    StaleConnection(Identity),

    #[error("push failed: {0}")]
    PushFailed(String),
}

// ========================================
// ワイヤ上のエラーコード
// ========================================

impl ValueObjectError {
    pub fn code(&self) -> &'static str {
        "invalid_input"
    }
}

impl TicketError {
    pub fn code(&self) -> &'static str {
        match self {
            TicketError::NotFound(_) => "ticket_not_found",
            TicketError::InvalidTransition { .. } => "invalid_transition",
            TicketError::RequesterCannotClaim { .. } => "requester_cannot_claim",
            TicketError::AlreadyClaimed { .. } => "already_claimed",
            TicketError::Storage(_) => "storage_unavailable",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, TicketError::Storage(_))
    }
}

impl RoomError {
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::NotFound(_) => "room_not_found",
            RoomError::NotAMember { .. } => "not_a_member",
            RoomError::RoomFull(_) => "room_full",
            RoomError::Closed(_) => "room_closed",
        }
    }
}

impl QueueError {
    pub fn code(&self) -> &'static str {
        match self {
            QueueError::PublishFailed(_) => "queue_publish_failed",
            QueueError::Closed => "queue_closed",
            QueueError::UnknownPartition(_) => "queue_unknown_partition",
        }
    }

    /// 投稿者が後で再送すれば成功しうるか
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::PublishFailed(_) | QueueError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        // テスト項目: エラーコードと再試行可否が種類ごとに固定されている
        // given (前提条件):
        let ticket_id = TicketId::new("tkt-1".to_string()).unwrap();
        let transition = TicketError::InvalidTransition {
            ticket_id: ticket_id.clone(),
            from: TicketState::Cancelled,
            action: TicketAction::Claim,
        };
        let publish = QueueError::PublishFailed("partition full".to_string());

        // when (操作):
        let message = transition.to_string();

        // then (期待する結果):
        assert_eq!(transition.code(), "invalid_transition");
        assert!(!transition.is_retryable());
        assert_eq!(message, "cannot claim ticket 'tkt-1' in state cancelled");
        assert_eq!(publish.code(), "queue_publish_failed");
        assert!(publish.is_retryable());
        assert_eq!(RoomError::Closed(RoomId::for_ticket(&ticket_id)).code(), "room_closed");
    }
}
