//! ブローカーが参加者へ通知するイベント
//!
//! ここではトランスポートに依存しない形で定義し、ワイヤ形式への変換は
//! Infrastructure 層の DTO が担う。

use super::entity::{ChatMessage, Room, Ticket};
use super::value_object::{Identity, Issue, Role, RoomId, TicketId, Timestamp};

/// Ticket Queue に流れるチケット作成イベント（トピック `ticket.created`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketCreatedEvent {
    pub ticket_id: TicketId,
    pub requester: Identity,
    pub issue: Issue,
    pub submitted_at: Timestamp,
}

impl TicketCreatedEvent {
    pub const TOPIC: &'static str = "ticket.created";

    /// パーティションキー（依頼者ごとの順序を保つ）
    pub fn partition_key(&self) -> &str {
        self.requester.as_str()
    }
}

/// 参加者へプッシュされる通知
#[derive(Debug, Clone)]
pub enum BrokerEvent {
    /// 新しいチケット（接続中のエージェント向け）
    IncomingTicket(Ticket),
    /// 他のエージェントがチケットを取得した
    TicketTaken {
        ticket_id: TicketId,
        claimed_by: Identity,
    },
    /// チケットが claim され、ルームが用意された（依頼者向け）
    TicketClaimed { ticket: Ticket, room_id: RoomId },
    TicketClosed(Ticket),
    TicketCancelled(Ticket),
    /// join への応答（その時点までの履歴）
    RoomHistory(Room),
    /// ルームへのライブ配信
    RoomMessage(ChatMessage),
    PeerJoined {
        room_id: RoomId,
        identity: Identity,
        role: Role,
    },
    PeerLeft {
        room_id: RoomId,
        identity: Identity,
        at: Timestamp,
    },
    /// 同じ identity の新しい接続に置き換えられた（旧接続向け）
    SessionSuperseded { identity: Identity },
}
