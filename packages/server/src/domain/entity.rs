//! エンティティ定義
//!
//! 状態遷移のルールはすべてここに置く。Repository はこれらのメソッドを
//! 排他区間の中で呼ぶだけで、ルールそのものは持たない。

use std::collections::HashMap;
use std::fmt;

use super::error::{RoomError, TicketError};
use super::value_object::{
    ConnectionId, Identity, Issue, MessageBody, MessageId, Role, RoomId, TicketId, Timestamp,
};

/// ルームの既定の定員（1:1 サポートチャット）
pub const DEFAULT_ROOM_CAPACITY: usize = 2;

// ========================================
// Ticket
// ========================================

/// チケットの状態
///
/// ```text
/// open ──claim──▶ claimed ──activate──▶ active ──close──▶ closed
///   │                 │                                    ▲
///   └─cancel─▶ cancelled └──────────────close───────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketState {
    Open,
    Claimed,
    Active,
    Closed,
    Cancelled,
}

impl TicketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::Open => "open",
            TicketState::Claimed => "claimed",
            TicketState::Active => "active",
            TicketState::Closed => "closed",
            TicketState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 遷移の種類（エラーメッセージ用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketAction {
    Claim,
    Activate,
    Close,
    Cancel,
}

impl fmt::Display for TicketAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TicketAction::Claim => "claim",
            TicketAction::Activate => "activate",
            TicketAction::Close => "close",
            TicketAction::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

/// チケットに対する状態遷移の要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketTransition {
    Claim { agent: Identity, at: Timestamp },
    Activate { room_id: RoomId },
    Close { reason: String, at: Timestamp },
    Cancel { at: Timestamp },
}

impl TicketTransition {
    pub fn action(&self) -> TicketAction {
        match self {
            TicketTransition::Claim { .. } => TicketAction::Claim,
            TicketTransition::Activate { .. } => TicketAction::Activate,
            TicketTransition::Close { .. } => TicketAction::Close,
            TicketTransition::Cancel { .. } => TicketAction::Cancel,
        }
    }
}

/// サポートチケット
///
/// `claimed_by` は state が claimed / active / closed のときだけ Some で、
/// 一度設定されたら変わらない。open のチケットはルームを持たない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: TicketId,
    pub requester: Identity,
    pub issue: Issue,
    pub state: TicketState,
    pub claimed_by: Option<Identity>,
    pub room_id: Option<RoomId>,
    pub created_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub closed_at: Option<Timestamp>,
    pub close_reason: Option<String>,
}

impl Ticket {
    /// open 状態のチケットを作成
    pub fn open(id: TicketId, requester: Identity, issue: Issue, created_at: Timestamp) -> Self {
        Self {
            id,
            requester,
            issue,
            state: TicketState::Open,
            claimed_by: None,
            room_id: None,
            created_at,
            claimed_at: None,
            closed_at: None,
            close_reason: None,
        }
    }

    /// 状態遷移を適用する
    ///
    /// 失敗した場合、self は一切変更されない。
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - 状態が変化した
    /// * `Ok(false)` - 既に要求された状態だった（close の重複のみ）
    pub fn apply(&mut self, transition: TicketTransition) -> Result<bool, TicketError> {
        let action = transition.action();
        match (self.state, transition) {
            (TicketState::Open, TicketTransition::Claim { agent, .. }) if agent == self.requester => {
                Err(TicketError::RequesterCannotClaim {
                    ticket_id: self.id.clone(),
                    requester: agent,
                })
            }
            (TicketState::Open, TicketTransition::Claim { agent, at }) => {
                self.state = TicketState::Claimed;
                self.claimed_by = Some(agent);
                self.claimed_at = Some(at);
                Ok(true)
            }
            (TicketState::Claimed | TicketState::Active, TicketTransition::Claim { .. }) => {
                match &self.claimed_by {
                    Some(claimed_by) => Err(TicketError::AlreadyClaimed {
                        ticket_id: self.id.clone(),
                        claimed_by: claimed_by.clone(),
                    }),
                    None => Err(self.invalid(action)),
                }
            }
            (TicketState::Claimed, TicketTransition::Activate { room_id }) => {
                self.state = TicketState::Active;
                self.room_id = Some(room_id);
                Ok(true)
            }
            (TicketState::Claimed | TicketState::Active, TicketTransition::Close { reason, at }) => {
                self.state = TicketState::Closed;
                self.closed_at = Some(at);
                self.close_reason = Some(reason);
                Ok(true)
            }
            (TicketState::Closed, TicketTransition::Close { .. }) => Ok(false),
            (TicketState::Open, TicketTransition::Cancel { at }) => {
                self.state = TicketState::Cancelled;
                self.closed_at = Some(at);
                Ok(true)
            }
            _ => Err(self.invalid(action)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == TicketState::Open
    }

    fn invalid(&self, action: TicketAction) -> TicketError {
        TicketError::InvalidTransition {
            ticket_id: self.id.clone(),
            from: self.state,
            action,
        }
    }
}

// ========================================
// Room
// ========================================

/// ルームのメンバー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub identity: Identity,
    pub role: Role,
}

impl Member {
    pub fn new(identity: Identity, role: Role) -> Self {
        Self { identity, role }
    }
}

/// ルームに join 済みの接続
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub identity: Identity,
    pub connection_id: ConnectionId,
}

/// チャットメッセージ（追加後は不変）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender: Identity,
    pub sender_role: Role,
    pub body: MessageBody,
    pub timestamp: Timestamp,
}

/// 会話ルーム
///
/// メンバーは切断しても記録から消えない。`messages` の並びが配信順であり、
/// 再接続時のリプレイもこの順序で行う。
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub ticket_id: Option<TicketId>,
    pub members: Vec<Member>,
    pub messages: Vec<ChatMessage>,
    pub created_at: Timestamp,
    pub closed_at: Option<Timestamp>,
    capacity: usize,
    attachments: HashMap<Identity, ConnectionId>,
}

impl Room {
    pub fn new(id: RoomId, ticket_id: Option<TicketId>, created_at: Timestamp) -> Self {
        Self::with_capacity(id, ticket_id, created_at, DEFAULT_ROOM_CAPACITY)
    }

    pub fn with_capacity(
        id: RoomId,
        ticket_id: Option<TicketId>,
        created_at: Timestamp,
        capacity: usize,
    ) -> Self {
        Self {
            id,
            ticket_id,
            members: Vec::new(),
            messages: Vec::new(),
            created_at,
            closed_at: None,
            capacity,
            attachments: HashMap::new(),
        }
    }

    /// メンバーを追加する
    ///
    /// 既にメンバーなら何もせず `Ok(false)` を返す。
    pub fn add_member(&mut self, member: Member) -> Result<bool, RoomError> {
        if self.is_member(&member.identity) {
            return Ok(false);
        }
        if self.members.len() >= self.capacity {
            return Err(RoomError::RoomFull(self.id.clone()));
        }
        self.members.push(member);
        Ok(true)
    }

    pub fn member(&self, identity: &Identity) -> Option<&Member> {
        self.members.iter().find(|m| &m.identity == identity)
    }

    pub fn is_member(&self, identity: &Identity) -> bool {
        self.member(identity).is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// 接続をルームに紐付け、その時点までの履歴を返す
    ///
    /// 以降に追加されたメッセージだけがこの接続へライブ配信される。
    pub fn attach(
        &mut self,
        identity: &Identity,
        connection_id: ConnectionId,
    ) -> Result<Vec<ChatMessage>, RoomError> {
        if !self.is_member(identity) {
            return Err(self.not_a_member(identity));
        }
        self.attachments.insert(identity.clone(), connection_id);
        Ok(self.messages.clone())
    }

    /// メッセージを履歴の末尾に追加する
    pub fn append_message(
        &mut self,
        sender: &Identity,
        body: MessageBody,
        timestamp: Timestamp,
    ) -> Result<ChatMessage, RoomError> {
        let sender_role = match self.member(sender) {
            Some(member) => member.role,
            None => return Err(self.not_a_member(sender)),
        };
        if self.is_closed() {
            return Err(RoomError::Closed(self.id.clone()));
        }

        let id = self
            .messages
            .last()
            .map(|m| m.id.next())
            .unwrap_or_else(|| MessageId::new(1));
        let message = ChatMessage {
            id,
            room_id: self.id.clone(),
            sender: sender.clone(),
            sender_role,
            body,
            timestamp,
        };
        self.messages.push(message.clone());
        Ok(message)
    }

    /// 送信者以外で join 済みの接続
    pub fn live_recipients(&self, sender: &Identity) -> Vec<Attachment> {
        self.members
            .iter()
            .filter(|m| &m.identity != sender)
            .filter_map(|m| {
                self.attachments
                    .get(&m.identity)
                    .map(|connection_id| Attachment {
                        identity: m.identity.clone(),
                        connection_id: *connection_id,
                    })
            })
            .collect()
    }

    /// 指定メンバー以外のメンバー
    pub fn other_members(&self, identity: &Identity) -> Vec<Identity> {
        self.members
            .iter()
            .filter(|m| &m.identity != identity)
            .map(|m| m.identity.clone())
            .collect()
    }

    /// ルームをクローズする。既にクローズ済みなら `false`。
    pub fn close(&mut self, at: Timestamp) -> bool {
        if self.is_closed() {
            return false;
        }
        self.closed_at = Some(at);
        true
    }

    /// クローズ後の保持期間を過ぎているか
    pub fn is_expired(&self, now: Timestamp, retention_millis: i64) -> bool {
        match self.closed_at {
            Some(closed_at) => closed_at.value().saturating_add(retention_millis) <= now.value(),
            None => false,
        }
    }

    fn not_a_member(&self, identity: &Identity) -> RoomError {
        RoomError::NotAMember {
            room_id: self.id.clone(),
            identity: identity.clone(),
        }
    }
}

// ========================================
// Participant
// ========================================

/// 参加者（プレゼンス）
///
/// 切断しても identity / role / current_room は保持され、再接続で再開できる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub identity: Identity,
    pub role: Role,
    pub connection_id: Option<ConnectionId>,
    pub current_room: Option<RoomId>,
    pub connected_at: Option<Timestamp>,
    pub last_seen_at: Timestamp,
}

impl Participant {
    pub fn new(identity: Identity, role: Role, at: Timestamp) -> Self {
        Self {
            identity,
            role,
            connection_id: None,
            current_room: None,
            connected_at: None,
            last_seen_at: at,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_id.is_some()
    }
}
