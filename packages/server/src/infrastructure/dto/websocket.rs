//! WebSocket message DTOs.
//!
//! Every frame is a JSON object discriminated by `type`; field names are camelCase.

use serde::{Deserialize, Serialize};

/// Commands sent by a client over `/ws`.
///
/// The acting identity is always the identity of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    #[serde(rename = "ticket.submit", rename_all = "camelCase")]
    SubmitTicket {
        issue: String,
        #[serde(default)]
        ticket_id: Option<String>,
    },

    #[serde(rename = "ticket.list_open")]
    ListOpenTickets,

    #[serde(rename = "ticket.claim", rename_all = "camelCase")]
    ClaimTicket { ticket_id: String },

    #[serde(rename = "ticket.cancel", rename_all = "camelCase")]
    CancelTicket { ticket_id: String },

    #[serde(rename = "ticket.close", rename_all = "camelCase")]
    CloseTicket {
        ticket_id: String,
        #[serde(default)]
        reason: Option<String>,
    },

    #[serde(rename = "room.join", rename_all = "camelCase")]
    JoinRoom { room_id: String },

    #[serde(rename = "room.send", rename_all = "camelCase")]
    SendMessage { room_id: String, body: String },
}

/// Ticket as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDto {
    pub ticket_id: String,
    pub requester_identity: String,
    pub issue: String,
    pub state: String,
    pub claimed_by: Option<String>,
    pub room_id: Option<String>,
    pub created_at: i64,
    pub claimed_at: Option<i64>,
    pub closed_at: Option<i64>,
    pub close_reason: Option<String>,
}

/// Chat message as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: u64,
    pub room_id: String,
    pub sender: String,
    pub sender_role: String,
    pub body: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub identity: String,
    pub role: String,
}

/// Events pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "session.connected", rename_all = "camelCase")]
    SessionConnected {
        identity: String,
        role: String,
        connection_id: String,
    },

    #[serde(rename = "session.superseded")]
    SessionSuperseded { identity: String },

    #[serde(rename = "ticket.submitted", rename_all = "camelCase")]
    TicketSubmitted { ticket_id: String },

    #[serde(rename = "ticket.open_list")]
    TicketOpenList { tickets: Vec<TicketDto> },

    #[serde(rename = "ticket.incoming")]
    TicketIncoming { ticket: TicketDto },

    #[serde(rename = "ticket.claimed", rename_all = "camelCase")]
    TicketClaimed { ticket: TicketDto, room_id: String },

    #[serde(rename = "ticket.rejected", rename_all = "camelCase")]
    TicketRejected {
        ticket_id: String,
        rejected: bool,
        claimed_by: String,
    },

    #[serde(rename = "ticket.taken", rename_all = "camelCase")]
    TicketTaken {
        ticket_id: String,
        claimed_by: String,
    },

    #[serde(rename = "ticket.closed")]
    TicketClosed { ticket: TicketDto },

    #[serde(rename = "ticket.cancelled")]
    TicketCancelled { ticket: TicketDto },

    #[serde(rename = "room.history", rename_all = "camelCase")]
    RoomHistory {
        room_id: String,
        members: Vec<MemberDto>,
        closed: bool,
        history: Vec<MessageDto>,
    },

    #[serde(rename = "room.message")]
    RoomMessage { message: MessageDto },

    #[serde(rename = "room.peer_joined", rename_all = "camelCase")]
    PeerJoined {
        room_id: String,
        identity: String,
        role: String,
    },

    #[serde(rename = "room.peer_left", rename_all = "camelCase")]
    PeerLeft {
        room_id: String,
        identity: String,
        at: i64,
    },

    #[serde(rename = "error")]
    Error {
        code: String,
        message: String,
        retryable: bool,
    },
}

impl ServerEvent {
    pub fn error(code: &str, message: impl Into<String>, retryable: bool) -> Self {
        ServerEvent::Error {
            code: code.to_string(),
            message: message.into(),
            retryable,
        }
    }

    /// JSON 文字列にエンコード
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
