//! Conversion logic between domain entities and DTOs.
//!
//! Conversion only flows outward: inbound DTOs are validated field by field
//! through the value object constructors at the handler boundary.

use kakehashi_shared::time::millis_to_rfc3339;

use crate::domain::{BrokerEvent, ChatMessage, Member, Room, Ticket};
use crate::infrastructure::dto::{
    http::RoomSummaryDto,
    websocket::{MemberDto, MessageDto, ServerEvent, TicketDto},
};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&Ticket> for TicketDto {
    fn from(model: &Ticket) -> Self {
        Self {
            ticket_id: model.id.as_str().to_string(),
            requester_identity: model.requester.as_str().to_string(),
            issue: model.issue.as_str().to_string(),
            state: model.state.as_str().to_string(),
            claimed_by: model.claimed_by.as_ref().map(|id| id.as_str().to_string()),
            room_id: model.room_id.as_ref().map(|id| id.as_str().to_string()),
            created_at: model.created_at.value(),
            claimed_at: model.claimed_at.map(|t| t.value()),
            closed_at: model.closed_at.map(|t| t.value()),
            close_reason: model.close_reason.clone(),
        }
    }
}

impl From<&ChatMessage> for MessageDto {
    fn from(model: &ChatMessage) -> Self {
        Self {
            id: model.id.value(),
            room_id: model.room_id.as_str().to_string(),
            sender: model.sender.as_str().to_string(),
            sender_role: model.sender_role.as_str().to_string(),
            body: model.body.as_str().to_string(),
            timestamp: model.timestamp.value(),
        }
    }
}

impl From<&Member> for MemberDto {
    fn from(model: &Member) -> Self {
        Self {
            identity: model.identity.as_str().to_string(),
            role: model.role.as_str().to_string(),
        }
    }
}

impl From<&Room> for RoomSummaryDto {
    fn from(model: &Room) -> Self {
        Self {
            room_id: model.id.as_str().to_string(),
            ticket_id: model.ticket_id.as_ref().map(|id| id.as_str().to_string()),
            members: model.members.iter().map(MemberDto::from).collect(),
            message_count: model.messages.len(),
            created_at: millis_to_rfc3339(model.created_at.value()),
            closed_at: model.closed_at.map(|t| millis_to_rfc3339(t.value())),
        }
    }
}

impl From<&BrokerEvent> for ServerEvent {
    fn from(event: &BrokerEvent) -> Self {
        match event {
            BrokerEvent::IncomingTicket(ticket) => ServerEvent::TicketIncoming {
                ticket: ticket.into(),
            },
            BrokerEvent::TicketTaken {
                ticket_id,
                claimed_by,
            } => ServerEvent::TicketTaken {
                ticket_id: ticket_id.as_str().to_string(),
                claimed_by: claimed_by.as_str().to_string(),
            },
            BrokerEvent::TicketClaimed { ticket, room_id } => ServerEvent::TicketClaimed {
                ticket: ticket.into(),
                room_id: room_id.as_str().to_string(),
            },
            BrokerEvent::TicketClosed(ticket) => ServerEvent::TicketClosed {
                ticket: ticket.into(),
            },
            BrokerEvent::TicketCancelled(ticket) => ServerEvent::TicketCancelled {
                ticket: ticket.into(),
            },
            BrokerEvent::RoomHistory(room) => ServerEvent::RoomHistory {
                room_id: room.id.as_str().to_string(),
                members: room.members.iter().map(MemberDto::from).collect(),
                closed: room.is_closed(),
                history: room.messages.iter().map(MessageDto::from).collect(),
            },
            BrokerEvent::RoomMessage(message) => ServerEvent::RoomMessage {
                message: message.into(),
            },
            BrokerEvent::PeerJoined {
                room_id,
                identity,
                role,
            } => ServerEvent::PeerJoined {
                room_id: room_id.as_str().to_string(),
                identity: identity.as_str().to_string(),
                role: role.as_str().to_string(),
            },
            BrokerEvent::PeerLeft {
                room_id,
                identity,
                at,
            } => ServerEvent::PeerLeft {
                room_id: room_id.as_str().to_string(),
                identity: identity.as_str().to_string(),
                at: at.value(),
            },
            BrokerEvent::SessionSuperseded { identity } => ServerEvent::SessionSuperseded {
                identity: identity.as_str().to_string(),
            },
        }
    }
}
