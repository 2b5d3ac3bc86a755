//! Domain layer: value objects, entities, events and the interfaces the
//! use cases depend on.

pub mod entity;
pub mod error;
pub mod event;
pub mod factory;
pub mod presence;
pub mod queue;
pub mod repository;
pub mod value_object;

pub use entity::{
    Attachment, ChatMessage, DEFAULT_ROOM_CAPACITY, Member, Participant, Room, Ticket,
    TicketAction, TicketState, TicketTransition,
};
pub use error::{MessagePushError, QueueError, RoomError, TicketError, ValueObjectError};
pub use event::{BrokerEvent, TicketCreatedEvent};
pub use factory::TicketIdFactory;
pub use presence::{
    ConnectOutcome, LiveHandle, MessagePusher, MessageRelay, PresenceRegistry, PusherChannel,
};
pub use queue::{QueueReceipt, QueueRecord, TicketQueue};
pub use repository::{RoomRepository, TicketRepository, TicketUpdate};
pub use value_object::{
    ConnectionId, Identity, Issue, MessageBody, MessageId, Role, RoomId, TicketId, Timestamp,
};

#[cfg(test)]
pub use queue::MockTicketQueue;
#[cfg(test)]
pub use repository::MockTicketRepository;
