//! UseCase 層
//!
//! 境界の操作（WebSocket コマンド / HTTP エンドポイント / バックグラウンドタスク）
//! ごとに 1 つのユースケースを置く。

pub mod cancel_ticket;
pub mod claim_ticket;
pub mod close_ticket;
pub mod connect_participant;
pub mod disconnect_participant;
pub mod dispatch_ticket;
pub mod error;
pub mod evict_rooms;
pub mod get_room_history;
pub mod get_rooms;
pub mod get_ticket;
pub mod join_room;
pub mod list_open_tickets;
pub mod send_message;
pub mod submit_ticket;

pub use cancel_ticket::CancelTicketUseCase;
pub use claim_ticket::{ClaimOutcome, ClaimTicketUseCase};
pub use close_ticket::CloseTicketUseCase;
pub use connect_participant::{ConnectParticipantUseCase, ConnectedSession};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use dispatch_ticket::{DispatchTicketUseCase, TicketDispatcher};
pub use error::{ClaimTicketError, DispatchError, SubmitTicketError};
pub use evict_rooms::EvictRoomsUseCase;
pub use get_room_history::GetRoomHistoryUseCase;
pub use get_rooms::GetRoomsUseCase;
pub use get_ticket::GetTicketUseCase;
pub use join_room::JoinRoomUseCase;
pub use list_open_tickets::ListOpenTicketsUseCase;
pub use send_message::SendMessageUseCase;
pub use submit_ticket::{SubmitTicketUseCase, SubmittedTicket};
