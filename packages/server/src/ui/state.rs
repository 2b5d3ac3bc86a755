//! Shared state of the HTTP / WebSocket handlers.

use std::sync::Arc;

use crate::{
    domain::MessagePusher,
    usecase::{
        CancelTicketUseCase, ClaimTicketUseCase, CloseTicketUseCase, ConnectParticipantUseCase,
        DisconnectParticipantUseCase, GetRoomHistoryUseCase, GetRoomsUseCase, GetTicketUseCase,
        JoinRoomUseCase, ListOpenTicketsUseCase, SendMessageUseCase, SubmitTicketUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    pub submit_ticket_usecase: Arc<SubmitTicketUseCase>,
    pub list_open_tickets_usecase: Arc<ListOpenTicketsUseCase>,
    pub get_ticket_usecase: Arc<GetTicketUseCase>,
    pub claim_ticket_usecase: Arc<ClaimTicketUseCase>,
    pub close_ticket_usecase: Arc<CloseTicketUseCase>,
    pub cancel_ticket_usecase: Arc<CancelTicketUseCase>,
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    pub get_room_history_usecase: Arc<GetRoomHistoryUseCase>,
    /// MessagePusher（コマンドへの応答を接続に返す）
    pub message_pusher: Arc<dyn MessagePusher>,
}
