//! WebSocket connection handlers.

use std::{str::FromStr, sync::Arc};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, Identity, Issue, MessageBody, Role, RoomId, TicketId},
    infrastructure::dto::websocket::{ClientCommand, ServerEvent, TicketDto},
    ui::state::AppState,
    usecase::{ClaimOutcome, ConnectedSession},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub identity: String,
    pub role: String,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> Identity / Role (Domain Model)
    let identity = match Identity::new(query.identity.clone()) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("Invalid identity '{}': {}", query.identity, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    let role = match Role::from_str(&query.role) {
        Ok(role) => role,
        Err(e) => {
            tracing::warn!("Invalid role for '{}': {}", identity, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity, role)))
}

/// Spawns a task that forwards everything pushed to this connection onto the socket.
///
/// The channel closes when the connection is superseded or disconnected; the socket is
/// then closed as well.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: Identity, role: Role) {
    let (mut sender, mut receiver) = socket.split();

    // Create a channel for this connection and register it with the Presence Registry
    let (tx, rx) = mpsc::unbounded_channel();
    let session = state
        .connect_participant_usecase
        .execute(identity.clone(), role, tx)
        .await;
    let connection_id = session.connection_id;

    // Greet the connection before anything queued on the channel is forwarded
    for event in greeting(&session) {
        let Some(text) = encode(&event) else {
            continue;
        };
        if let Err(e) = sender.send(Message::Text(text.into())).await {
            tracing::warn!("Failed to greet '{}': {}", identity, e);
            state
                .disconnect_participant_usecase
                .execute(identity, connection_id)
                .await;
            return;
        }
    }

    // Spawn a task to receive commands from this connection
    let state_for_recv = state.clone();
    let identity_for_recv = identity.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let reply = match serde_json::from_str::<ClientCommand>(&text) {
                        Ok(command) => {
                            handle_command(
                                &state_for_recv,
                                &identity_for_recv,
                                role,
                                connection_id,
                                command,
                            )
                            .await
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Malformed command from '{}': {}",
                                identity_for_recv,
                                e
                            );
                            Some(ServerEvent::error(
                                "bad_request",
                                format!("malformed command: {e}"),
                                false,
                            ))
                        }
                    };
                    if let Some(reply) = reply {
                        reply_to(&state_for_recv, &identity_for_recv, connection_id, &reply)
                            .await;
                    }
                }
                Message::Ping(_) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                    tracing::debug!("Received ping");
                }
                Message::Close(_) => {
                    tracing::info!("'{}' requested close", identity_for_recv);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to push events to this connection
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state
        .disconnect_participant_usecase
        .execute(identity, connection_id)
        .await;
}

/// Events sent right after connecting: `session.connected`, plus the open tickets for agents.
fn greeting(session: &ConnectedSession) -> Vec<ServerEvent> {
    let mut events = vec![ServerEvent::SessionConnected {
        identity: session.participant.identity.as_str().to_string(),
        role: session.participant.role.as_str().to_string(),
        connection_id: session.connection_id.to_string(),
    }];
    if session.participant.role == Role::Agent {
        events.push(ServerEvent::TicketOpenList {
            tickets: session.open_tickets.iter().map(TicketDto::from).collect(),
        });
    }
    events
}

fn encode(event: &ServerEvent) -> Option<String> {
    match event.to_json() {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!("Failed to encode event: {}", e);
            None
        }
    }
}

/// Send a reply to the connection that issued the command
async fn reply_to(
    state: &AppState,
    identity: &Identity,
    connection_id: ConnectionId,
    event: &ServerEvent,
) {
    let Some(text) = encode(event) else {
        return;
    };
    if let Err(e) = state
        .message_pusher
        .push_text(identity, connection_id, text)
        .await
    {
        tracing::debug!("Reply to '{}' dropped: {}", identity, e);
    }
}

fn forbidden(message: &str) -> ServerEvent {
    ServerEvent::error("forbidden", message, false)
}

/// Run a client command on behalf of the connection.
///
/// Returns the reply for the issuing connection, if any. `room.join` and a successful
/// `room.send` have no reply: the history is replayed through the relay, and messages are
/// not echoed.
async fn handle_command(
    state: &AppState,
    identity: &Identity,
    role: Role,
    connection_id: ConnectionId,
    command: ClientCommand,
) -> Option<ServerEvent> {
    let result = match command {
        ClientCommand::SubmitTicket { issue, ticket_id } => {
            submit(state, identity, issue, ticket_id).await
        }
        ClientCommand::ListOpenTickets => state
            .list_open_tickets_usecase
            .execute()
            .await
            .map(|tickets| {
                Some(ServerEvent::TicketOpenList {
                    tickets: tickets.iter().map(TicketDto::from).collect(),
                })
            })
            .map_err(|e| ServerEvent::error(e.code(), e.to_string(), e.is_retryable())),
        ClientCommand::ClaimTicket { ticket_id } => {
            if role != Role::Agent {
                return Some(forbidden("only agents can claim tickets"));
            }
            claim(state, identity, ticket_id).await
        }
        ClientCommand::CancelTicket { ticket_id } => cancel(state, identity, ticket_id).await,
        ClientCommand::CloseTicket { ticket_id, reason } => {
            close(state, identity, ticket_id, reason).await
        }
        ClientCommand::JoinRoom { room_id } => {
            join(state, identity, connection_id, room_id).await
        }
        ClientCommand::SendMessage { room_id, body } => send(state, identity, room_id, body).await,
    };

    match result {
        Ok(reply) => reply,
        Err(error) => Some(error),
    }
}

type CommandResult = Result<Option<ServerEvent>, ServerEvent>;

fn invalid_input(e: crate::domain::ValueObjectError) -> ServerEvent {
    ServerEvent::error(e.code(), e.to_string(), false)
}

async fn submit(
    state: &AppState,
    identity: &Identity,
    issue: String,
    ticket_id: Option<String>,
) -> CommandResult {
    let issue = Issue::new(issue).map_err(invalid_input)?;
    let ticket_id = ticket_id
        .map(TicketId::new)
        .transpose()
        .map_err(invalid_input)?;
    let submitted = state
        .submit_ticket_usecase
        .execute(identity.clone(), issue, ticket_id)
        .await
        .map_err(|e| ServerEvent::error(e.code(), e.to_string(), e.is_retryable()))?;
    Ok(Some(ServerEvent::TicketSubmitted {
        ticket_id: submitted.ticket_id.into_string(),
    }))
}

async fn claim(state: &AppState, identity: &Identity, ticket_id: String) -> CommandResult {
    let ticket_id = TicketId::new(ticket_id).map_err(invalid_input)?;
    let outcome = state
        .claim_ticket_usecase
        .execute(&ticket_id, identity.clone())
        .await
        .map_err(|e| ServerEvent::error(e.code(), e.to_string(), e.is_retryable()))?;
    Ok(Some(match outcome {
        ClaimOutcome::Claimed { ticket, room_id } => ServerEvent::TicketClaimed {
            ticket: TicketDto::from(&ticket),
            room_id: room_id.into_string(),
        },
        ClaimOutcome::Rejected {
            ticket_id,
            claimed_by,
        } => ServerEvent::TicketRejected {
            ticket_id: ticket_id.into_string(),
            rejected: true,
            claimed_by: claimed_by.into_string(),
        },
    }))
}

async fn cancel(state: &AppState, identity: &Identity, ticket_id: String) -> CommandResult {
    let ticket_id = TicketId::new(ticket_id).map_err(invalid_input)?;
    let ticket = state
        .get_ticket_usecase
        .execute(&ticket_id)
        .await
        .map_err(|e| ServerEvent::error(e.code(), e.to_string(), e.is_retryable()))?;
    if &ticket.requester != identity {
        return Err(forbidden("only the requester can cancel a ticket"));
    }

    let ticket = state
        .cancel_ticket_usecase
        .execute(&ticket_id)
        .await
        .map_err(|e| ServerEvent::error(e.code(), e.to_string(), e.is_retryable()))?;
    Ok(Some(ServerEvent::TicketCancelled {
        ticket: TicketDto::from(&ticket),
    }))
}

async fn close(
    state: &AppState,
    identity: &Identity,
    ticket_id: String,
    reason: Option<String>,
) -> CommandResult {
    let ticket_id = TicketId::new(ticket_id).map_err(invalid_input)?;
    let ticket = state
        .get_ticket_usecase
        .execute(&ticket_id)
        .await
        .map_err(|e| ServerEvent::error(e.code(), e.to_string(), e.is_retryable()))?;
    if &ticket.requester != identity && ticket.claimed_by.as_ref() != Some(identity) {
        return Err(forbidden("only the requester or the assigned agent can close a ticket"));
    }

    let ticket = state
        .close_ticket_usecase
        .execute(&ticket_id, reason, Some(identity))
        .await
        .map_err(|e| ServerEvent::error(e.code(), e.to_string(), e.is_retryable()))?;
    Ok(Some(ServerEvent::TicketClosed {
        ticket: TicketDto::from(&ticket),
    }))
}

async fn join(
    state: &AppState,
    identity: &Identity,
    connection_id: ConnectionId,
    room_id: String,
) -> CommandResult {
    let room_id = RoomId::new(room_id).map_err(invalid_input)?;
    state
        .join_room_usecase
        .execute(&room_id, identity, connection_id)
        .await
        .map_err(|e| ServerEvent::error(e.code(), e.to_string(), false))?;
    Ok(None)
}

async fn send(state: &AppState, identity: &Identity, room_id: String, body: String) -> CommandResult {
    let room_id = RoomId::new(room_id).map_err(invalid_input)?;
    let body = MessageBody::new(body).map_err(invalid_input)?;
    state
        .send_message_usecase
        .execute(&room_id, identity, body)
        .await
        .map_err(|e| ServerEvent::error(e.code(), e.to_string(), false))?;
    Ok(None)
}
