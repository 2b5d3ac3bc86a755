//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    domain::{Identity, Issue, RoomId, TicketId},
    infrastructure::dto::{
        http::{
            ClaimTicketRequest, ClaimTicketResponse, CloseTicketRequest, HistoryQuery,
            RoomHistoryDto, RoomSummaryDto, SubmitTicketRequest, SubmitTicketResponse,
        },
        websocket::{MessageDto, TicketDto},
    },
    ui::state::AppState,
    usecase::ClaimOutcome,
};

use super::error::ApiError;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Submit a ticket (`202 Accepted` once it is on the queue)
pub async fn submit_ticket(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitTicketRequest>,
) -> Result<(StatusCode, Json<SubmitTicketResponse>), ApiError> {
    let missing = request.missing_fields();
    if !missing.is_empty() {
        tracing::warn!("Rejected ticket submission: missing {:?}", missing);
        return Err(ApiError::bad_request(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    // missing_fields で存在を確認済み
    let requester = Identity::new(request.requester_identity.unwrap_or_default())?;
    let issue = Issue::new(request.issue.unwrap_or_default())?;
    let ticket_id = request.ticket_id.map(TicketId::new).transpose()?;

    let submitted = state
        .submit_ticket_usecase
        .execute(requester, issue, ticket_id)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitTicketResponse {
            ticket_id: submitted.ticket_id.into_string(),
        }),
    ))
}

/// Open tickets, oldest first
pub async fn list_open_tickets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TicketDto>>, ApiError> {
    let tickets = state.list_open_tickets_usecase.execute().await?;
    Ok(Json(tickets.iter().map(TicketDto::from).collect()))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> Result<Json<TicketDto>, ApiError> {
    let ticket_id = TicketId::new(ticket_id)?;
    let ticket = state.get_ticket_usecase.execute(&ticket_id).await?;
    Ok(Json(TicketDto::from(&ticket)))
}

/// Claim a ticket. Losing the race is a `200` with `{rejected: true, claimedBy}`.
pub async fn claim_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    Json(request): Json<ClaimTicketRequest>,
) -> Result<Json<ClaimTicketResponse>, ApiError> {
    let ticket_id = TicketId::new(ticket_id)?;
    let agent = Identity::new(request.agent_identity)?;

    let response = match state
        .claim_ticket_usecase
        .execute(&ticket_id, agent)
        .await?
    {
        ClaimOutcome::Claimed { ticket, room_id } => ClaimTicketResponse::Claimed {
            room_id: room_id.into_string(),
            ticket: TicketDto::from(&ticket),
        },
        ClaimOutcome::Rejected { claimed_by, .. } => ClaimTicketResponse::Rejected {
            rejected: true,
            claimed_by: claimed_by.into_string(),
        },
    };
    Ok(Json(response))
}

/// Close a ticket. The body (`{reason}`) is optional.
pub async fn close_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    body: Bytes,
) -> Result<Json<TicketDto>, ApiError> {
    let ticket_id = TicketId::new(ticket_id)?;
    let request = if body.is_empty() {
        CloseTicketRequest::default()
    } else {
        serde_json::from_slice::<CloseTicketRequest>(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {e}")))?
    };

    let ticket = state
        .close_ticket_usecase
        .execute(&ticket_id, request.reason, None)
        .await?;
    Ok(Json(TicketDto::from(&ticket)))
}

pub async fn cancel_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> Result<Json<TicketDto>, ApiError> {
    let ticket_id = TicketId::new(ticket_id)?;
    let ticket = state.cancel_ticket_usecase.execute(&ticket_id).await?;
    Ok(Json(TicketDto::from(&ticket)))
}

/// Get list of rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.get_rooms_usecase.execute().await;
    Json(rooms.iter().map(RoomSummaryDto::from).collect())
}

/// Room history, for members only
pub async fn get_room_messages(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<RoomHistoryDto>, ApiError> {
    let room_id = RoomId::new(room_id)?;
    let identity = Identity::new(query.identity)?;
    let history = state
        .get_room_history_usecase
        .execute(&room_id, &identity)
        .await?;
    Ok(Json(RoomHistoryDto {
        room_id: room_id.into_string(),
        history: history.iter().map(MessageDto::from).collect(),
    }))
}
