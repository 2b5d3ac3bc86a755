//! Mapping of domain / use case errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::{RoomError, TicketError, ValueObjectError},
    infrastructure::dto::http::ErrorResponse,
    usecase::{ClaimTicketError, SubmitTicketError},
};

/// HTTP API のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.into(),
                retryable,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message, false)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ValueObjectError> for ApiError {
    fn from(e: ValueObjectError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, e.code(), e.to_string(), false)
    }
}

impl From<TicketError> for ApiError {
    fn from(e: TicketError) -> Self {
        let status = match &e {
            TicketError::NotFound(_) => StatusCode::NOT_FOUND,
            TicketError::InvalidTransition { .. }
            | TicketError::RequesterCannotClaim { .. }
            | TicketError::AlreadyClaimed { .. } => StatusCode::CONFLICT,
            TicketError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, e.code(), e.to_string(), e.is_retryable())
    }
}

impl From<RoomError> for ApiError {
    fn from(e: RoomError) -> Self {
        let status = match &e {
            RoomError::NotFound(_) => StatusCode::NOT_FOUND,
            RoomError::NotAMember { .. } => StatusCode::FORBIDDEN,
            RoomError::RoomFull(_) | RoomError::Closed(_) => StatusCode::CONFLICT,
        };
        Self::new(status, e.code(), e.to_string(), false)
    }
}

impl From<SubmitTicketError> for ApiError {
    fn from(e: SubmitTicketError) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            e.code(),
            e.to_string(),
            e.is_retryable(),
        )
    }
}

impl From<ClaimTicketError> for ApiError {
    fn from(e: ClaimTicketError) -> Self {
        match e {
            ClaimTicketError::Ticket(e) => e.into(),
            ClaimTicketError::Room(e) => e.into(),
        }
    }
}
