//! HTTP API request / response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::{MemberDto, MessageDto, TicketDto};

/// `POST /api/tickets`
///
/// 必須フィールドの欠落を 1 つのエラーにまとめて返すため、すべて Option で受ける。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTicketRequest {
    pub requester_identity: Option<String>,
    pub issue: Option<String>,
    pub ticket_id: Option<String>,
}

impl SubmitTicketRequest {
    /// 欠落している必須フィールド名（ワイヤ上の名前）
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.requester_identity) {
            missing.push("requesterIdentity");
        }
        if is_blank(&self.issue) {
            missing.push("issue");
        }
        missing
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTicketResponse {
    pub ticket_id: String,
}

/// `POST /api/tickets/{ticket_id}/claim`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimTicketRequest {
    pub agent_identity: String,
}

/// claim の結果。競合で負けた場合も 200 で返す。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ClaimTicketResponse {
    #[serde(rename_all = "camelCase")]
    Claimed { room_id: String, ticket: TicketDto },
    #[serde(rename_all = "camelCase")]
    Rejected { rejected: bool, claimed_by: String },
}

/// `POST /api/tickets/{ticket_id}/close`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CloseTicketRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// `GET /api/rooms/{room_id}/messages?identity=...`
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub identity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub room_id: String,
    pub ticket_id: Option<String>,
    pub members: Vec<MemberDto>,
    pub message_count: usize,
    pub created_at: String,
    pub closed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomHistoryDto {
    pub room_id: String,
    pub history: Vec<MessageDto>,
}

/// エラーレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}
