//! services/api/src/web/protocol.rs
//!
//! Request and response payloads for the REST API.
//!
//! Most endpoints answer in the `{success, message|data}` envelope. The
//! assistant chat endpoints intentionally deviate and return bare JSON
//! bodies, mirroring the historical behavior of this API (see DESIGN.md).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use dtai_core::domain::{
    ChatMessage, ChatThread, HelpChatMessage, HelpDeskStats, HelpRequest, Program,
};

//=========================================================================================
// Generic envelope
//=========================================================================================

/// Plain `{success, message}` acknowledgment.
#[derive(Serialize, ToSchema)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

//=========================================================================================
// Auth
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

#[derive(Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub avatar_url: Option<String>,
    /// Role-specific profile fields, keyed by the role's own attribute names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Value>,
}

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    // Role-specific fields; which ones are required depends on `role`.
    pub enrollment_number: Option<String>,
    pub employee_number: Option<String>,
    pub program_id: Option<Uuid>,
    pub current_term: Option<i32>,
    pub enrolled_on: Option<NaiveDate>,
    pub hired_on: Option<NaiveDate>,
    pub appointed_on: Option<NaiveDate>,
    pub position: Option<String>,
    pub access_level: Option<String>,
    pub academic_title: Option<String>,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub extension: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub data: RegisteredUser,
}

#[derive(Serialize, ToSchema)]
pub struct RegisteredUser {
    pub principal_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub profile_id: Uuid,
}

//=========================================================================================
// Programs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ProgramListResponse {
    pub success: bool,
    pub data: Vec<ProgramPayload>,
}

#[derive(Serialize, ToSchema)]
pub struct ProgramPayload {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub duration_terms: i32,
}

impl From<Program> for ProgramPayload {
    fn from(program: Program) -> Self {
        Self {
            id: program.id,
            name: program.name,
            code: program.code,
            duration_terms: program.duration_terms,
        }
    }
}

//=========================================================================================
// Assistant chat (bare JSON bodies, see module docs)
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ThreadCreatedResponse {
    pub success: bool,
    pub thread_id: Uuid,
}

#[derive(Serialize, ToSchema)]
pub struct ThreadSummary {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatThread> for ThreadSummary {
    fn from(thread: ChatThread) -> Self {
        Self {
            id: thread.id,
            title: thread.title,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ThreadMessagesResponse {
    pub messages: Vec<MessagePayload>,
}

#[derive(Serialize, ToSchema)]
pub struct MessagePayload {
    pub id: Uuid,
    pub kind: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl From<ChatMessage> for MessagePayload {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            kind: message.kind.as_str().to_string(),
            content: message.content,
            sent_at: message.sent_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct PostMessageRequest {
    pub thread_id: Uuid,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct AssistantReplyResponse {
    pub success: bool,
    pub reply: String,
}

//=========================================================================================
// Help desk
//=========================================================================================

#[derive(Deserialize)]
pub struct HelpListQuery {
    pub search: Option<String>,
    pub group: Option<String>,
    pub term: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HelpRequestPayload {
    pub id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub enrollment_number: String,
    pub current_term: i32,
    pub group_code: Option<String>,
    pub subject_line: String,
    pub detail: String,
    pub status: String,
    pub reply: Option<String>,
    pub assigned_staff_name: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub replied_at: Option<DateTime<Utc>>,
}

impl From<HelpRequest> for HelpRequestPayload {
    fn from(request: HelpRequest) -> Self {
        Self {
            id: request.id,
            student_name: request.student_name,
            student_email: request.student_email,
            enrollment_number: request.enrollment_number,
            current_term: request.current_term,
            group_code: request.group_code,
            subject_line: request.subject_line,
            detail: request.detail,
            status: request.status.as_str().to_string(),
            reply: request.reply,
            assigned_staff_name: request.assigned_staff_name,
            requested_at: request.requested_at,
            replied_at: request.replied_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HelpListResponse {
    pub success: bool,
    pub data: Vec<HelpRequestPayload>,
}

#[derive(Serialize, ToSchema)]
pub struct HelpDetailResponse {
    pub success: bool,
    pub data: HelpDetailPayload,
}

#[derive(Serialize, ToSchema)]
pub struct HelpDetailPayload {
    pub request: HelpRequestPayload,
    pub chat_history: Vec<HelpChatPayload>,
}

#[derive(Serialize, ToSchema)]
pub struct HelpChatPayload {
    pub id: Uuid,
    pub author_name: String,
    pub author_role: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl From<HelpChatMessage> for HelpChatPayload {
    fn from(message: HelpChatMessage) -> Self {
        Self {
            id: message.id,
            author_name: message.author_name,
            author_role: message.author_role,
            body: message.body,
            sent_at: message.sent_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct HelpReplyRequest {
    pub reply: String,
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct HelpStatusRequest {
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct HelpStatsResponse {
    pub success: bool,
    pub data: HelpStatsPayload,
}

#[derive(Serialize, ToSchema)]
pub struct HelpStatsPayload {
    pub total: i64,
    pub open: i64,
    pub resolved: i64,
}

impl From<HelpDeskStats> for HelpStatsPayload {
    fn from(stats: HelpDeskStats) -> Self {
        Self {
            total: stats.total,
            open: stats.open,
            resolved: stats.resolved,
        }
    }
}

//=========================================================================================
// Student-facing help desk
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct NewHelpRequest {
    pub subject_line: String,
    pub detail: String,
}

#[derive(Serialize, ToSchema)]
pub struct CreatedResponse {
    pub success: bool,
    pub message: String,
    pub data: CreatedId,
}

#[derive(Serialize, ToSchema)]
pub struct CreatedId {
    pub id: Uuid,
}

#[derive(Deserialize, ToSchema)]
pub struct HelpChatMessageRequest {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct HelpChatResponse {
    pub success: bool,
    pub data: Vec<HelpChatPayload>,
}
