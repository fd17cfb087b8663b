//! services/api/src/web/chat.rs
//!
//! The staff assistant endpoints: conversation threads and message turns.
//!
//! All routes here sit behind `require_auth` + `require_staff`. Unlike the
//! rest of the API these endpoints return bare JSON bodies, a historical
//! quirk preserved on purpose (see DESIGN.md).

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::StaffContext;
use crate::web::protocol::{
    AssistantReplyResponse, MessagePayload, PostMessageRequest, ThreadCreatedResponse,
    ThreadMessagesResponse, ThreadSummary,
};
use crate::web::state::AppState;

const DEFAULT_THREAD_TITLE: &str = "Nueva conversación";
const RECENT_THREADS_LIMIT: i64 = 10;

/// POST /api/chatbot/threads - Open a new assistant conversation
#[utoipa::path(
    post,
    path = "/api/chatbot/threads",
    responses(
        (status = 200, description = "Thread created", body = ThreadCreatedResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not staff")
    ),
    security(("bearer_token" = []))
)]
pub async fn create_thread_handler(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<StaffContext>,
) -> Result<impl IntoResponse, ApiError> {
    let thread_id = state
        .chat
        .create_thread(staff.staff_id, DEFAULT_THREAD_TITLE)
        .await?;

    Ok(Json(ThreadCreatedResponse {
        success: true,
        thread_id,
    }))
}

/// GET /api/chatbot/threads - The caller's 10 most recent conversations
#[utoipa::path(
    get,
    path = "/api/chatbot/threads",
    responses(
        (status = 200, description = "Threads by recency", body = [ThreadSummary]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not staff")
    ),
    security(("bearer_token" = []))
)]
pub async fn list_threads_handler(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<StaffContext>,
) -> Result<impl IntoResponse, ApiError> {
    let threads = state
        .chat
        .recent_threads(staff.staff_id, RECENT_THREADS_LIMIT)
        .await?;

    let payload: Vec<ThreadSummary> = threads.into_iter().map(ThreadSummary::from).collect();
    Ok(Json(payload))
}

/// GET /api/chatbot/threads/{id} - Messages of one conversation
#[utoipa::path(
    get,
    path = "/api/chatbot/threads/{id}",
    params(("id" = Uuid, Path, description = "Thread id")),
    responses(
        (status = 200, description = "Ordered messages", body = ThreadMessagesResponse),
        (status = 404, description = "Thread missing or owned by someone else")
    ),
    security(("bearer_token" = []))
)]
pub async fn get_thread_handler(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<StaffContext>,
    Path(thread_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .chat
        .find_thread(thread_id, staff.staff_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Conversación no encontrada".to_string()))?;

    let messages = state.chat.thread_messages(thread_id).await?;
    Ok(Json(ThreadMessagesResponse {
        messages: messages.into_iter().map(MessagePayload::from).collect(),
    }))
}

/// POST /api/chatbot/messages - One conversation turn
///
/// Classifies the message, produces the assistant's reply, and persists the
/// question/answer pair in a single transaction.
#[utoipa::path(
    post,
    path = "/api/chatbot/messages",
    request_body = PostMessageRequest,
    responses(
        (status = 200, description = "Assistant reply", body = AssistantReplyResponse),
        (status = 400, description = "Missing fields"),
        (status = 404, description = "Thread missing or owned by someone else")
    ),
    security(("bearer_token" = []))
)]
pub async fn post_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::Validation(
            "Datos requeridos faltantes".to_string(),
        ));
    }

    state
        .chat
        .find_thread(req.thread_id, staff.staff_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Conversación no encontrada".to_string()))?;

    // The dispatcher never fails; backend faults become conversational
    // fallbacks inside it. Only the persistence of the turn can error here.
    let reply = state.assistant.respond(&req.message).await;

    state
        .chat
        .append_exchange(req.thread_id, &req.message, &reply)
        .await?;

    Ok(Json(AssistantReplyResponse {
        success: true,
        reply,
    }))
}
