//! services/api/src/web/student.rs
//!
//! Student-facing help-desk endpoints, protected by the same auth gate plus
//! the active-enrollment check in `require_student`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::StudentContext;
use crate::web::protocol::{
    CreatedId, CreatedResponse, HelpChatMessageRequest, HelpChatPayload, HelpChatResponse,
    HelpListResponse, HelpRequestPayload, NewHelpRequest,
};
use crate::web::state::AppState;

/// GET /api/student/help-requests - The caller's own requests
#[utoipa::path(
    get,
    path = "/api/student/help-requests",
    responses(
        (status = 200, description = "Own requests, most recent first", body = HelpListResponse),
        (status = 403, description = "Caller is not an active student")
    ),
    security(("bearer_token" = []))
)]
pub async fn my_requests_handler(
    State(state): State<Arc<AppState>>,
    Extension(student): Extension<StudentContext>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state
        .help_desk
        .requests_for_student(student.student_id)
        .await?;

    Ok(Json(HelpListResponse {
        success: true,
        data: requests.into_iter().map(HelpRequestPayload::from).collect(),
    }))
}

/// POST /api/student/help-requests - Raise a new help request
#[utoipa::path(
    post,
    path = "/api/student/help-requests",
    request_body = NewHelpRequest,
    responses(
        (status = 201, description = "Request created", body = CreatedResponse),
        (status = 400, description = "Missing fields")
    ),
    security(("bearer_token" = []))
)]
pub async fn create_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(student): Extension<StudentContext>,
    Json(req): Json<NewHelpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.subject_line.trim().is_empty() || req.detail.trim().is_empty() {
        return Err(ApiError::Validation(
            "Tipo de problema y descripción son requeridos".to_string(),
        ));
    }

    let id = state
        .help_desk
        .create_request(student.student_id, req.subject_line.trim(), req.detail.trim())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            success: true,
            message: "Solicitud de ayuda creada exitosamente".to_string(),
            data: CreatedId { id },
        }),
    ))
}

/// GET /api/student/help-requests/{id}/chat - Chat log of an own request
#[utoipa::path(
    get,
    path = "/api/student/help-requests/{id}/chat",
    params(("id" = Uuid, Path, description = "Help request id")),
    responses(
        (status = 200, description = "Chat messages", body = HelpChatResponse),
        (status = 403, description = "Request belongs to another student")
    ),
    security(("bearer_token" = []))
)]
pub async fn request_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(student): Extension<StudentContext>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state
        .help_desk
        .request_chat_for_student(request_id, student.student_id)
        .await?;

    Ok(Json(HelpChatResponse {
        success: true,
        data: messages.into_iter().map(HelpChatPayload::from).collect(),
    }))
}

/// POST /api/student/help-requests/{id}/chat - Append a chat message
#[utoipa::path(
    post,
    path = "/api/student/help-requests/{id}/chat",
    params(("id" = Uuid, Path, description = "Help request id")),
    request_body = HelpChatMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = CreatedResponse),
        (status = 400, description = "Empty message"),
        (status = 403, description = "Request belongs to another student")
    ),
    security(("bearer_token" = []))
)]
pub async fn post_chat_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(student): Extension<StudentContext>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<HelpChatMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ApiError::Validation("El mensaje es requerido".to_string()));
    }

    let id = state
        .help_desk
        .append_student_message(
            request_id,
            student.student_id,
            student.principal_id,
            message,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            success: true,
            message: "Mensaje enviado exitosamente".to_string(),
            data: CreatedId { id },
        }),
    ))
}
