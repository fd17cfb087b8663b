//! services/api/src/web/help.rs
//!
//! Staff help-desk endpoints over student help requests.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::StaffContext;
use crate::web::protocol::{
    Ack, HelpChatPayload, HelpDetailPayload, HelpDetailResponse, HelpListQuery, HelpListResponse,
    HelpReplyRequest, HelpRequestPayload, HelpStatsPayload, HelpStatsResponse, HelpStatusRequest,
};
use crate::web::state::AppState;
use dtai_core::domain::{HelpRequestFilter, HelpStatus};

/// Filters arrive as free-form query strings; "todos" is the UI's marker for
/// "no filter" and an unknown status is a caller error.
fn build_filter(query: HelpListQuery) -> Result<HelpRequestFilter, ApiError> {
    let meaningful = |v: Option<String>| v.filter(|s| !s.is_empty() && s != "todos");

    let term = match meaningful(query.term) {
        Some(raw) => Some(raw.parse::<i32>().map_err(|_| {
            ApiError::Validation("Cuatrimestre inválido".to_string())
        })?),
        None => None,
    };
    let status = match meaningful(query.status) {
        Some(raw) => Some(
            HelpStatus::parse(&raw)
                .ok_or_else(|| ApiError::Validation("Estado inválido".to_string()))?,
        ),
        None => None,
    };

    Ok(HelpRequestFilter {
        search: meaningful(query.search),
        group_code: meaningful(query.group),
        term,
        status,
    })
}

/// GET /api/help-requests - Filterable listing of help requests
#[utoipa::path(
    get,
    path = "/api/help-requests",
    responses(
        (status = 200, description = "Matching requests", body = HelpListResponse),
        (status = 400, description = "Invalid filter value")
    ),
    security(("bearer_token" = []))
)]
pub async fn list_requests_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HelpListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = build_filter(query)?;
    let requests = state.help_desk.list_requests(&filter).await?;

    Ok(Json(HelpListResponse {
        success: true,
        data: requests.into_iter().map(HelpRequestPayload::from).collect(),
    }))
}

/// GET /api/help-requests/{id} - One request plus its chat history
#[utoipa::path(
    get,
    path = "/api/help-requests/{id}",
    params(("id" = Uuid, Path, description = "Help request id")),
    responses(
        (status = 200, description = "Request detail", body = HelpDetailResponse),
        (status = 404, description = "Unknown request")
    ),
    security(("bearer_token" = []))
)]
pub async fn request_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (request, chat) = state
        .help_desk
        .request_detail(request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Solicitud no encontrada".to_string()))?;

    Ok(Json(HelpDetailResponse {
        success: true,
        data: HelpDetailPayload {
            request: HelpRequestPayload::from(request),
            chat_history: chat.into_iter().map(HelpChatPayload::from).collect(),
        },
    }))
}

/// POST /api/help-requests/{id}/reply - Answer a request
///
/// Stores the reply and appends it to the request's chat log in one
/// transaction; a fault in either write rolls back both.
#[utoipa::path(
    post,
    path = "/api/help-requests/{id}/reply",
    params(("id" = Uuid, Path, description = "Help request id")),
    request_body = HelpReplyRequest,
    responses(
        (status = 200, description = "Reply stored", body = Ack),
        (status = 400, description = "Missing reply or invalid status"),
        (status = 404, description = "Unknown request")
    ),
    security(("bearer_token" = []))
)]
pub async fn reply_handler(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<StaffContext>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<HelpReplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.reply.trim().is_empty() {
        return Err(ApiError::Validation("La respuesta es requerida".to_string()));
    }
    let status = match req.status.as_deref() {
        Some(raw) => HelpStatus::parse(raw)
            .ok_or_else(|| ApiError::Validation("Estado inválido".to_string()))?,
        None => HelpStatus::InProgress,
    };

    state
        .help_desk
        .reply_to_request(
            request_id,
            staff.staff_id,
            staff.principal_id,
            &req.reply,
            status,
        )
        .await?;

    Ok(Json(Ack::ok("Respuesta enviada exitosamente")))
}

/// PATCH /api/help-requests/{id}/status - Move a request through its lifecycle
#[utoipa::path(
    patch,
    path = "/api/help-requests/{id}/status",
    params(("id" = Uuid, Path, description = "Help request id")),
    request_body = HelpStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Ack),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Unknown request")
    ),
    security(("bearer_token" = []))
)]
pub async fn set_status_handler(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<HelpStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = HelpStatus::parse(&req.status)
        .ok_or_else(|| ApiError::Validation("Estado inválido".to_string()))?;

    state.help_desk.set_status(request_id, status).await?;

    Ok(Json(Ack::ok("Estado actualizado exitosamente")))
}

/// GET /api/help-requests/stats - Help-desk totals
#[utoipa::path(
    get,
    path = "/api/help-requests/stats",
    responses(
        (status = 200, description = "Counters", body = HelpStatsResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.help_desk.stats().await?;

    Ok(Json(HelpStatsResponse {
        success: true,
        data: HelpStatsPayload::from(stats),
    }))
}
