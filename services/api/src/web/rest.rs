//! services/api/src/web/rest.rs
//!
//! Contains the public REST handlers that need no authentication and the
//! master definition for the OpenAPI specification.

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::ApiError;
use crate::web::protocol::{ProgramListResponse, ProgramPayload};
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::login_handler,
        crate::web::auth::register_handler,
        crate::web::auth::logout_handler,
        list_programs_handler,
        crate::web::chat::create_thread_handler,
        crate::web::chat::list_threads_handler,
        crate::web::chat::get_thread_handler,
        crate::web::chat::post_message_handler,
        crate::web::help::list_requests_handler,
        crate::web::help::request_detail_handler,
        crate::web::help::reply_handler,
        crate::web::help::set_status_handler,
        crate::web::help::stats_handler,
        crate::web::student::my_requests_handler,
        crate::web::student::create_request_handler,
        crate::web::student::request_chat_handler,
        crate::web::student::post_chat_message_handler,
    ),
    components(
        schemas(
            crate::web::protocol::LoginRequest,
            crate::web::protocol::LoginResponse,
            crate::web::protocol::UserSummary,
            crate::web::protocol::RegisterRequest,
            crate::web::protocol::RegisterResponse,
            crate::web::protocol::RegisteredUser,
            crate::web::protocol::Ack,
            crate::web::protocol::ProgramListResponse,
            crate::web::protocol::ProgramPayload,
            crate::web::protocol::ThreadCreatedResponse,
            crate::web::protocol::ThreadSummary,
            crate::web::protocol::ThreadMessagesResponse,
            crate::web::protocol::MessagePayload,
            crate::web::protocol::PostMessageRequest,
            crate::web::protocol::AssistantReplyResponse,
            crate::web::protocol::HelpListResponse,
            crate::web::protocol::HelpRequestPayload,
            crate::web::protocol::HelpDetailResponse,
            crate::web::protocol::HelpDetailPayload,
            crate::web::protocol::HelpChatPayload,
            crate::web::protocol::HelpReplyRequest,
            crate::web::protocol::HelpStatusRequest,
            crate::web::protocol::HelpStatsResponse,
            crate::web::protocol::HelpStatsPayload,
            crate::web::protocol::NewHelpRequest,
            crate::web::protocol::CreatedResponse,
            crate::web::protocol::CreatedId,
            crate::web::protocol::HelpChatMessageRequest,
            crate::web::protocol::HelpChatResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "DTAI API", description = "Academic management endpoints for the DTAI division.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Public REST Handlers
//=========================================================================================

/// GET /api/programs - Active degree programs, for the registration form
#[utoipa::path(
    get,
    path = "/api/programs",
    responses(
        (status = 200, description = "Active programs ordered by name", body = ProgramListResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_programs_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let programs = state.directory.list_programs().await?;

    Ok(Json(ProgramListResponse {
        success: true,
        data: programs.into_iter().map(ProgramPayload::from).collect(),
    }))
}
