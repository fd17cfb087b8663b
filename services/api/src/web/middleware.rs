//! services/api/src/web/middleware.rs
//!
//! The authentication gate protecting role-restricted routes.
//!
//! `require_auth` runs two independent checks on the bearer token: signature
//! and embedded expiry via the token codec, then liveness of the matching
//! session row. Whichever check is stricter wins, so a signed token that was
//! revoked server-side is still rejected, and an expired token is rejected
//! even if its session row was left active.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use crate::web::token::TokenCodec;
use dtai_core::domain::Role;

/// Principal context attached to the request after `require_auth` passes.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal_id: Uuid,
    pub role: Role,
    pub email: String,
    pub token: String,
}

/// Staff context attached after `require_staff` resolves the profile.
#[derive(Debug, Clone)]
pub struct StaffContext {
    pub staff_id: Uuid,
    pub principal_id: Uuid,
}

/// Student context attached after `require_student` resolves an active enrollment.
#[derive(Debug, Clone)]
pub struct StudentContext {
    pub student_id: Uuid,
    pub principal_id: Uuid,
    pub enrollment_number: String,
    pub program_id: Uuid,
    pub current_term: i32,
}

/// Middleware validating the bearer token and the session row behind it.
///
/// On success inserts an [`AuthContext`] into request extensions for
/// downstream handlers and role gates.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the bearer token from the Authorization header.
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;
    let token = TokenCodec::extract_bearer(auth_header).ok_or(ApiError::Unauthenticated)?;

    // 2. Verify signature and embedded expiry.
    let claims = state
        .tokens
        .verify(token)
        .map_err(|_| ApiError::InvalidToken)?;

    // 3. The session store must also hold a live row for this exact token;
    //    signature validity alone does not survive server-side revocation.
    let session = state.directory.find_session(token).await?;
    let live = session
        .map(|s| s.active && s.expires_at > Utc::now())
        .unwrap_or(false);
    if !live {
        return Err(ApiError::SessionExpired);
    }

    let context = AuthContext {
        principal_id: claims.principal_id().map_err(|_| ApiError::InvalidToken)?,
        role: claims.role().map_err(|_| ApiError::InvalidToken)?,
        email: claims.email,
        token: token.to_string(),
    };
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

/// Middleware restricting a route to staff principals. Must be layered inside
/// `require_auth`.
pub async fn require_staff(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or(ApiError::Unauthenticated)?;

    let profile = state
        .directory
        .staff_profile(auth.principal_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Usuario no es directivo".to_string()))?;

    req.extensions_mut().insert(StaffContext {
        staff_id: profile.id,
        principal_id: auth.principal_id,
    });

    Ok(next.run(req).await)
}

/// Middleware restricting a route to students with an active enrollment.
/// Must be layered inside `require_auth`.
pub async fn require_student(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or(ApiError::Unauthenticated)?;

    let profile = state
        .directory
        .active_student_profile(auth.principal_id)
        .await?
        .ok_or_else(|| {
            ApiError::Forbidden("Acceso denegado. Usuario no es un estudiante activo".to_string())
        })?;

    req.extensions_mut().insert(StudentContext {
        student_id: profile.id,
        principal_id: auth.principal_id,
        enrollment_number: profile.enrollment_number,
        program_id: profile.program_id,
        current_term: profile.current_term,
    });

    Ok(next.run(req).await)
}
