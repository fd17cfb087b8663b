//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: login, registration and logout.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::ApiError;
use crate::web::middleware::AuthContext;
use crate::web::protocol::{
    Ack, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, RegisteredUser,
    UserSummary,
};
use crate::web::state::AppState;
use crate::web::token::SESSION_TTL_HOURS;
use dtai_core::domain::{
    AccessLevel, NewPrincipal, NewRoleProfile, NewStaffProfile, NewStudentProfile,
    NewTeacherProfile, Role, RoleProfile,
};

/// Role-specific profile attributes merged into the login response.
fn profile_payload(profile: &RoleProfile) -> Value {
    match profile {
        RoleProfile::Student(p) => json!({
            "student_id": p.id,
            "enrollment_number": p.enrollment_number,
            "program_id": p.program_id,
            "current_term": p.current_term,
            "standing": p.standing.as_str(),
            "gpa": p.gpa,
        }),
        RoleProfile::Teacher(p) => json!({
            "teacher_id": p.id,
            "employee_number": p.employee_number,
            "program_id": p.program_id,
            "academic_title": p.academic_title,
            "specialty": p.specialty,
            "years_experience": p.years_experience,
            "is_group_tutor": p.is_group_tutor,
        }),
        RoleProfile::Staff(p) => json!({
            "staff_id": p.id,
            "employee_number": p.employee_number,
            "position": p.position,
            "access_level": p.access_level.as_str(),
            "program_id": p.program_id,
        }),
    }
}

/// POST /api/login - Authenticate and open a 24h session
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Correo y contraseña son requeridos".to_string(),
        ));
    }

    // 1. Only active principals may log in; unknown and deactivated accounts
    //    fail with the same message as a wrong password.
    let creds = state
        .directory
        .find_credentials(&req.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    // 2. Verify the password against the stored hash.
    let parsed_hash = PasswordHash::new(&creds.password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("stored credential is unreadable".to_string())
    })?;
    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    let principal = creds.principal;

    // 3. Enrich the response with the role profile.
    let profile = state.directory.role_profile(principal.id).await?;

    // 4. Sign the token and persist the matching session row.
    let token = state
        .tokens
        .issue(principal.id, principal.role, &principal.email)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let expires_at = Utc::now() + Duration::hours(SESSION_TTL_HOURS);
    state
        .directory
        .create_session(&token, principal.id, expires_at)
        .await?;

    info!("login successful for {}", principal.email);

    Ok(Json(LoginResponse {
        success: true,
        message: "Login exitoso".to_string(),
        token,
        user: UserSummary {
            id: principal.id,
            first_name: principal.first_name,
            last_name: principal.last_name,
            email: principal.email,
            role: principal.role.as_str().to_string(),
            avatar_url: principal.avatar_url,
            profile: profile.as_ref().map(profile_payload),
        },
    }))
}

/// POST /api/register - Create a principal and its role profile
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = RegisterResponse),
        (status = 400, description = "Missing or invalid fields, or duplicate unique key"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let base_fields = [
        &req.first_name,
        &req.last_name,
        &req.email,
        &req.password,
        &req.role,
    ];
    if base_fields.iter().any(|f| f.trim().is_empty()) {
        return Err(ApiError::Validation(
            "Nombre, apellido, correo, contraseña y rol son requeridos".to_string(),
        ));
    }

    let role = Role::parse(&req.role).ok_or_else(|| {
        ApiError::Validation("Rol inválido. Debe ser: student, teacher o staff".to_string())
    })?;

    // Pre-check; the unique constraint remains the authoritative guard.
    if state.directory.email_taken(&req.email).await? {
        return Err(ApiError::Validation(
            "El correo electrónico ya está registrado".to_string(),
        ));
    }

    let profile = build_profile(role, &req)?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("failed to hash password".to_string())
        })?
        .to_string();

    let new = NewPrincipal {
        first_name: req.first_name.clone(),
        last_name: req.last_name.clone(),
        email: req.email.clone(),
        password_hash,
        profile,
    };

    let (principal_id, profile_id) = state.directory.register_principal(&new).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: format!("Usuario {role} registrado exitosamente"),
            data: RegisteredUser {
                principal_id,
                first_name: req.first_name,
                last_name: req.last_name,
                email: req.email,
                role: role.as_str().to_string(),
                profile_id,
            },
        }),
    ))
}

/// Assembles the role profile from the request, enforcing the role-specific
/// required fields.
fn build_profile(role: Role, req: &RegisterRequest) -> Result<NewRoleProfile, ApiError> {
    match role {
        Role::Staff => {
            let (Some(employee_number), Some(position), Some(access_level), Some(appointed_on)) = (
                req.employee_number.clone(),
                req.position.clone(),
                req.access_level.as_deref(),
                req.appointed_on,
            ) else {
                return Err(ApiError::Validation(
                    "Para directivos se requieren: employee_number, position, access_level, appointed_on"
                        .to_string(),
                ));
            };
            let access_level = AccessLevel::parse(access_level).ok_or_else(|| {
                ApiError::Validation(
                    "Nivel de acceso inválido. Debe ser: director, deputy_director o coordinator"
                        .to_string(),
                )
            })?;
            Ok(NewRoleProfile::Staff(NewStaffProfile {
                employee_number,
                position,
                access_level,
                program_id: req.program_id,
                appointed_on,
                phone: req.phone.clone(),
                extension: req.extension.clone(),
            }))
        }
        Role::Teacher => {
            let (Some(employee_number), Some(program_id), Some(hired_on)) =
                (req.employee_number.clone(), req.program_id, req.hired_on)
            else {
                return Err(ApiError::Validation(
                    "Para profesores se requieren: employee_number, program_id, hired_on"
                        .to_string(),
                ));
            };
            Ok(NewRoleProfile::Teacher(NewTeacherProfile {
                employee_number,
                program_id,
                hired_on,
                academic_title: req.academic_title.clone(),
                specialty: req.specialty.clone(),
                phone: req.phone.clone(),
                extension: req.extension.clone(),
            }))
        }
        Role::Student => {
            let (Some(enrollment_number), Some(program_id), Some(enrolled_on)) =
                (req.enrollment_number.clone(), req.program_id, req.enrolled_on)
            else {
                return Err(ApiError::Validation(
                    "Para alumnos se requieren: enrollment_number, program_id, enrolled_on"
                        .to_string(),
                ));
            };
            Ok(NewRoleProfile::Student(NewStudentProfile {
                enrollment_number,
                program_id,
                current_term: req.current_term.unwrap_or(1),
                enrolled_on,
                phone: req.phone.clone(),
            }))
        }
    }
}

/// POST /api/logout - Revoke the presented token's session
#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Session revoked", body = Ack),
        (status = 401, description = "No valid session")
    ),
    security(("bearer_token" = []))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    state.directory.revoke_session(&auth.token).await?;
    Ok(Json(Ack::ok("Sesión cerrada exitosamente")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base_request(role: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Laura".to_string(),
            last_name: "Pérez".to_string(),
            email: "laura@uteq.edu.mx".to_string(),
            password: "hunter2hunter2".to_string(),
            role: role.to_string(),
            enrollment_number: None,
            employee_number: None,
            program_id: None,
            current_term: None,
            enrolled_on: None,
            hired_on: None,
            appointed_on: None,
            position: None,
            access_level: None,
            academic_title: None,
            specialty: None,
            phone: None,
            extension: None,
        }
    }

    #[test]
    fn student_profile_requires_enrollment_fields() {
        let req = base_request("student");
        let err = build_profile(Role::Student, &req).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn student_profile_defaults_to_first_term() {
        let mut req = base_request("student");
        req.enrollment_number = Some("2023-0042".to_string());
        req.program_id = Some(uuid::Uuid::new_v4());
        req.enrolled_on = NaiveDate::from_ymd_opt(2023, 9, 1);

        let profile = build_profile(Role::Student, &req).unwrap();
        let NewRoleProfile::Student(student) = profile else {
            panic!("expected a student profile");
        };
        assert_eq!(student.current_term, 1);
    }

    #[test]
    fn staff_profile_rejects_unknown_access_level() {
        let mut req = base_request("staff");
        req.employee_number = Some("EMP-99".to_string());
        req.position = Some("Director de división".to_string());
        req.access_level = Some("emperor".to_string());
        req.appointed_on = NaiveDate::from_ymd_opt(2020, 1, 15);

        let err = build_profile(Role::Staff, &req).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
