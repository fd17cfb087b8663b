//! services/api/tests/auth_gate.rs
//!
//! Exercises the auth gate and the auth/chat handlers against in-memory stub
//! ports: the bearer-token checks, the session-liveness double-check, the
//! staff profile gate, login session issuance, and the chat turn.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::middleware as axum_middleware;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tower::ServiceExt;
use uuid::Uuid;

use api_lib::config::Config;
use api_lib::web::middleware::{require_auth, require_staff, AuthContext, StaffContext};
use api_lib::web::state::AppState;
use api_lib::web::token::{Claims, TokenCodec};
use api_lib::web::{auth, chat};
use dtai_core::assistant::Assistant;
use dtai_core::domain::{
    AccessLevel, AuthSession, ChatMessage, ChatThread, GlobalStats, GroupStanding,
    HelpChatMessage, HelpDeskStats, HelpRequest, HelpRequestFilter, HelpStatus, NewPrincipal,
    Principal, PrincipalCredentials, Program, ProgramSummary, Role, RoleProfile, SearchHit,
    StaffMember, StaffProfile, StudentProfile, StudentStanding, TeacherStanding, TrackComparison,
};
use dtai_core::intent::{Qualifier, Scope};
use dtai_core::ports::{
    AnalyticsService, ChatService, DirectoryService, HelpDeskService, PortError, PortResult,
};

const SECRET: &str = "gate-test-secret";

//=========================================================================================
// Stub ports
//=========================================================================================

#[derive(Default)]
struct StubDirectory {
    credentials: Mutex<HashMap<String, PrincipalCredentials>>,
    sessions: Mutex<HashMap<String, AuthSession>>,
    staff_profiles: Mutex<HashMap<Uuid, StaffProfile>>,
}

#[async_trait]
impl DirectoryService for StubDirectory {
    async fn find_credentials(&self, email: &str) -> PortResult<Option<PrincipalCredentials>> {
        Ok(self.credentials.lock().unwrap().get(email).cloned())
    }

    async fn email_taken(&self, email: &str) -> PortResult<bool> {
        Ok(self.credentials.lock().unwrap().contains_key(email))
    }

    async fn register_principal(&self, _new: &NewPrincipal) -> PortResult<(Uuid, Uuid)> {
        Err(PortError::Unexpected("not scripted".to_string()))
    }

    async fn role_profile(&self, _principal_id: Uuid) -> PortResult<Option<RoleProfile>> {
        Ok(None)
    }

    async fn staff_profile(&self, principal_id: Uuid) -> PortResult<Option<StaffProfile>> {
        Ok(self
            .staff_profiles
            .lock()
            .unwrap()
            .get(&principal_id)
            .cloned())
    }

    async fn active_student_profile(
        &self,
        _principal_id: Uuid,
    ) -> PortResult<Option<StudentProfile>> {
        Ok(None)
    }

    async fn list_programs(&self) -> PortResult<Vec<Program>> {
        Ok(Vec::new())
    }

    async fn create_session(
        &self,
        token: &str,
        principal_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.sessions.lock().unwrap().insert(
            token.to_string(),
            AuthSession {
                token: token.to_string(),
                principal_id,
                issued_at: Utc::now(),
                expires_at,
                active: true,
            },
        );
        Ok(())
    }

    async fn find_session(&self, token: &str) -> PortResult<Option<AuthSession>> {
        Ok(self.sessions.lock().unwrap().get(token).cloned())
    }

    async fn revoke_session(&self, token: &str) -> PortResult<()> {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(token) {
            session.active = false;
        }
        Ok(())
    }
}

/// Records the exchanges appended by the chat handler.
#[derive(Default)]
struct StubChat {
    threads: Mutex<HashMap<Uuid, ChatThread>>,
    exchanges: Mutex<Vec<(Uuid, String, String)>>,
}

#[async_trait]
impl ChatService for StubChat {
    async fn create_thread(&self, staff_id: Uuid, title: &str) -> PortResult<Uuid> {
        let id = Uuid::new_v4();
        self.threads.lock().unwrap().insert(
            id,
            ChatThread {
                id,
                staff_id,
                title: title.to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn recent_threads(&self, _staff_id: Uuid, _limit: i64) -> PortResult<Vec<ChatThread>> {
        Ok(Vec::new())
    }

    async fn find_thread(
        &self,
        thread_id: Uuid,
        staff_id: Uuid,
    ) -> PortResult<Option<ChatThread>> {
        Ok(self
            .threads
            .lock()
            .unwrap()
            .get(&thread_id)
            .filter(|t| t.staff_id == staff_id)
            .cloned())
    }

    async fn thread_messages(&self, _thread_id: Uuid) -> PortResult<Vec<ChatMessage>> {
        Ok(Vec::new())
    }

    async fn append_exchange(
        &self,
        thread_id: Uuid,
        question: &str,
        answer: &str,
    ) -> PortResult<()> {
        self.exchanges.lock().unwrap().push((
            thread_id,
            question.to_string(),
            answer.to_string(),
        ));
        Ok(())
    }
}

struct StubHelpDesk;

#[async_trait]
impl HelpDeskService for StubHelpDesk {
    async fn list_requests(&self, _filter: &HelpRequestFilter) -> PortResult<Vec<HelpRequest>> {
        Ok(Vec::new())
    }

    async fn request_detail(
        &self,
        _request_id: Uuid,
    ) -> PortResult<Option<(HelpRequest, Vec<HelpChatMessage>)>> {
        Ok(None)
    }

    async fn reply_to_request(
        &self,
        _request_id: Uuid,
        _staff_id: Uuid,
        _staff_principal_id: Uuid,
        _reply: &str,
        _status: HelpStatus,
    ) -> PortResult<()> {
        Ok(())
    }

    async fn set_status(&self, _request_id: Uuid, _status: HelpStatus) -> PortResult<()> {
        Ok(())
    }

    async fn stats(&self) -> PortResult<HelpDeskStats> {
        Ok(HelpDeskStats {
            total: 0,
            open: 0,
            resolved: 0,
        })
    }

    async fn requests_for_student(&self, _student_id: Uuid) -> PortResult<Vec<HelpRequest>> {
        Ok(Vec::new())
    }

    async fn create_request(
        &self,
        _student_id: Uuid,
        _subject_line: &str,
        _detail: &str,
    ) -> PortResult<Uuid> {
        Ok(Uuid::new_v4())
    }

    async fn request_chat_for_student(
        &self,
        _request_id: Uuid,
        _student_id: Uuid,
    ) -> PortResult<Vec<HelpChatMessage>> {
        Ok(Vec::new())
    }

    async fn append_student_message(
        &self,
        _request_id: Uuid,
        _student_id: Uuid,
        _principal_id: Uuid,
        _body: &str,
    ) -> PortResult<Uuid> {
        Ok(Uuid::new_v4())
    }
}

struct StubAnalytics;

#[async_trait]
impl AnalyticsService for StubAnalytics {
    async fn teacher_rankings(
        &self,
        _scope: Option<&Scope>,
        _qualifier: Option<Qualifier>,
    ) -> PortResult<Vec<TeacherStanding>> {
        Ok(Vec::new())
    }

    async fn student_rankings(
        &self,
        _scope: Option<&Scope>,
        _qualifier: Option<Qualifier>,
    ) -> PortResult<Vec<StudentStanding>> {
        Ok(Vec::new())
    }

    async fn group_rankings(
        &self,
        _scope: Option<&Scope>,
        _qualifier: Option<Qualifier>,
    ) -> PortResult<Vec<GroupStanding>> {
        Ok(Vec::new())
    }

    async fn program_overview(&self) -> PortResult<Vec<ProgramSummary>> {
        Ok(Vec::new())
    }

    async fn staff_directory(&self) -> PortResult<Vec<StaffMember>> {
        Ok(Vec::new())
    }

    async fn track_comparison(&self) -> PortResult<Vec<TrackComparison>> {
        Ok(Vec::new())
    }

    async fn global_stats(&self) -> PortResult<GlobalStats> {
        Ok(GlobalStats {
            student_total: 0,
            students_active: 0,
            students_graduated: 0,
            student_avg: None,
            teacher_total: 0,
            teacher_tutors: 0,
            program_total: 0,
        })
    }

    async fn search_students(&self, _term: &str, _limit: i64) -> PortResult<Vec<SearchHit>> {
        Ok(Vec::new())
    }
}

//=========================================================================================
// Fixtures
//=========================================================================================

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        jwt_secret: SECRET.to_string(),
        log_level: tracing::Level::INFO,
        db_max_connections: 5,
        db_acquire_timeout: StdDuration::from_secs(1),
    }
}

fn app_state(directory: Arc<StubDirectory>, chat_port: Arc<StubChat>) -> Arc<AppState> {
    Arc::new(AppState {
        directory,
        chat: chat_port,
        help_desk: Arc::new(StubHelpDesk),
        assistant: Assistant::new(Arc::new(StubAnalytics)),
        tokens: TokenCodec::new(SECRET.to_string()),
        config: Arc::new(test_config()),
    })
}

fn staff_profile(principal_id: Uuid) -> StaffProfile {
    StaffProfile {
        id: Uuid::new_v4(),
        principal_id,
        employee_number: "EMP-01".to_string(),
        position: "Coordinador académico".to_string(),
        access_level: AccessLevel::Coordinator,
        program_id: None,
        appointed_on: NaiveDate::from_ymd_opt(2021, 2, 1).unwrap(),
        phone: None,
        extension: None,
    }
}

fn principal(email: &str) -> Principal {
    Principal {
        id: Uuid::new_v4(),
        first_name: "Laura".to_string(),
        last_name: "Pérez".to_string(),
        email: email.to_string(),
        role: Role::Staff,
        avatar_url: None,
        active: true,
    }
}

/// Argon2 hash of `password`, as the registration handler would store it.
fn hash_password(password: &str) -> String {
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    use argon2::Argon2;
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

/// A token signed with the test secret whose expiry is `exp_offset` seconds
/// from now, bypassing the codec's fixed 24h TTL.
fn token_with_expiry(principal_id: Uuid, exp_offset: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: principal_id.to_string(),
        role: "staff".to_string(),
        email: "dir@uteq.edu.mx".to_string(),
        iat: now,
        exp: now + exp_offset,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn whoami(Extension(auth): Extension<AuthContext>) -> Json<String> {
    Json(auth.principal_id.to_string())
}

fn gated_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/protected", get(whoami))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

async fn get_with_token(router: Router, token: Option<&str>) -> StatusCode {
    let mut builder = Request::builder().uri("/protected");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = router
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    response.status()
}

//=========================================================================================
// Auth gate
//=========================================================================================

#[tokio::test]
async fn missing_token_is_unauthenticated() {
    let state = app_state(Arc::new(StubDirectory::default()), Arc::new(StubChat::default()));
    assert_eq!(
        get_with_token(gated_router(state), None).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let state = app_state(Arc::new(StubDirectory::default()), Arc::new(StubChat::default()));
    assert_eq!(
        get_with_token(gated_router(state), Some("not.a.jwt")).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn valid_token_without_session_row_is_rejected() {
    let directory = Arc::new(StubDirectory::default());
    let state = app_state(directory, Arc::new(StubChat::default()));

    let token = state
        .tokens
        .issue(Uuid::new_v4(), Role::Staff, "dir@uteq.edu.mx")
        .unwrap();

    assert_eq!(
        get_with_token(gated_router(state), Some(&token)).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn expired_token_loses_even_with_live_session_row() {
    // The session row says active and unexpired, but the embedded expiry has
    // passed: the stricter check wins.
    let directory = Arc::new(StubDirectory::default());
    let principal_id = Uuid::new_v4();
    let token = token_with_expiry(principal_id, -3600);
    directory.sessions.lock().unwrap().insert(
        token.clone(),
        AuthSession {
            token: token.clone(),
            principal_id,
            issued_at: Utc::now() - Duration::hours(2),
            expires_at: Utc::now() + Duration::hours(22),
            active: true,
        },
    );

    let state = app_state(directory, Arc::new(StubChat::default()));
    assert_eq!(
        get_with_token(gated_router(state), Some(&token)).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn revoked_session_loses_even_with_valid_signature() {
    let directory = Arc::new(StubDirectory::default());
    let state = app_state(directory.clone(), Arc::new(StubChat::default()));

    let principal_id = Uuid::new_v4();
    let token = state
        .tokens
        .issue(principal_id, Role::Staff, "dir@uteq.edu.mx")
        .unwrap();
    directory
        .create_session(&token, principal_id, Utc::now() + Duration::hours(24))
        .await
        .unwrap();
    directory.revoke_session(&token).await.unwrap();

    assert_eq!(
        get_with_token(gated_router(state), Some(&token)).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn live_session_and_valid_token_pass_the_gate() {
    let directory = Arc::new(StubDirectory::default());
    let state = app_state(directory.clone(), Arc::new(StubChat::default()));

    let principal_id = Uuid::new_v4();
    let token = state
        .tokens
        .issue(principal_id, Role::Staff, "dir@uteq.edu.mx")
        .unwrap();
    directory
        .create_session(&token, principal_id, Utc::now() + Duration::hours(24))
        .await
        .unwrap();

    assert_eq!(
        get_with_token(gated_router(state), Some(&token)).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn staff_gate_rejects_principals_without_staff_profile() {
    let directory = Arc::new(StubDirectory::default());
    let state = app_state(directory.clone(), Arc::new(StubChat::default()));

    let principal_id = Uuid::new_v4();
    let token = state
        .tokens
        .issue(principal_id, Role::Teacher, "prof@uteq.edu.mx")
        .unwrap();
    directory
        .create_session(&token, principal_id, Utc::now() + Duration::hours(24))
        .await
        .unwrap();

    async fn staff_only(Extension(staff): Extension<StaffContext>) -> Json<String> {
        Json(staff.staff_id.to_string())
    }
    let router = Router::new()
        .route("/protected", get(staff_only))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_staff))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    assert_eq!(
        get_with_token(router, Some(&token)).await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn staff_gate_passes_staff_principals_through() {
    let directory = Arc::new(StubDirectory::default());
    let state = app_state(directory.clone(), Arc::new(StubChat::default()));

    let principal_id = Uuid::new_v4();
    let token = state
        .tokens
        .issue(principal_id, Role::Staff, "dir@uteq.edu.mx")
        .unwrap();
    directory
        .create_session(&token, principal_id, Utc::now() + Duration::hours(24))
        .await
        .unwrap();
    directory
        .staff_profiles
        .lock()
        .unwrap()
        .insert(principal_id, staff_profile(principal_id));

    async fn staff_only(Extension(staff): Extension<StaffContext>) -> Json<String> {
        Json(staff.staff_id.to_string())
    }
    let router = Router::new()
        .route("/protected", get(staff_only))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_staff))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    assert_eq!(get_with_token(router, Some(&token)).await, StatusCode::OK);
}

//=========================================================================================
// Login
//=========================================================================================

#[tokio::test]
async fn login_creates_a_session_valid_for_24_hours() {
    let directory = Arc::new(StubDirectory::default());
    let who = principal("laura@uteq.edu.mx");
    directory.credentials.lock().unwrap().insert(
        who.email.clone(),
        PrincipalCredentials {
            principal: who,
            password_hash: hash_password("hunter2hunter2"),
        },
    );
    let state = app_state(directory.clone(), Arc::new(StubChat::default()));

    let before = Utc::now();
    let result = auth::login_handler(
        axum::extract::State(state),
        Json(api_lib::web::protocol::LoginRequest {
            email: "laura@uteq.edu.mx".to_string(),
            password: "hunter2hunter2".to_string(),
        }),
    )
    .await;
    assert!(result.is_ok());

    let sessions = directory.sessions.lock().unwrap();
    assert_eq!(sessions.len(), 1);
    let session = sessions.values().next().unwrap();
    assert!(session.active);
    let expected = before + Duration::hours(24);
    let drift = (session.expires_at - expected).num_seconds().abs();
    assert!(drift <= 1, "expiry drifted by {drift}s");
}

#[tokio::test]
async fn login_with_wrong_password_creates_no_session() {
    let directory = Arc::new(StubDirectory::default());
    let who = principal("laura@uteq.edu.mx");
    directory.credentials.lock().unwrap().insert(
        who.email.clone(),
        PrincipalCredentials {
            principal: who,
            password_hash: hash_password("hunter2hunter2"),
        },
    );
    let state = app_state(directory.clone(), Arc::new(StubChat::default()));

    let result = auth::login_handler(
        axum::extract::State(state),
        Json(api_lib::web::protocol::LoginRequest {
            email: "laura@uteq.edu.mx".to_string(),
            password: "wrong".to_string(),
        }),
    )
    .await;
    assert!(result.is_err());
    assert!(directory.sessions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn login_for_deactivated_principal_creates_no_session() {
    // A deactivated principal never comes back from the credentials lookup,
    // which is the port's contract for soft-deleted accounts.
    let directory = Arc::new(StubDirectory::default());
    let state = app_state(directory.clone(), Arc::new(StubChat::default()));

    let result = auth::login_handler(
        axum::extract::State(state),
        Json(api_lib::web::protocol::LoginRequest {
            email: "gone@uteq.edu.mx".to_string(),
            password: "hunter2hunter2".to_string(),
        }),
    )
    .await;
    assert!(result.is_err());
    assert!(directory.sessions.lock().unwrap().is_empty());
}

//=========================================================================================
// Chat turn
//=========================================================================================

#[tokio::test]
async fn chat_turn_appends_exactly_one_question_answer_pair() {
    let directory = Arc::new(StubDirectory::default());
    let chat_port = Arc::new(StubChat::default());
    let state = app_state(directory, chat_port.clone());

    let staff_id = Uuid::new_v4();
    let thread_id = chat_port
        .create_thread(staff_id, "Nueva conversación")
        .await
        .unwrap();

    let result = chat::post_message_handler(
        axum::extract::State(state),
        Extension(StaffContext {
            staff_id,
            principal_id: Uuid::new_v4(),
        }),
        Json(api_lib::web::protocol::PostMessageRequest {
            thread_id,
            message: "hola".to_string(),
        }),
    )
    .await;
    assert!(result.is_ok());

    let exchanges = chat_port.exchanges.lock().unwrap();
    assert_eq!(exchanges.len(), 1);
    let (recorded_thread, question, answer) = &exchanges[0];
    assert_eq!(*recorded_thread, thread_id);
    assert_eq!(question, "hola");
    assert!(answer.contains("Ejemplos de lo que puedo hacer"));
}

#[tokio::test]
async fn chat_turn_on_foreign_thread_is_not_found() {
    let directory = Arc::new(StubDirectory::default());
    let chat_port = Arc::new(StubChat::default());
    let state = app_state(directory, chat_port.clone());

    let owner = Uuid::new_v4();
    let thread_id = chat_port
        .create_thread(owner, "Nueva conversación")
        .await
        .unwrap();

    let result = chat::post_message_handler(
        axum::extract::State(state),
        Extension(StaffContext {
            staff_id: Uuid::new_v4(), // not the owner
            principal_id: Uuid::new_v4(),
        }),
        Json(api_lib::web::protocol::PostMessageRequest {
            thread_id,
            message: "hola".to_string(),
        }),
    )
    .await;
    assert!(result.is_err());
    assert!(chat_port.exchanges.lock().unwrap().is_empty());
}
