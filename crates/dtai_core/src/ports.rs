//! crates/dtai_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AuthSession, ChatMessage, ChatThread, GlobalStats, GroupStanding, HelpChatMessage,
    HelpDeskStats, HelpRequest, HelpRequestFilter, HelpStatus, NewPrincipal,
    PrincipalCredentials, Program, ProgramSummary, RoleProfile, SearchHit, StaffMember,
    StaffProfile, StudentProfile, StudentStanding, TeacherStanding, TrackComparison,
};
use crate::intent::{Qualifier, Scope};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Identity, credentials, role profiles and the server-side session store.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    // --- Principals ---

    /// Looks up an *active* principal by email, including its password hash.
    /// Returns `Ok(None)` for unknown or deactivated accounts.
    async fn find_credentials(&self, email: &str) -> PortResult<Option<PrincipalCredentials>>;

    async fn email_taken(&self, email: &str) -> PortResult<bool>;

    /// Creates the principal row and its role profile inside one transaction.
    /// Returns (principal_id, profile_id).
    async fn register_principal(&self, new: &NewPrincipal) -> PortResult<(Uuid, Uuid)>;

    /// Resolves the role profile attached to a principal, if any.
    async fn role_profile(&self, principal_id: Uuid) -> PortResult<Option<RoleProfile>>;

    /// Staff profile lookup used by the staff-only gate.
    async fn staff_profile(&self, principal_id: Uuid) -> PortResult<Option<StaffProfile>>;

    /// Student profile lookup used by the student-only gate. Only returns a
    /// profile whose standing is `active` and whose principal is active.
    async fn active_student_profile(&self, principal_id: Uuid)
        -> PortResult<Option<StudentProfile>>;

    async fn list_programs(&self) -> PortResult<Vec<Program>>;

    // --- Session store ---

    async fn create_session(
        &self,
        token: &str,
        principal_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Fetches the session row for a token regardless of liveness.
    /// The gate decides; a session is live iff `active AND expires_at > now`.
    async fn find_session(&self, token: &str) -> PortResult<Option<AuthSession>>;

    /// Marks the session row for this token inactive. Idempotent.
    async fn revoke_session(&self, token: &str) -> PortResult<()>;
}

/// Assistant conversation threads and their messages.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn create_thread(&self, staff_id: Uuid, title: &str) -> PortResult<Uuid>;

    /// The caller's most recent threads, `updated_at` descending.
    async fn recent_threads(&self, staff_id: Uuid, limit: i64) -> PortResult<Vec<ChatThread>>;

    /// Returns the thread only when it belongs to `staff_id`.
    async fn find_thread(&self, thread_id: Uuid, staff_id: Uuid) -> PortResult<Option<ChatThread>>;

    async fn thread_messages(&self, thread_id: Uuid) -> PortResult<Vec<ChatMessage>>;

    /// Appends the question and the answer in one transaction and bumps the
    /// thread's `updated_at`. While the thread still holds at most two
    /// messages, the title is derived from the question (truncated to 30 chars).
    async fn append_exchange(
        &self,
        thread_id: Uuid,
        question: &str,
        answer: &str,
    ) -> PortResult<()>;
}

/// Staff help desk over student help requests.
#[async_trait]
pub trait HelpDeskService: Send + Sync {
    async fn list_requests(&self, filter: &HelpRequestFilter) -> PortResult<Vec<HelpRequest>>;

    async fn request_detail(
        &self,
        request_id: Uuid,
    ) -> PortResult<Option<(HelpRequest, Vec<HelpChatMessage>)>>;

    /// Stores the staff reply and appends it to the request's chat log in one
    /// transaction. `NotFound` when the request does not exist.
    async fn reply_to_request(
        &self,
        request_id: Uuid,
        staff_id: Uuid,
        staff_principal_id: Uuid,
        reply: &str,
        status: HelpStatus,
    ) -> PortResult<()>;

    async fn set_status(&self, request_id: Uuid, status: HelpStatus) -> PortResult<()>;

    async fn stats(&self) -> PortResult<HelpDeskStats>;

    // --- Student-facing side of the help desk ---

    /// The requests raised by one student, most recent first.
    async fn requests_for_student(&self, student_id: Uuid) -> PortResult<Vec<HelpRequest>>;

    async fn create_request(
        &self,
        student_id: Uuid,
        subject_line: &str,
        detail: &str,
    ) -> PortResult<Uuid>;

    /// Chat log of a request, only when it belongs to the student;
    /// `Forbidden` otherwise.
    async fn request_chat_for_student(
        &self,
        request_id: Uuid,
        student_id: Uuid,
    ) -> PortResult<Vec<HelpChatMessage>>;

    /// Appends a student message to the request's chat log; `Forbidden` when
    /// the request belongs to another student.
    async fn append_student_message(
        &self,
        request_id: Uuid,
        student_id: Uuid,
        principal_id: Uuid,
        body: &str,
    ) -> PortResult<Uuid>;
}

/// Read-only aggregate queries behind the assistant dispatcher. Every method
/// is a single bounded query; ordering follows the qualifier and row counts
/// are capped by the implementation.
#[async_trait]
pub trait AnalyticsService: Send + Sync {
    async fn teacher_rankings(
        &self,
        scope: Option<&Scope>,
        qualifier: Option<Qualifier>,
    ) -> PortResult<Vec<TeacherStanding>>;

    async fn student_rankings(
        &self,
        scope: Option<&Scope>,
        qualifier: Option<Qualifier>,
    ) -> PortResult<Vec<StudentStanding>>;

    async fn group_rankings(
        &self,
        scope: Option<&Scope>,
        qualifier: Option<Qualifier>,
    ) -> PortResult<Vec<GroupStanding>>;

    async fn program_overview(&self) -> PortResult<Vec<ProgramSummary>>;

    async fn staff_directory(&self) -> PortResult<Vec<StaffMember>>;

    /// The TSU vs Engineering aggregate comparison, best track first.
    async fn track_comparison(&self) -> PortResult<Vec<TrackComparison>>;

    async fn global_stats(&self) -> PortResult<GlobalStats>;

    /// Substring search over student names and enrollment numbers.
    async fn search_students(&self, term: &str, limit: i64) -> PortResult<Vec<SearchHit>>;
}
