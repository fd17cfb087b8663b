//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the service ports from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use dtai_core::domain::{
    AccessLevel, AuthSession, ChatMessage, ChatThread, GlobalStats, GroupStanding,
    HelpChatMessage, HelpDeskStats, HelpRequest, HelpRequestFilter, HelpStatus, MessageKind,
    NewPrincipal, NewRoleProfile, Principal, PrincipalCredentials, Program, ProgramSummary, Role,
    RoleProfile, SearchHit, StaffMember, StaffProfile, Standing, StudentProfile, StudentStanding,
    TeacherProfile, TeacherStanding, TrackComparison,
};
use dtai_core::intent::{Qualifier, Scope};
use dtai_core::ports::{
    AnalyticsService, ChatService, DirectoryService, HelpDeskService, PortError, PortResult,
};

/// Chat thread titles derived from the first message are capped at this many
/// characters before the ellipsis.
const THREAD_TITLE_MAX: usize = 30;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements all service ports over one pool.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self) -> PortResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn assert_request_owner(&self, request_id: Uuid, student_id: Uuid) -> PortResult<()> {
        let owns: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM help_requests WHERE id = $1 AND student_id = $2)",
        )
        .bind(request_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if !owns {
            return Err(PortError::Forbidden(
                "No tienes acceso a esta solicitud".to_string(),
            ));
        }
        Ok(())
    }
}

/// Maps write failures onto the port taxonomy: unique and foreign-key
/// violations are caller errors, everything else is unexpected. The unique
/// constraints are the authoritative guard behind the read-check-then-write
/// uniqueness checks in the handlers.
fn map_write_error(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return PortError::Validation("Número de empleado o matrícula ya existe".to_string());
        }
        if db.is_foreign_key_violation() {
            return PortError::Validation(
                "Carrera no válida. Verifica que la carrera exista".to_string(),
            );
        }
    }
    PortError::Unexpected(e.to_string())
}

fn parse_role(raw: &str) -> PortResult<Role> {
    Role::parse(raw).ok_or_else(|| PortError::Unexpected(format!("unknown role '{raw}'")))
}

fn parse_access_level(raw: &str) -> PortResult<AccessLevel> {
    AccessLevel::parse(raw)
        .ok_or_else(|| PortError::Unexpected(format!("unknown access level '{raw}'")))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    role: String,
    avatar_url: Option<String>,
    active: bool,
    password_hash: String,
}

impl CredentialsRecord {
    fn to_domain(self) -> PortResult<PrincipalCredentials> {
        Ok(PrincipalCredentials {
            principal: Principal {
                id: self.id,
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                role: parse_role(&self.role)?,
                avatar_url: self.avatar_url,
                active: self.active,
            },
            password_hash: self.password_hash,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    token: String,
    principal_id: Uuid,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    active: bool,
}

impl SessionRecord {
    fn to_domain(self) -> AuthSession {
        AuthSession {
            token: self.token,
            principal_id: self.principal_id,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            active: self.active,
        }
    }
}

#[derive(FromRow)]
struct StudentProfileRecord {
    id: Uuid,
    principal_id: Uuid,
    enrollment_number: String,
    program_id: Uuid,
    current_term: i32,
    enrolled_on: NaiveDate,
    phone: Option<String>,
    standing: String,
    gpa: Option<f64>,
}

impl StudentProfileRecord {
    fn to_domain(self) -> PortResult<StudentProfile> {
        let standing = Standing::parse(&self.standing)
            .ok_or_else(|| PortError::Unexpected(format!("unknown standing '{}'", self.standing)))?;
        Ok(StudentProfile {
            id: self.id,
            principal_id: self.principal_id,
            enrollment_number: self.enrollment_number,
            program_id: self.program_id,
            current_term: self.current_term,
            enrolled_on: self.enrolled_on,
            phone: self.phone,
            standing,
            gpa: self.gpa,
        })
    }
}

#[derive(FromRow)]
struct TeacherProfileRecord {
    id: Uuid,
    principal_id: Uuid,
    employee_number: String,
    program_id: Uuid,
    hired_on: NaiveDate,
    academic_title: Option<String>,
    specialty: Option<String>,
    years_experience: i32,
    is_group_tutor: bool,
    phone: Option<String>,
    extension: Option<String>,
}

impl TeacherProfileRecord {
    fn to_domain(self) -> TeacherProfile {
        TeacherProfile {
            id: self.id,
            principal_id: self.principal_id,
            employee_number: self.employee_number,
            program_id: self.program_id,
            hired_on: self.hired_on,
            academic_title: self.academic_title,
            specialty: self.specialty,
            years_experience: self.years_experience,
            is_group_tutor: self.is_group_tutor,
            phone: self.phone,
            extension: self.extension,
        }
    }
}

#[derive(FromRow)]
struct StaffProfileRecord {
    id: Uuid,
    principal_id: Uuid,
    employee_number: String,
    position: String,
    access_level: String,
    program_id: Option<Uuid>,
    appointed_on: NaiveDate,
    phone: Option<String>,
    extension: Option<String>,
}

impl StaffProfileRecord {
    fn to_domain(self) -> PortResult<StaffProfile> {
        Ok(StaffProfile {
            id: self.id,
            principal_id: self.principal_id,
            employee_number: self.employee_number,
            position: self.position,
            access_level: parse_access_level(&self.access_level)?,
            program_id: self.program_id,
            appointed_on: self.appointed_on,
            phone: self.phone,
            extension: self.extension,
        })
    }
}

#[derive(FromRow)]
struct ProgramRecord {
    id: Uuid,
    name: String,
    code: String,
    duration_terms: i32,
}

impl ProgramRecord {
    fn to_domain(self) -> Program {
        Program {
            id: self.id,
            name: self.name,
            code: self.code,
            duration_terms: self.duration_terms,
        }
    }
}

#[derive(FromRow)]
struct ChatThreadRecord {
    id: Uuid,
    staff_id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatThreadRecord {
    fn to_domain(self) -> ChatThread {
        ChatThread {
            id: self.id,
            staff_id: self.staff_id,
            title: self.title,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ChatMessageRecord {
    id: Uuid,
    thread_id: Uuid,
    kind: String,
    content: String,
    sent_at: DateTime<Utc>,
}

impl ChatMessageRecord {
    fn to_domain(self) -> PortResult<ChatMessage> {
        let kind = match self.kind.as_str() {
            "question" => MessageKind::Question,
            "answer" => MessageKind::Answer,
            other => {
                return Err(PortError::Unexpected(format!("unknown message kind '{other}'")))
            }
        };
        Ok(ChatMessage {
            id: self.id,
            thread_id: self.thread_id,
            kind,
            content: self.content,
            sent_at: self.sent_at,
        })
    }
}

#[derive(FromRow)]
struct HelpRequestRecord {
    id: Uuid,
    student_name: String,
    student_email: String,
    enrollment_number: String,
    current_term: i32,
    group_code: Option<String>,
    subject_line: String,
    detail: String,
    status: String,
    reply: Option<String>,
    assigned_staff_name: Option<String>,
    requested_at: DateTime<Utc>,
    replied_at: Option<DateTime<Utc>>,
}

impl HelpRequestRecord {
    fn to_domain(self) -> PortResult<HelpRequest> {
        let status = HelpStatus::parse(&self.status)
            .ok_or_else(|| PortError::Unexpected(format!("unknown status '{}'", self.status)))?;
        Ok(HelpRequest {
            id: self.id,
            student_name: self.student_name,
            student_email: self.student_email,
            enrollment_number: self.enrollment_number,
            current_term: self.current_term,
            group_code: self.group_code,
            subject_line: self.subject_line,
            detail: self.detail,
            status,
            reply: self.reply,
            assigned_staff_name: self.assigned_staff_name,
            requested_at: self.requested_at,
            replied_at: self.replied_at,
        })
    }
}

#[derive(FromRow)]
struct HelpChatMessageRecord {
    id: Uuid,
    request_id: Uuid,
    author_name: String,
    author_role: String,
    body: String,
    sent_at: DateTime<Utc>,
}

impl HelpChatMessageRecord {
    fn to_domain(self) -> HelpChatMessage {
        HelpChatMessage {
            id: self.id,
            request_id: self.request_id,
            author_name: self.author_name,
            author_role: self.author_role,
            body: self.body,
            sent_at: self.sent_at,
        }
    }
}

#[derive(FromRow)]
struct TeacherStandingRecord {
    full_name: String,
    program_name: String,
    subjects_taught: i64,
    students_evaluated: i64,
    avg_grade: Option<f64>,
    pass_rate: Option<f64>,
    years_experience: i32,
    is_group_tutor: bool,
}

impl TeacherStandingRecord {
    fn to_domain(self) -> TeacherStanding {
        TeacherStanding {
            full_name: self.full_name,
            program_name: self.program_name,
            subjects_taught: self.subjects_taught,
            students_evaluated: self.students_evaluated,
            avg_grade: self.avg_grade,
            pass_rate: self.pass_rate,
            years_experience: self.years_experience,
            is_group_tutor: self.is_group_tutor,
        }
    }
}

#[derive(FromRow)]
struct StudentStandingRecord {
    full_name: String,
    enrollment_number: String,
    program_name: String,
    group_code: Option<String>,
    gpa: Option<f64>,
    passed_count: i64,
    failed_count: i64,
}

impl StudentStandingRecord {
    fn to_domain(self) -> StudentStanding {
        StudentStanding {
            full_name: self.full_name,
            enrollment_number: self.enrollment_number,
            program_name: self.program_name,
            group_code: self.group_code,
            gpa: self.gpa,
            passed_count: self.passed_count,
            failed_count: self.failed_count,
        }
    }
}

#[derive(FromRow)]
struct GroupStandingRecord {
    code: String,
    program_name: String,
    term: i32,
    member_count: i64,
    capacity: i32,
    occupancy_pct: Option<f64>,
    group_avg: Option<f64>,
    pass_rate: Option<f64>,
    tutor_name: Option<String>,
}

impl GroupStandingRecord {
    fn to_domain(self) -> GroupStanding {
        GroupStanding {
            code: self.code,
            program_name: self.program_name,
            term: self.term,
            member_count: self.member_count,
            capacity: self.capacity,
            occupancy_pct: self.occupancy_pct,
            group_avg: self.group_avg,
            pass_rate: self.pass_rate,
            tutor_name: self.tutor_name,
        }
    }
}

#[derive(FromRow)]
struct ProgramSummaryRecord {
    name: String,
    code: String,
    duration_terms: i32,
    student_count: i64,
    teacher_count: i64,
    subject_count: i64,
    program_avg: Option<f64>,
    pass_rate: Option<f64>,
}

impl ProgramSummaryRecord {
    fn to_domain(self) -> ProgramSummary {
        ProgramSummary {
            name: self.name,
            code: self.code,
            duration_terms: self.duration_terms,
            student_count: self.student_count,
            teacher_count: self.teacher_count,
            subject_count: self.subject_count,
            program_avg: self.program_avg,
            pass_rate: self.pass_rate,
        }
    }
}

#[derive(FromRow)]
struct StaffMemberRecord {
    full_name: String,
    position: String,
    access_level: String,
    program_name: Option<String>,
    appointed_on: NaiveDate,
}

impl StaffMemberRecord {
    fn to_domain(self) -> PortResult<StaffMember> {
        Ok(StaffMember {
            full_name: self.full_name,
            position: self.position,
            access_level: parse_access_level(&self.access_level)?,
            program_name: self.program_name,
            appointed_on: self.appointed_on,
        })
    }
}

#[derive(FromRow)]
struct TrackComparisonRecord {
    track_name: String,
    program_count: i64,
    student_count: i64,
    teacher_count: i64,
    track_avg: Option<f64>,
    pass_rate: Option<f64>,
}

impl TrackComparisonRecord {
    fn to_domain(self) -> TrackComparison {
        TrackComparison {
            track_name: self.track_name,
            program_count: self.program_count,
            student_count: self.student_count,
            teacher_count: self.teacher_count,
            track_avg: self.track_avg,
            pass_rate: self.pass_rate,
        }
    }
}

#[derive(FromRow)]
struct SearchHitRecord {
    full_name: String,
    enrollment_number: String,
    program_name: String,
    gpa: Option<f64>,
}

impl SearchHitRecord {
    fn to_domain(self) -> SearchHit {
        SearchHit {
            full_name: self.full_name,
            enrollment_number: self.enrollment_number,
            program_name: self.program_name,
            gpa: self.gpa,
        }
    }
}

//=========================================================================================
// Scope helpers
//=========================================================================================

/// Splits a classifier scope into the three optional SQL binds used by the
/// ranking queries: track duration, term number and group code.
fn scope_binds(scope: Option<&Scope>) -> (Option<i32>, Option<i32>, Option<String>) {
    match scope {
        Some(Scope::Track(track)) => (Some(track.duration_terms()), None, None),
        Some(Scope::Term(n)) => (None, Some(*n as i32), None),
        Some(Scope::Group(code)) => (None, None, Some(code.clone())),
        None => (None, None, None),
    }
}

//=========================================================================================
// `DirectoryService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DirectoryService for DbAdapter {
    async fn find_credentials(&self, email: &str) -> PortResult<Option<PrincipalCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, first_name, last_name, email, role, avatar_url, active, password_hash
             FROM principals WHERE email = $1 AND active = TRUE",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.map(|r| r.to_domain()).transpose()
    }

    async fn email_taken(&self, email: &str) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM principals WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn register_principal(&self, new: &NewPrincipal) -> PortResult<(Uuid, Uuid)> {
        let mut tx = self.begin().await?;

        let principal_id: Uuid = sqlx::query_scalar(
            "INSERT INTO principals (id, first_name, last_name, email, password_hash, role)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role().as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        let profile_id: Uuid = match &new.profile {
            NewRoleProfile::Student(profile) => sqlx::query_scalar(
                "INSERT INTO students
                     (id, principal_id, enrollment_number, program_id, current_term, enrolled_on, phone)
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
            )
            .bind(Uuid::new_v4())
            .bind(principal_id)
            .bind(&profile.enrollment_number)
            .bind(profile.program_id)
            .bind(profile.current_term)
            .bind(profile.enrolled_on)
            .bind(&profile.phone)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?,
            NewRoleProfile::Teacher(profile) => sqlx::query_scalar(
                "INSERT INTO teachers
                     (id, principal_id, employee_number, program_id, hired_on,
                      academic_title, specialty, phone, extension)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
            )
            .bind(Uuid::new_v4())
            .bind(principal_id)
            .bind(&profile.employee_number)
            .bind(profile.program_id)
            .bind(profile.hired_on)
            .bind(&profile.academic_title)
            .bind(&profile.specialty)
            .bind(&profile.phone)
            .bind(&profile.extension)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?,
            NewRoleProfile::Staff(profile) => sqlx::query_scalar(
                "INSERT INTO staff_members
                     (id, principal_id, employee_number, position, access_level,
                      program_id, appointed_on, phone, extension)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
            )
            .bind(Uuid::new_v4())
            .bind(principal_id)
            .bind(&profile.employee_number)
            .bind(&profile.position)
            .bind(profile.access_level.as_str())
            .bind(profile.program_id)
            .bind(profile.appointed_on)
            .bind(&profile.phone)
            .bind(&profile.extension)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?,
        };

        // Dropping the transaction rolls it back; reaching commit is the only
        // path on which both rows become visible.
        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok((principal_id, profile_id))
    }

    async fn role_profile(&self, principal_id: Uuid) -> PortResult<Option<RoleProfile>> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM principals WHERE id = $1")
                .bind(principal_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let Some(role) = role else { return Ok(None) };

        match parse_role(&role)? {
            Role::Student => {
                let record = sqlx::query_as::<_, StudentProfileRecord>(
                    "SELECT id, principal_id, enrollment_number, program_id, current_term,
                            enrolled_on, phone, standing, gpa
                     FROM students WHERE principal_id = $1",
                )
                .bind(principal_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
                Ok(record
                    .map(|r| r.to_domain())
                    .transpose()?
                    .map(RoleProfile::Student))
            }
            Role::Teacher => {
                let record = sqlx::query_as::<_, TeacherProfileRecord>(
                    "SELECT id, principal_id, employee_number, program_id, hired_on,
                            academic_title, specialty, years_experience, is_group_tutor,
                            phone, extension
                     FROM teachers WHERE principal_id = $1",
                )
                .bind(principal_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
                Ok(record.map(|r| RoleProfile::Teacher(r.to_domain())))
            }
            Role::Staff => {
                let profile = self.staff_profile(principal_id).await?;
                Ok(profile.map(RoleProfile::Staff))
            }
        }
    }

    async fn staff_profile(&self, principal_id: Uuid) -> PortResult<Option<StaffProfile>> {
        let record = sqlx::query_as::<_, StaffProfileRecord>(
            "SELECT id, principal_id, employee_number, position, access_level,
                    program_id, appointed_on, phone, extension
             FROM staff_members WHERE principal_id = $1",
        )
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.map(|r| r.to_domain()).transpose()
    }

    async fn active_student_profile(
        &self,
        principal_id: Uuid,
    ) -> PortResult<Option<StudentProfile>> {
        let record = sqlx::query_as::<_, StudentProfileRecord>(
            "SELECT s.id, s.principal_id, s.enrollment_number, s.program_id, s.current_term,
                    s.enrolled_on, s.phone, s.standing, s.gpa
             FROM students s
             INNER JOIN principals p ON s.principal_id = p.id
             WHERE s.principal_id = $1 AND s.standing = 'active' AND p.active = TRUE",
        )
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.map(|r| r.to_domain()).transpose()
    }

    async fn list_programs(&self) -> PortResult<Vec<Program>> {
        let records = sqlx::query_as::<_, ProgramRecord>(
            "SELECT id, name, code, duration_terms FROM programs
             WHERE active = TRUE ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_session(
        &self,
        token: &str,
        principal_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, principal_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(token)
        .bind(principal_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> PortResult<Option<AuthSession>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT token, principal_id, issued_at, expires_at, active
             FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn revoke_session(&self, token: &str) -> PortResult<()> {
        sqlx::query("UPDATE sessions SET active = FALSE WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

//=========================================================================================
// `ChatService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatService for DbAdapter {
    async fn create_thread(&self, staff_id: Uuid, title: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO chat_threads (id, staff_id, title) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(staff_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn recent_threads(&self, staff_id: Uuid, limit: i64) -> PortResult<Vec<ChatThread>> {
        let records = sqlx::query_as::<_, ChatThreadRecord>(
            "SELECT id, staff_id, title, created_at, updated_at
             FROM chat_threads WHERE staff_id = $1
             ORDER BY updated_at DESC LIMIT $2",
        )
        .bind(staff_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_thread(
        &self,
        thread_id: Uuid,
        staff_id: Uuid,
    ) -> PortResult<Option<ChatThread>> {
        let record = sqlx::query_as::<_, ChatThreadRecord>(
            "SELECT id, staff_id, title, created_at, updated_at
             FROM chat_threads WHERE id = $1 AND staff_id = $2",
        )
        .bind(thread_id)
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn thread_messages(&self, thread_id: Uuid) -> PortResult<Vec<ChatMessage>> {
        let records = sqlx::query_as::<_, ChatMessageRecord>(
            "SELECT id, thread_id, kind, content, sent_at
             FROM chat_messages WHERE thread_id = $1 ORDER BY sent_at ASC",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn append_exchange(
        &self,
        thread_id: Uuid,
        question: &str,
        answer: &str,
    ) -> PortResult<()> {
        let mut tx = self.begin().await?;

        for (kind, content) in [("question", question), ("answer", answer)] {
            sqlx::query(
                "INSERT INTO chat_messages (id, thread_id, kind, content) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(thread_id)
            .bind(kind)
            .bind(content)
            .execute(&mut *tx)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }

        let message_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE thread_id = $1")
                .bind(thread_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // The first exchange names the thread after the user's question.
        if message_count <= 2 {
            let title = if question.chars().count() > THREAD_TITLE_MAX {
                let truncated: String = question.chars().take(THREAD_TITLE_MAX).collect();
                format!("{truncated}...")
            } else {
                question.to_string()
            };
            sqlx::query("UPDATE chat_threads SET title = $1 WHERE id = $2")
                .bind(&title)
                .bind(thread_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }

        sqlx::query("UPDATE chat_threads SET updated_at = NOW() WHERE id = $1")
            .bind(thread_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

//=========================================================================================
// `HelpDeskService` Trait Implementation
//=========================================================================================

#[async_trait]
impl HelpDeskService for DbAdapter {
    async fn list_requests(&self, filter: &HelpRequestFilter) -> PortResult<Vec<HelpRequest>> {
        let search = filter
            .search
            .as_ref()
            .map(|s| format!("%{}%", s.to_lowercase()));

        let records = sqlx::query_as::<_, HelpRequestRecord>(
            "SELECT hr.id,
                    p.first_name || ' ' || p.last_name AS student_name,
                    p.email AS student_email,
                    s.enrollment_number,
                    s.current_term,
                    g.code AS group_code,
                    hr.subject_line, hr.detail, hr.status, hr.reply,
                    sp.first_name || ' ' || sp.last_name AS assigned_staff_name,
                    hr.requested_at, hr.replied_at
             FROM help_requests hr
             INNER JOIN students s ON hr.student_id = s.id
             INNER JOIN principals p ON s.principal_id = p.id
             LEFT JOIN group_memberships gm ON gm.student_id = s.id AND gm.active = TRUE
             LEFT JOIN student_groups g ON gm.group_id = g.id
             LEFT JOIN staff_members sm ON hr.assigned_staff_id = sm.id
             LEFT JOIN principals sp ON sm.principal_id = sp.id
             WHERE s.standing = 'active' AND p.active = TRUE
               AND ($1::text IS NULL
                    OR LOWER(p.first_name) LIKE $1
                    OR LOWER(p.last_name) LIKE $1
                    OR s.enrollment_number LIKE $1
                    OR LOWER(p.email) LIKE $1)
               AND ($2::text IS NULL OR g.code = $2)
               AND ($3::int IS NULL OR s.current_term = $3)
               AND ($4::text IS NULL OR hr.status = $4)
             ORDER BY hr.requested_at DESC",
        )
        .bind(search)
        .bind(&filter.group_code)
        .bind(filter.term)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn request_detail(
        &self,
        request_id: Uuid,
    ) -> PortResult<Option<(HelpRequest, Vec<HelpChatMessage>)>> {
        let record = sqlx::query_as::<_, HelpRequestRecord>(
            "SELECT hr.id,
                    p.first_name || ' ' || p.last_name AS student_name,
                    p.email AS student_email,
                    s.enrollment_number,
                    s.current_term,
                    g.code AS group_code,
                    hr.subject_line, hr.detail, hr.status, hr.reply,
                    sp.first_name || ' ' || sp.last_name AS assigned_staff_name,
                    hr.requested_at, hr.replied_at
             FROM help_requests hr
             INNER JOIN students s ON hr.student_id = s.id
             INNER JOIN principals p ON s.principal_id = p.id
             LEFT JOIN group_memberships gm ON gm.student_id = s.id AND gm.active = TRUE
             LEFT JOIN student_groups g ON gm.group_id = g.id
             LEFT JOIN staff_members sm ON hr.assigned_staff_id = sm.id
             LEFT JOIN principals sp ON sm.principal_id = sp.id
             WHERE hr.id = $1",
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let Some(record) = record else { return Ok(None) };
        let request = record.to_domain()?;

        let chat = sqlx::query_as::<_, HelpChatMessageRecord>(
            "SELECT hc.id, hc.request_id,
                    p.first_name || ' ' || p.last_name AS author_name,
                    hc.author_role, hc.body, hc.sent_at
             FROM help_chat_messages hc
             INNER JOIN principals p ON hc.principal_id = p.id
             WHERE hc.request_id = $1
             ORDER BY hc.sent_at ASC",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(Some((
            request,
            chat.into_iter().map(|r| r.to_domain()).collect(),
        )))
    }

    async fn reply_to_request(
        &self,
        request_id: Uuid,
        staff_id: Uuid,
        staff_principal_id: Uuid,
        reply: &str,
        status: HelpStatus,
    ) -> PortResult<()> {
        let mut tx = self.begin().await?;

        let updated = sqlx::query(
            "UPDATE help_requests
             SET reply = $1, status = $2, assigned_staff_id = $3, replied_at = NOW()
             WHERE id = $4",
        )
        .bind(reply)
        .bind(status.as_str())
        .bind(staff_id)
        .bind(request_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(PortError::NotFound("Solicitud no encontrada".to_string()));
        }

        sqlx::query(
            "INSERT INTO help_chat_messages (id, request_id, principal_id, author_role, body)
             VALUES ($1, $2, $3, 'staff', $4)",
        )
        .bind(Uuid::new_v4())
        .bind(request_id)
        .bind(staff_principal_id)
        .bind(reply)
        .execute(&mut *tx)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn set_status(&self, request_id: Uuid, status: HelpStatus) -> PortResult<()> {
        let updated = sqlx::query("UPDATE help_requests SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(request_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(PortError::NotFound("Solicitud no encontrada".to_string()));
        }
        Ok(())
    }

    async fn stats(&self) -> PortResult<HelpDeskStats> {
        let (total, open, resolved): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE status IN ('pending', 'in_progress')),
                    COUNT(*) FILTER (WHERE status = 'resolved')
             FROM help_requests",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(HelpDeskStats {
            total,
            open,
            resolved,
        })
    }

    async fn requests_for_student(&self, student_id: Uuid) -> PortResult<Vec<HelpRequest>> {
        let records = sqlx::query_as::<_, HelpRequestRecord>(
            "SELECT hr.id,
                    p.first_name || ' ' || p.last_name AS student_name,
                    p.email AS student_email,
                    s.enrollment_number,
                    s.current_term,
                    g.code AS group_code,
                    hr.subject_line, hr.detail, hr.status, hr.reply,
                    sp.first_name || ' ' || sp.last_name AS assigned_staff_name,
                    hr.requested_at, hr.replied_at
             FROM help_requests hr
             INNER JOIN students s ON hr.student_id = s.id
             INNER JOIN principals p ON s.principal_id = p.id
             LEFT JOIN group_memberships gm ON gm.student_id = s.id AND gm.active = TRUE
             LEFT JOIN student_groups g ON gm.group_id = g.id
             LEFT JOIN staff_members sm ON hr.assigned_staff_id = sm.id
             LEFT JOIN principals sp ON sm.principal_id = sp.id
             WHERE hr.student_id = $1
             ORDER BY hr.requested_at DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn create_request(
        &self,
        student_id: Uuid,
        subject_line: &str,
        detail: &str,
    ) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO help_requests (id, student_id, subject_line, detail)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(subject_line)
        .bind(detail)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn request_chat_for_student(
        &self,
        request_id: Uuid,
        student_id: Uuid,
    ) -> PortResult<Vec<HelpChatMessage>> {
        self.assert_request_owner(request_id, student_id).await?;

        let records = sqlx::query_as::<_, HelpChatMessageRecord>(
            "SELECT hc.id, hc.request_id,
                    p.first_name || ' ' || p.last_name AS author_name,
                    hc.author_role, hc.body, hc.sent_at
             FROM help_chat_messages hc
             INNER JOIN principals p ON hc.principal_id = p.id
             WHERE hc.request_id = $1
             ORDER BY hc.sent_at ASC",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn append_student_message(
        &self,
        request_id: Uuid,
        student_id: Uuid,
        principal_id: Uuid,
        body: &str,
    ) -> PortResult<Uuid> {
        self.assert_request_owner(request_id, student_id).await?;

        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO help_chat_messages (id, request_id, principal_id, author_role, body)
             VALUES ($1, $2, $3, 'student', $4) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(request_id)
        .bind(principal_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }
}

//=========================================================================================
// `AnalyticsService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalyticsService for DbAdapter {
    async fn teacher_rankings(
        &self,
        scope: Option<&Scope>,
        qualifier: Option<Qualifier>,
    ) -> PortResult<Vec<TeacherStanding>> {
        // Teachers only filter by track; term and group scopes do not apply.
        let (duration, _, _) = scope_binds(scope);

        let order_by = match qualifier {
            Some(Qualifier::Best) => {
                "pass_rate DESC NULLS LAST, avg_grade DESC NULLS LAST, t.years_experience DESC"
            }
            Some(Qualifier::Worst) => "pass_rate ASC NULLS LAST, avg_grade ASC NULLS LAST",
            _ => "t.years_experience DESC, pass_rate DESC NULLS LAST",
        };

        let sql = format!(
            "SELECT p.first_name || ' ' || p.last_name AS full_name,
                    pr.name AS program_name,
                    COUNT(DISTINCT ta.subject_id) AS subjects_taught,
                    COUNT(DISTINCT e.id) AS students_evaluated,
                    AVG(e.final_grade) AS avg_grade,
                    ROUND((COUNT(DISTINCT e.id) FILTER (WHERE e.status = 'passed') * 100.0
                           / NULLIF(COUNT(DISTINCT e.id), 0))::numeric, 2)::float8 AS pass_rate,
                    t.years_experience,
                    t.is_group_tutor
             FROM teachers t
             INNER JOIN principals p ON t.principal_id = p.id
             INNER JOIN programs pr ON t.program_id = pr.id
             LEFT JOIN teaching_assignments ta ON ta.teacher_id = t.id AND ta.active = TRUE
             LEFT JOIN evaluations e ON e.teacher_id = t.id AND e.final_grade IS NOT NULL
             WHERE t.active = TRUE AND p.active = TRUE
               AND ($1::int IS NULL OR pr.duration_terms = $1)
             GROUP BY t.id, p.first_name, p.last_name, pr.name,
                      t.years_experience, t.is_group_tutor
             HAVING COUNT(DISTINCT e.id) > 0
             ORDER BY {order_by}
             LIMIT 10"
        );

        let records = sqlx::query_as::<_, TeacherStandingRecord>(&sql)
            .bind(duration)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn student_rankings(
        &self,
        scope: Option<&Scope>,
        qualifier: Option<Qualifier>,
    ) -> PortResult<Vec<StudentStanding>> {
        let (duration, term, group) = scope_binds(scope);

        let order_by = match qualifier {
            Some(Qualifier::Best) => "s.gpa DESC NULLS LAST, avg_grade DESC NULLS LAST",
            Some(Qualifier::Worst) => "failed_count DESC, s.gpa ASC NULLS LAST",
            _ => "s.gpa DESC NULLS LAST",
        };

        let sql = format!(
            "SELECT p.first_name || ' ' || p.last_name AS full_name,
                    s.enrollment_number,
                    pr.name AS program_name,
                    g.code AS group_code,
                    s.gpa,
                    COUNT(DISTINCT e.id) FILTER (WHERE e.status = 'passed') AS passed_count,
                    COUNT(DISTINCT e.id) FILTER (WHERE e.status = 'failed') AS failed_count,
                    AVG(e.final_grade) AS avg_grade
             FROM students s
             INNER JOIN principals p ON s.principal_id = p.id
             INNER JOIN programs pr ON s.program_id = pr.id
             LEFT JOIN group_memberships gm ON gm.student_id = s.id AND gm.active = TRUE
             LEFT JOIN student_groups g ON gm.group_id = g.id
             LEFT JOIN evaluations e ON e.student_id = s.id AND e.final_grade IS NOT NULL
             WHERE p.active = TRUE AND s.standing = 'active'
               AND ($1::int IS NULL OR pr.duration_terms = $1)
               AND ($2::int IS NULL OR s.current_term = $2)
               AND ($3::text IS NULL OR g.code = $3)
             GROUP BY s.id, p.first_name, p.last_name, s.enrollment_number,
                      pr.name, g.code, s.gpa
             HAVING COUNT(DISTINCT e.id) > 0
             ORDER BY {order_by}
             LIMIT 10"
        );

        let records = sqlx::query_as::<_, StudentStandingRecord>(&sql)
            .bind(duration)
            .bind(term)
            .bind(group)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn group_rankings(
        &self,
        scope: Option<&Scope>,
        qualifier: Option<Qualifier>,
    ) -> PortResult<Vec<GroupStanding>> {
        // Groups filter by track and term; the group-code scope does not apply.
        let (duration, term, _) = scope_binds(scope);

        let order_by = match qualifier {
            Some(Qualifier::Best) => "group_avg DESC NULLS LAST, pass_rate DESC NULLS LAST",
            Some(Qualifier::Worst) => "group_avg ASC NULLS LAST, pass_rate ASC NULLS LAST",
            _ => "group_avg DESC NULLS LAST",
        };

        let sql = format!(
            "SELECT g.code,
                    pr.name AS program_name,
                    g.term,
                    COUNT(DISTINCT gm.student_id) AS member_count,
                    g.capacity,
                    ROUND((COUNT(DISTINCT gm.student_id) * 100.0
                           / NULLIF(g.capacity, 0))::numeric, 2)::float8 AS occupancy_pct,
                    AVG(s.gpa) AS group_avg,
                    ROUND((COUNT(DISTINCT e.id) FILTER (WHERE e.status = 'passed') * 100.0
                           / NULLIF(COUNT(DISTINCT e.id), 0))::numeric, 2)::float8 AS pass_rate,
                    tp.first_name || ' ' || tp.last_name AS tutor_name
             FROM student_groups g
             INNER JOIN programs pr ON g.program_id = pr.id
             LEFT JOIN group_memberships gm ON gm.group_id = g.id AND gm.active = TRUE
             LEFT JOIN students s ON gm.student_id = s.id
             LEFT JOIN evaluations e ON e.student_id = s.id AND e.final_grade IS NOT NULL
             LEFT JOIN teachers tt ON g.tutor_teacher_id = tt.id
             LEFT JOIN principals tp ON tt.principal_id = tp.id
             WHERE g.active = TRUE
               AND ($1::int IS NULL OR pr.duration_terms = $1)
               AND ($2::int IS NULL OR g.term = $2)
             GROUP BY g.id, g.code, pr.name, g.term, g.capacity, tp.first_name, tp.last_name
             HAVING COUNT(DISTINCT gm.student_id) > 0
             ORDER BY {order_by}
             LIMIT 10"
        );

        let records = sqlx::query_as::<_, GroupStandingRecord>(&sql)
            .bind(duration)
            .bind(term)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn program_overview(&self) -> PortResult<Vec<ProgramSummary>> {
        let records = sqlx::query_as::<_, ProgramSummaryRecord>(
            "SELECT pr.name, pr.code, pr.duration_terms,
                    COUNT(DISTINCT s.id) AS student_count,
                    COUNT(DISTINCT t.id) AS teacher_count,
                    COUNT(DISTINCT sub.id) AS subject_count,
                    AVG(s.gpa) AS program_avg,
                    ROUND((COUNT(DISTINCT e.id) FILTER (WHERE e.status = 'passed') * 100.0
                           / NULLIF(COUNT(DISTINCT e.id), 0))::numeric, 2)::float8 AS pass_rate
             FROM programs pr
             LEFT JOIN students s ON s.program_id = pr.id
             LEFT JOIN principals p ON s.principal_id = p.id
             LEFT JOIN teachers t ON t.program_id = pr.id AND t.active = TRUE
             LEFT JOIN subjects sub ON sub.program_id = pr.id AND sub.active = TRUE
             LEFT JOIN evaluations e ON e.student_id = s.id AND e.final_grade IS NOT NULL
             WHERE pr.active = TRUE AND (p.active = TRUE OR s.id IS NULL)
             GROUP BY pr.id, pr.name, pr.code, pr.duration_terms
             ORDER BY pass_rate DESC NULLS LAST, program_avg DESC NULLS LAST",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn staff_directory(&self) -> PortResult<Vec<StaffMember>> {
        let records = sqlx::query_as::<_, StaffMemberRecord>(
            "SELECT p.first_name || ' ' || p.last_name AS full_name,
                    sm.position, sm.access_level,
                    pr.name AS program_name,
                    sm.appointed_on
             FROM staff_members sm
             INNER JOIN principals p ON sm.principal_id = p.id
             LEFT JOIN programs pr ON sm.program_id = pr.id
             WHERE p.active = TRUE
             ORDER BY CASE sm.access_level
                        WHEN 'director' THEN 1
                        WHEN 'deputy_director' THEN 2
                        WHEN 'coordinator' THEN 3
                      END,
                      sm.appointed_on DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn track_comparison(&self) -> PortResult<Vec<TrackComparison>> {
        let records = sqlx::query_as::<_, TrackComparisonRecord>(
            "SELECT CASE WHEN pr.duration_terms = 6 THEN 'TSU'
                         WHEN pr.duration_terms = 9 THEN 'Ingeniería'
                    END AS track_name,
                    COUNT(DISTINCT pr.id) AS program_count,
                    COUNT(DISTINCT s.id) AS student_count,
                    COUNT(DISTINCT t.id) AS teacher_count,
                    AVG(s.gpa) AS track_avg,
                    ROUND((COUNT(DISTINCT e.id) FILTER (WHERE e.status = 'passed') * 100.0
                           / NULLIF(COUNT(DISTINCT e.id), 0))::numeric, 2)::float8 AS pass_rate
             FROM programs pr
             LEFT JOIN students s ON s.program_id = pr.id
             LEFT JOIN principals p ON s.principal_id = p.id
             LEFT JOIN teachers t ON t.program_id = pr.id AND t.active = TRUE
             LEFT JOIN evaluations e ON e.student_id = s.id AND e.final_grade IS NOT NULL
             WHERE pr.active = TRUE AND (p.active = TRUE OR s.id IS NULL)
               AND pr.duration_terms IN (6, 9)
             GROUP BY track_name
             ORDER BY track_avg DESC NULLS LAST",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn global_stats(&self) -> PortResult<GlobalStats> {
        let (student_total, students_active, students_graduated, student_avg): (
            i64,
            i64,
            i64,
            Option<f64>,
        ) = sqlx::query_as(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE s.standing = 'active'),
                    COUNT(*) FILTER (WHERE s.standing = 'graduated'),
                    AVG(s.gpa)
             FROM students s
             INNER JOIN principals p ON s.principal_id = p.id
             WHERE p.active = TRUE",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let (teacher_total, teacher_tutors): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE t.is_group_tutor)
             FROM teachers t
             INNER JOIN principals p ON t.principal_id = p.id
             WHERE t.active = TRUE AND p.active = TRUE",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let program_total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM programs WHERE active = TRUE")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(GlobalStats {
            student_total,
            students_active,
            students_graduated,
            student_avg,
            teacher_total,
            teacher_tutors,
            program_total,
        })
    }

    async fn search_students(&self, term: &str, limit: i64) -> PortResult<Vec<SearchHit>> {
        let pattern = format!("%{term}%");

        let records = sqlx::query_as::<_, SearchHitRecord>(
            "SELECT p.first_name || ' ' || p.last_name AS full_name,
                    s.enrollment_number,
                    pr.name AS program_name,
                    s.gpa
             FROM students s
             INNER JOIN principals p ON s.principal_id = p.id
             INNER JOIN programs pr ON s.program_id = pr.id
             WHERE (LOWER(p.first_name) LIKE $1
                    OR LOWER(p.last_name) LIKE $1
                    OR s.enrollment_number LIKE $1)
               AND p.active = TRUE
             LIMIT $2",
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
