//! crates/dtai_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// The role attached to a principal. Every account is exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Teacher,
    Staff,
}

impl Role {
    /// Wire name used in tokens and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            "staff" => Some(Role::Staff),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents an authenticated account.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub active: bool,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct PrincipalCredentials {
    pub principal: Principal,
    pub password_hash: String,
}

/// A server-tracked record of an issued token's validity window,
/// independent of the token's own embedded expiry.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub principal_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
}

/// Academic standing of a student record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Active,
    Graduated,
    Dropped,
}

impl Standing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Standing::Active => "active",
            Standing::Graduated => "graduated",
            Standing::Dropped => "dropped",
        }
    }

    pub fn parse(s: &str) -> Option<Standing> {
        match s {
            "active" => Some(Standing::Active),
            "graduated" => Some(Standing::Graduated),
            "dropped" => Some(Standing::Dropped),
            _ => None,
        }
    }
}

/// Role-specific extension record, 1:1 with a principal and created in the
/// same transaction. Keyed by role; each variant carries only its own fields.
#[derive(Debug, Clone)]
pub enum RoleProfile {
    Student(StudentProfile),
    Teacher(TeacherProfile),
    Staff(StaffProfile),
}

impl RoleProfile {
    pub fn role(&self) -> Role {
        match self {
            RoleProfile::Student(_) => Role::Student,
            RoleProfile::Teacher(_) => Role::Teacher,
            RoleProfile::Staff(_) => Role::Staff,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StudentProfile {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub enrollment_number: String,
    pub program_id: Uuid,
    pub current_term: i32,
    pub enrolled_on: NaiveDate,
    pub phone: Option<String>,
    pub standing: Standing,
    pub gpa: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TeacherProfile {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub employee_number: String,
    pub program_id: Uuid,
    pub hired_on: NaiveDate,
    pub academic_title: Option<String>,
    pub specialty: Option<String>,
    pub years_experience: i32,
    pub is_group_tutor: bool,
    pub phone: Option<String>,
    pub extension: Option<String>,
}

/// Hierarchy level of a staff member, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Director,
    DeputyDirector,
    Coordinator,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Director => "director",
            AccessLevel::DeputyDirector => "deputy_director",
            AccessLevel::Coordinator => "coordinator",
        }
    }

    pub fn parse(s: &str) -> Option<AccessLevel> {
        match s {
            "director" => Some(AccessLevel::Director),
            "deputy_director" => Some(AccessLevel::DeputyDirector),
            "coordinator" => Some(AccessLevel::Coordinator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaffProfile {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub employee_number: String,
    pub position: String,
    pub access_level: AccessLevel,
    pub program_id: Option<Uuid>,
    pub appointed_on: NaiveDate,
    pub phone: Option<String>,
    pub extension: Option<String>,
}

/// A degree program. `duration_terms` doubles as the track discriminator:
/// 6 terms = TSU, 9 terms = Engineering.
#[derive(Debug, Clone)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub duration_terms: i32,
}

/// An assistant conversation owned by one staff member.
#[derive(Debug, Clone)]
pub struct ChatThread {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Question,
    Answer,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Question => "question",
            MessageKind::Answer => "answer",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub kind: MessageKind,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Lifecycle state of a help request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpStatus {
    Pending,
    InProgress,
    Resolved,
}

impl HelpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HelpStatus::Pending => "pending",
            HelpStatus::InProgress => "in_progress",
            HelpStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<HelpStatus> {
        match s {
            "pending" => Some(HelpStatus::Pending),
            "in_progress" => Some(HelpStatus::InProgress),
            "resolved" => Some(HelpStatus::Resolved),
            _ => None,
        }
    }
}

/// A student's request for help, handled by the staff help desk.
#[derive(Debug, Clone)]
pub struct HelpRequest {
    pub id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub enrollment_number: String,
    pub current_term: i32,
    pub group_code: Option<String>,
    pub subject_line: String,
    pub detail: String,
    pub status: HelpStatus,
    pub reply: Option<String>,
    pub assigned_staff_name: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub replied_at: Option<DateTime<Utc>>,
}

/// Optional filters for the help-desk listing.
#[derive(Debug, Clone, Default)]
pub struct HelpRequestFilter {
    pub search: Option<String>,
    pub group_code: Option<String>,
    pub term: Option<i32>,
    pub status: Option<HelpStatus>,
}

#[derive(Debug, Clone)]
pub struct HelpChatMessage {
    pub id: Uuid,
    pub request_id: Uuid,
    pub author_name: String,
    pub author_role: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct HelpDeskStats {
    pub total: i64,
    pub open: i64,
    pub resolved: i64,
}

//=========================================================================================
// Registration write model
//=========================================================================================

/// Everything needed to create a principal and its role profile in one
/// transaction. The variant of `profile` must agree with `role`.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub profile: NewRoleProfile,
}

impl NewPrincipal {
    pub fn role(&self) -> Role {
        match self.profile {
            NewRoleProfile::Student(_) => Role::Student,
            NewRoleProfile::Teacher(_) => Role::Teacher,
            NewRoleProfile::Staff(_) => Role::Staff,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NewRoleProfile {
    Student(NewStudentProfile),
    Teacher(NewTeacherProfile),
    Staff(NewStaffProfile),
}

#[derive(Debug, Clone)]
pub struct NewStudentProfile {
    pub enrollment_number: String,
    pub program_id: Uuid,
    pub current_term: i32,
    pub enrolled_on: NaiveDate,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTeacherProfile {
    pub employee_number: String,
    pub program_id: Uuid,
    pub hired_on: NaiveDate,
    pub academic_title: Option<String>,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub extension: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewStaffProfile {
    pub employee_number: String,
    pub position: String,
    pub access_level: AccessLevel,
    pub program_id: Option<Uuid>,
    pub appointed_on: NaiveDate,
    pub phone: Option<String>,
    pub extension: Option<String>,
}

//=========================================================================================
// Aggregate rows consumed by the assistant dispatcher
//=========================================================================================

/// One row of the teacher ranking query.
#[derive(Debug, Clone)]
pub struct TeacherStanding {
    pub full_name: String,
    pub program_name: String,
    pub subjects_taught: i64,
    pub students_evaluated: i64,
    pub avg_grade: Option<f64>,
    pub pass_rate: Option<f64>,
    pub years_experience: i32,
    pub is_group_tutor: bool,
}

/// One row of the student ranking query.
#[derive(Debug, Clone)]
pub struct StudentStanding {
    pub full_name: String,
    pub enrollment_number: String,
    pub program_name: String,
    pub group_code: Option<String>,
    pub gpa: Option<f64>,
    pub passed_count: i64,
    pub failed_count: i64,
}

/// One row of the group ranking query.
#[derive(Debug, Clone)]
pub struct GroupStanding {
    pub code: String,
    pub program_name: String,
    pub term: i32,
    pub member_count: i64,
    pub capacity: i32,
    pub occupancy_pct: Option<f64>,
    pub group_avg: Option<f64>,
    pub pass_rate: Option<f64>,
    pub tutor_name: Option<String>,
}

/// One row of the program overview query.
#[derive(Debug, Clone)]
pub struct ProgramSummary {
    pub name: String,
    pub code: String,
    pub duration_terms: i32,
    pub student_count: i64,
    pub teacher_count: i64,
    pub subject_count: i64,
    pub program_avg: Option<f64>,
    pub pass_rate: Option<f64>,
}

/// One row of the staff directory query.
#[derive(Debug, Clone)]
pub struct StaffMember {
    pub full_name: String,
    pub position: String,
    pub access_level: AccessLevel,
    pub program_name: Option<String>,
    pub appointed_on: NaiveDate,
}

/// One side of the TSU-vs-Engineering comparison.
#[derive(Debug, Clone)]
pub struct TrackComparison {
    pub track_name: String,
    pub program_count: i64,
    pub student_count: i64,
    pub teacher_count: i64,
    pub track_avg: Option<f64>,
    pub pass_rate: Option<f64>,
}

/// Division-wide counters for the statistics reply.
#[derive(Debug, Clone, Copy)]
pub struct GlobalStats {
    pub student_total: i64,
    pub students_active: i64,
    pub students_graduated: i64,
    pub student_avg: Option<f64>,
    pub teacher_total: i64,
    pub teacher_tutors: i64,
    pub program_total: i64,
}

/// A match from the fallback keyword search over student records.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub full_name: String,
    pub enrollment_number: String,
    pub program_name: String,
    pub gpa: Option<f64>,
}
