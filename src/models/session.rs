// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::models::exam::QuestionType;

/// Delivery mode of a scheduled session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SessionMode {
    Online,
    Offline,
}

/// Lifecycle state of one student's attempt.
///
/// Only advances pending -> in_progress -> submitted; a retake download is
/// the single edge back to pending, and it archives the finished attempt
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    InProgress,
    Submitted,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Submitted => "submitted",
        }
    }
}

/// Represents the 'exam_sessions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: i64,
    pub exam_id: i64,
    pub session_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub mode: SessionMode,
    pub lab_name: Option<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// One recorded answer inside an attempt.
/// `is_correct` is None for descriptive questions (not auto-graded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: i64,
    pub answer_text: String,
    pub is_correct: Option<bool>,
    pub marks_awarded: i64,
    pub answered_at: DateTime<Utc>,
}

/// Immutable snapshot of a finished attempt, captured at retake time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviousAttempt {
    pub status: AssignmentStatus,
    pub login_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub submit_time: Option<DateTime<Utc>>,
    pub score: i64,
    pub auto_submitted: bool,
    pub answers: Vec<AnswerRecord>,
}

/// Represents the 'assignments' table: one row per (session, student).
///
/// The row is independently addressable so every transition is a single
/// conditional UPDATE keyed by (id, session_token, status); concurrent
/// retries lose cleanly instead of double-applying.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub session_id: i64,
    pub student_id: i64,
    pub status: AssignmentStatus,
    pub login_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub submit_time: Option<DateTime<Utc>>,
    pub score: i64,
    pub auto_submitted: bool,

    /// Current opaque per-attempt credential. Rotates on every download;
    /// start/submit must present the stored value.
    pub session_token: Option<String>,

    pub answers: Json<Vec<AnswerRecord>>,
    pub previous_attempts: Json<Vec<PreviousAttempt>>,
}

// ---------- Admin DTOs ----------

/// DTO for scheduling a session. When `student_ids` is absent or empty,
/// every student account gets an assignment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub exam_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub session_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub mode: Option<SessionMode>,
    #[validate(length(max = 100))]
    pub lab_name: Option<String>,
    pub student_ids: Option<Vec<i64>>,
}

/// DTO for partial session updates.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub exam_id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub session_name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub mode: Option<SessionMode>,
    #[validate(length(max = 100))]
    pub lab_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleSessionRequest {
    pub is_active: bool,
}

/// Summary row for the admin session list.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: i64,
    pub exam_id: i64,
    pub session_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub mode: SessionMode,
    pub lab_name: Option<String>,
    pub is_active: bool,
    pub exam_title: String,
    pub total_students: i64,
    pub submitted_count: i64,
}

/// Per-student monitoring row for the live status dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatusEntry {
    pub assignment_id: i64,
    pub student_id: Option<String>,
    pub name: String,
    /// Display mapping: in_progress -> online, submitted -> completed,
    /// pending -> offline.
    pub display_status: &'static str,
    pub answered_count: usize,
    pub total_questions: usize,
    pub last_activity: Option<DateTime<Utc>>,
    pub score: i64,
}

/// Per-student scored row for the admin results view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResultEntry {
    pub assignment_id: i64,
    pub student_id: Option<String>,
    pub name: String,
    pub email: String,
    pub status: AssignmentStatus,
    pub score: i64,
    pub submit_time: Option<DateTime<Utc>>,
    pub auto_submitted: bool,
    pub total_marks: i64,
    pub passing_marks: i64,
    pub result: &'static str,
}

// ---------- Student protocol DTOs ----------

/// One row of the student's assigned-exam listing.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssignedExamEntry {
    pub session_id: i64,
    pub session_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub exam_id: i64,
    pub exam_title: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub total_marks: i64,
    pub assignment_id: i64,
    pub status: AssignmentStatus,
    pub score: i64,
    pub submit_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub encrypted_exam: String,
    /// Per-download ephemeral package key, base64. Rotates with the token.
    pub package_key: String,
    pub session_id: i64,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExamRequest {
    pub session_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExamResponse {
    pub assignment_id: i64,
    pub start_time: DateTime<Utc>,
}

/// One answer as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub answer_text: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamRequest {
    pub session_token: String,
    pub answers: Vec<SubmittedAnswer>,
    #[serde(default)]
    pub auto_submitted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamResponse {
    pub score: i64,
    pub auto_submitted: bool,
}

/// Per-question detail revealed by the result endpoint once the session
/// window has closed (the answer-key gate).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnswer {
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub your_answer: String,
    pub correct_answer: Option<String>,
    pub is_correct: Option<bool>,
    pub marks_awarded: i64,
    pub total_marks: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultResponse {
    pub score: i64,
    pub total_marks: i64,
    pub passing_marks: i64,
    pub result: String,
    pub exam_title: String,
    pub submit_time: Option<DateTime<Utc>>,
    pub auto_submitted: bool,
    pub exam_has_ended: bool,
    /// None until `now > session.end_time`.
    pub answers: Option<Vec<DetailedAnswer>>,
}
