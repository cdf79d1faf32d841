// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Question type: auto-graded multiple choice or free-text descriptive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Descriptive,
}

/// Represents the 'exams' table in the database.
/// Questions are immutable once the exam is referenced by an active session.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub total_marks: i64,
    pub passing_marks: i64,
    pub is_active: bool,
    pub created_by: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,
    pub question_text: String,
    pub question_type: QuestionType,

    /// Option list for mcq questions (empty for descriptive).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// The answer key. Never serialized into client-facing packages.
    pub correct_answer: Option<String>,

    pub marks: i64,
    pub order_index: i64,
}

/// DTO for creating a new exam.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: i64,
    #[validate(range(min = 1))]
    pub total_marks: i64,
    #[validate(range(min = 0))]
    pub passing_marks: i64,
}

/// DTO for partial exam updates.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i64>,
    #[validate(range(min = 1))]
    pub total_marks: Option<i64>,
    #[validate(range(min = 0))]
    pub passing_marks: Option<i64>,
    pub is_active: Option<bool>,
}

/// DTO for adding a question to an exam.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub marks: i64,
    /// Defaults to appending after the current last question.
    pub order_index: Option<i64>,
}

/// DTO for partial question updates.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: Option<String>,
    pub question_type: Option<QuestionType>,
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub marks: Option<i64>,
    pub order_index: Option<i64>,
}
