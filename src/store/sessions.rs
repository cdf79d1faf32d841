// src/store/sessions.rs

use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        exam::{Exam, Question},
        session::{Assignment, ExamSession},
    },
};

pub async fn get_session(pool: &SqlitePool, id: i64) -> Result<Option<ExamSession>, AppError> {
    let session = sqlx::query_as::<_, ExamSession>("SELECT * FROM exam_sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(session)
}

pub async fn get_exam(pool: &SqlitePool, id: i64) -> Result<Option<Exam>, AppError> {
    let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(exam)
}

/// Fetches the exam's questions in display order.
pub async fn get_questions(pool: &SqlitePool, exam_id: i64) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE exam_id = ? ORDER BY order_index ASC, id ASC",
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await?;
    Ok(questions)
}

/// Finds the one assignment row for a (session, student) pair.
pub async fn find_assignment(
    pool: &SqlitePool,
    session_id: i64,
    student_id: i64,
) -> Result<Option<Assignment>, AppError> {
    let assignment = sqlx::query_as::<_, Assignment>(
        "SELECT * FROM assignments WHERE session_id = ? AND student_id = ?",
    )
    .bind(session_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?;
    Ok(assignment)
}

pub async fn get_assignment(pool: &SqlitePool, id: i64) -> Result<Option<Assignment>, AppError> {
    let assignment = sqlx::query_as::<_, Assignment>("SELECT * FROM assignments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(assignment)
}
