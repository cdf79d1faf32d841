// src/store/assignments.rs

use chrono::{DateTime, Utc};
use sqlx::{SqlitePool, types::Json};

use crate::{
    error::AppError,
    models::session::{AnswerRecord, Assignment, AssignmentStatus, PreviousAttempt},
    store::sessions,
    utils::token,
};

/// Rotates an assignment back to a fresh pending attempt for a new package
/// download.
///
/// If the current attempt was submitted, it is archived into
/// `previous_attempts` first. The UPDATE is guarded by the token value read
/// from `assignment`, so when two downloads race only one of them lands;
/// the loser sees zero rows and gets a Conflict.
pub async fn rotate_for_download(
    pool: &SqlitePool,
    assignment: &Assignment,
    new_token: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let mut previous = assignment.previous_attempts.0.clone();
    if assignment.status == AssignmentStatus::Submitted {
        previous.push(PreviousAttempt {
            status: assignment.status,
            login_time: assignment.login_time,
            start_time: assignment.start_time,
            submit_time: assignment.submit_time,
            score: assignment.score,
            auto_submitted: assignment.auto_submitted,
            answers: assignment.answers.0.clone(),
        });
    }

    let result = sqlx::query(
        r#"
        UPDATE assignments
        SET status = 'pending',
            login_time = ?,
            start_time = NULL,
            submit_time = NULL,
            score = 0,
            auto_submitted = 0,
            session_token = ?,
            answers = '[]',
            previous_attempts = ?
        WHERE id = ? AND session_token IS ?
        "#,
    )
    .bind(now)
    .bind(new_token)
    .bind(Json(previous))
    .bind(assignment.id)
    .bind(assignment.session_token.as_deref())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(
            "Exam package was re-issued by a concurrent request".to_string(),
        ));
    }
    Ok(())
}

/// Moves an assignment to in_progress, stamping the start time once.
///
/// A repeated start with the same token is harmless: the row matches again
/// and COALESCE keeps the original start_time.
pub async fn mark_started(
    pool: &SqlitePool,
    assignment_id: i64,
    session_token: &str,
    now: DateTime<Utc>,
) -> Result<Assignment, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE assignments
        SET status = 'in_progress',
            start_time = COALESCE(start_time, ?)
        WHERE id = ? AND session_token = ? AND status <> 'submitted'
        "#,
    )
    .bind(now)
    .bind(assignment_id)
    .bind(session_token)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(diagnose_failed_transition(pool, assignment_id, session_token).await?);
    }

    sessions::get_assignment(pool, assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))
}

/// Finalizes an assignment with the graded submission.
///
/// Keyed by (id, token, not-yet-submitted) so a duplicate or stale submit
/// matches zero rows instead of overwriting the recorded score.
pub async fn record_submission(
    pool: &SqlitePool,
    assignment_id: i64,
    session_token: &str,
    answers: &[AnswerRecord],
    score: i64,
    auto_submitted: bool,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE assignments
        SET status = 'submitted',
            submit_time = ?,
            score = ?,
            auto_submitted = ?,
            answers = ?
        WHERE id = ? AND session_token = ? AND status <> 'submitted'
        "#,
    )
    .bind(now)
    .bind(score)
    .bind(auto_submitted)
    .bind(Json(answers))
    .bind(assignment_id)
    .bind(session_token)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(diagnose_failed_transition(pool, assignment_id, session_token).await?);
    }
    Ok(())
}

/// Explains why a guarded transition matched zero rows.
///
/// Re-reads the row: a submitted status means the attempt already
/// finished; otherwise the presented token is checked against the stored
/// one. A matching token here means the row moved between the UPDATE and
/// this read, which is a retryable conflict rather than a bad credential.
async fn diagnose_failed_transition(
    pool: &SqlitePool,
    assignment_id: i64,
    presented_token: &str,
) -> Result<AppError, AppError> {
    let assignment = sessions::get_assignment(pool, assignment_id).await?;
    Ok(match assignment {
        None => AppError::NotFound("Assignment not found".to_string()),
        Some(a) if a.status == AssignmentStatus::Submitted => {
            AppError::Forbidden("Exam already submitted".to_string())
        }
        Some(a) => {
            let token_ok = a
                .session_token
                .as_deref()
                .is_some_and(|stored| token::tokens_match(stored, presented_token));
            if token_ok {
                AppError::Conflict("Assignment changed concurrently".to_string())
            } else {
                AppError::Forbidden("Invalid session token".to_string())
            }
        }
    })
}

/// Creates pending assignment rows for a set of students in one statement.
pub async fn create_for_students(
    pool: &SqlitePool,
    session_id: i64,
    student_ids: &[i64],
) -> Result<(), AppError> {
    if student_ids.is_empty() {
        return Ok(());
    }

    let mut builder =
        sqlx::QueryBuilder::new("INSERT INTO assignments (session_id, student_id) ");
    builder.push_values(student_ids, |mut b, student_id| {
        b.push_bind(session_id).push_bind(*student_id);
    });
    builder.build().execute(pool).await?;
    Ok(())
}
