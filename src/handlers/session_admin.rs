// src/handlers/session_admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::{
    error::AppError,
    models::session::{
        Assignment, AssignmentStatus, CreateSessionRequest, ExamSession, LiveStatusEntry,
        SessionMode, SessionResultEntry, SessionSummary, ToggleSessionRequest,
        UpdateSessionRequest,
    },
    state::AppState,
    store::{assignments, sessions},
};

/// POST /api/admin/sessions
///
/// Schedules a session and creates a pending assignment per student. An
/// absent or empty `studentIds` list assigns every student account.
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if payload.end_time <= payload.start_time {
        return Err(AppError::BadRequest(
            "Session end time must be after its start time".to_string(),
        ));
    }

    sessions::get_exam(&state.pool, payload.exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    let mode = payload.mode.unwrap_or(SessionMode::Online);
    let session = sqlx::query_as::<_, ExamSession>(
        r#"
        INSERT INTO exam_sessions (exam_id, session_name, start_time, end_time, mode, lab_name)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(payload.exam_id)
    .bind(&payload.session_name)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(mode)
    .bind(&payload.lab_name)
    .fetch_one(&state.pool)
    .await?;

    let student_ids = match payload.student_ids {
        Some(ids) if !ids.is_empty() => ids,
        _ => {
            sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE role = 'student'")
                .fetch_all(&state.pool)
                .await?
        }
    };
    assignments::create_for_students(&state.pool, session.id, &student_ids).await?;

    tracing::info!(
        session_id = session.id,
        assigned = student_ids.len(),
        "scheduled exam session"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "session": session, "assignedStudents": student_ids.len() })),
    ))
}

/// GET /api/admin/sessions
pub async fn list_sessions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let summaries = sqlx::query_as::<_, SessionSummary>(
        r#"
        SELECT s.id, s.exam_id, s.session_name, s.start_time, s.end_time,
               s.mode, s.lab_name, s.is_active,
               e.title AS exam_title,
               (SELECT COUNT(*) FROM assignments a WHERE a.session_id = s.id) AS total_students,
               (SELECT COUNT(*) FROM assignments a
                WHERE a.session_id = s.id AND a.status = 'submitted') AS submitted_count
        FROM exam_sessions s
        JOIN exams e ON e.id = s.exam_id
        ORDER BY s.start_time DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(summaries))
}

#[derive(Debug, FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignedStudentRow {
    assignment_id: i64,
    student_id: Option<String>,
    name: String,
    email: String,
    status: AssignmentStatus,
    score: i64,
}

/// GET /api/admin/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions::get_session(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let students = sqlx::query_as::<_, AssignedStudentRow>(
        r#"
        SELECT a.id AS assignment_id, u.student_id, u.name, u.email, a.status, a.score
        FROM assignments a
        JOIN users u ON u.id = a.student_id
        WHERE a.session_id = ?
        ORDER BY u.name ASC
        "#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({ "session": session, "students": students })))
}

/// PUT /api/admin/sessions/{id}
pub async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let existing = sessions::get_session(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    if let Some(exam_id) = payload.exam_id {
        sessions::get_exam(&state.pool, exam_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;
    }

    let start_time = payload.start_time.unwrap_or(existing.start_time);
    let end_time = payload.end_time.unwrap_or(existing.end_time);
    if end_time <= start_time {
        return Err(AppError::BadRequest(
            "Session end time must be after its start time".to_string(),
        ));
    }

    let session = sqlx::query_as::<_, ExamSession>(
        r#"
        UPDATE exam_sessions
        SET exam_id = COALESCE(?, exam_id),
            session_name = COALESCE(?, session_name),
            start_time = ?,
            end_time = ?,
            mode = COALESCE(?, mode),
            lab_name = COALESCE(?, lab_name)
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(payload.exam_id)
    .bind(&payload.session_name)
    .bind(start_time)
    .bind(end_time)
    .bind(payload.mode)
    .bind(&payload.lab_name)
    .bind(id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(session))
}

/// PATCH /api/admin/sessions/{id}/toggle
///
/// Flips the activation gate. Download requests are refused while a session
/// is inactive, whatever its scheduled window says.
pub async fn toggle_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ToggleSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = sqlx::query_as::<_, ExamSession>(
        "UPDATE exam_sessions SET is_active = ? WHERE id = ? RETURNING *",
    )
    .bind(payload.is_active)
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    tracing::info!(session_id = id, is_active = payload.is_active, "toggled session");
    Ok(Json(session))
}

/// DELETE /api/admin/sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM exam_sessions WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Session not found".to_string()));
    }

    tracing::info!(session_id = id, "deleted session and its assignments");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, FromRow)]
struct LiveRow {
    assignment_id: i64,
    student_id: Option<String>,
    name: String,
    status: AssignmentStatus,
    score: i64,
    login_time: Option<chrono::DateTime<chrono::Utc>>,
    start_time: Option<chrono::DateTime<chrono::Utc>>,
    submit_time: Option<chrono::DateTime<chrono::Utc>>,
    answers: sqlx::types::Json<Vec<crate::models::session::AnswerRecord>>,
}

/// GET /api/admin/sessions/{id}/live-status
///
/// Monitoring projection for the dashboard. Derived entirely from stored
/// assignment rows, so it costs one query per refresh and no push channel.
pub async fn live_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions::get_session(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let total_questions = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM questions WHERE exam_id = ?",
    )
    .bind(session.exam_id)
    .fetch_one(&state.pool)
    .await? as usize;

    let rows = sqlx::query_as::<_, LiveRow>(
        r#"
        SELECT a.id AS assignment_id, u.student_id, u.name, a.status, a.score,
               a.login_time, a.start_time, a.submit_time, a.answers
        FROM assignments a
        JOIN users u ON u.id = a.student_id
        WHERE a.session_id = ?
        ORDER BY u.name ASC
        "#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    let entries: Vec<LiveStatusEntry> = rows
        .into_iter()
        .map(|row| {
            let display_status = match row.status {
                AssignmentStatus::InProgress => "online",
                AssignmentStatus::Submitted => "completed",
                AssignmentStatus::Pending => "offline",
            };
            let last_activity = [
                row.login_time,
                row.start_time,
                row.submit_time,
                row.answers.0.iter().map(|a| a.answered_at).max(),
            ]
            .into_iter()
            .flatten()
            .max();
            LiveStatusEntry {
                assignment_id: row.assignment_id,
                student_id: row.student_id,
                name: row.name,
                display_status,
                answered_count: row.answers.0.len(),
                total_questions,
                last_activity,
                score: row.score,
            }
        })
        .collect();

    Ok(Json(entries))
}

/// GET /api/admin/sessions/{id}/results
///
/// Scored roster sorted by score descending. Pass/Fail comes from the
/// exam's passing marks; students who never submitted show Not Attempted.
pub async fn session_results(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions::get_session(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
    let exam = sessions::get_exam(&state.pool, session.exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    let rows = sqlx::query_as::<_, Assignment>(
        "SELECT * FROM assignments WHERE session_id = ? ORDER BY score DESC",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for assignment in rows {
        let student = sqlx::query_as::<_, crate::models::user::User>(
            "SELECT * FROM users WHERE id = ?",
        )
        .bind(assignment.student_id)
        .fetch_one(&state.pool)
        .await?;

        let result = match assignment.status {
            AssignmentStatus::Submitted => {
                if assignment.score >= exam.passing_marks {
                    "Pass"
                } else {
                    "Fail"
                }
            }
            _ => "Not Attempted",
        };

        entries.push(SessionResultEntry {
            assignment_id: assignment.id,
            student_id: student.student_id,
            name: student.name,
            email: student.email,
            status: assignment.status,
            score: assignment.score,
            submit_time: assignment.submit_time,
            auto_submitted: assignment.auto_submitted,
            total_marks: exam.total_marks,
            passing_marks: exam.passing_marks,
            result,
        });
    }

    Ok(Json(entries))
}
