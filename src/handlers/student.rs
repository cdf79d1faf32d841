// src/handlers/student.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{Duration, Utc};

use crate::{
    error::AppError,
    models::session::{
        AssignedExamEntry, AssignmentStatus, DetailedAnswer, DownloadResponse, ExamResultResponse,
        StartExamRequest, StartExamResponse, SubmitExamRequest, SubmitExamResponse,
    },
    scoring,
    state::AppState,
    store::{assignments, sessions},
    utils::{codec, jwt::Claims, token},
};

/// GET /api/student/exams/assigned
pub async fn list_assigned(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let entries = sqlx::query_as::<_, AssignedExamEntry>(
        r#"
        SELECT s.id AS session_id, s.session_name, s.start_time, s.end_time, s.is_active,
               e.id AS exam_id, e.title AS exam_title, e.description,
               e.duration_minutes, e.total_marks,
               a.id AS assignment_id, a.status, a.score, a.submit_time
        FROM assignments a
        JOIN exam_sessions s ON s.id = a.session_id
        JOIN exams e ON e.id = s.exam_id
        WHERE a.student_id = ?
        ORDER BY s.start_time DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(entries))
}

/// GET /api/student/exams/{session_id}/download
///
/// Issues a fresh attempt: archives a finished one, rotates the session
/// token, stamps login_time, and returns the encrypted package together
/// with its one-use key. Both travel over the authenticated channel; the
/// key is never persisted server side.
pub async fn download_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions::get_session(&state.pool, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    if !session.is_active {
        return Err(AppError::Forbidden(
            "Exam session is not active yet".to_string(),
        ));
    }

    let assignment = sessions::find_assignment(&state.pool, session_id, claims.user_id())
        .await?
        .ok_or_else(|| {
            AppError::Forbidden("You are not assigned to this exam session".to_string())
        })?;

    let exam = sessions::get_exam(&state.pool, session.exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;
    let questions = sessions::get_questions(&state.pool, session.exam_id).await?;

    let new_token = token::issue_token();
    assignments::rotate_for_download(&state.pool, &assignment, &new_token, Utc::now()).await?;

    let package = codec::ExamPackage::build(assignment.id, new_token, &exam, &questions);
    let key = codec::generate_key();
    let encrypted_exam = codec::encode(&package, &key)?;

    tracing::info!(
        session_id,
        assignment_id = assignment.id,
        "issued exam package"
    );

    Ok(Json(DownloadResponse {
        encrypted_exam,
        package_key: STANDARD.encode(key),
        session_id,
    }))
}

/// POST /api/student/exams/{session_id}/start
pub async fn start_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
    Json(payload): Json<StartExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = sessions::find_assignment(&state.pool, session_id, claims.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;

    let now = Utc::now();
    let updated =
        assignments::mark_started(&state.pool, assignment.id, &payload.session_token, now).await?;

    Ok(Json(StartExamResponse {
        assignment_id: updated.id,
        start_time: updated.start_time.unwrap_or(now),
    }))
}

/// POST /api/student/exams/{session_id}/submit
///
/// Grades server side and finalizes the attempt. Submissions are accepted
/// until end_time plus the configured grace window, which covers clients
/// that held a finished attempt through an outage.
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions::get_session(&state.pool, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let now = Utc::now();
    let deadline = session.end_time + Duration::minutes(state.config.submit_grace_minutes);
    if now > deadline {
        return Err(AppError::Forbidden(
            "Submission window has closed".to_string(),
        ));
    }

    let assignment = sessions::find_assignment(&state.pool, session_id, claims.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;

    let questions = sessions::get_questions(&state.pool, session.exam_id).await?;
    let graded = scoring::grade(&questions, &payload.answers);

    assignments::record_submission(
        &state.pool,
        assignment.id,
        &payload.session_token,
        &graded.answers,
        graded.total_score,
        payload.auto_submitted,
        now,
    )
    .await?;

    tracing::info!(
        session_id,
        assignment_id = assignment.id,
        score = graded.total_score,
        auto_submitted = payload.auto_submitted,
        "recorded exam submission"
    );

    Ok(Json(SubmitExamResponse {
        score: graded.total_score,
        auto_submitted: payload.auto_submitted,
    }))
}

/// GET /api/student/exams/{session_id}/result
///
/// Score and pass/fail are visible immediately after submission. The
/// per-question breakdown with correct answers stays null until the
/// session window has closed, so early finishers cannot leak the key to
/// students still writing.
pub async fn exam_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = sessions::find_assignment(&state.pool, session_id, claims.user_id())
        .await?
        .filter(|a| a.status == AssignmentStatus::Submitted)
        .ok_or_else(|| {
            AppError::NotFound("Result not found or exam not submitted yet".to_string())
        })?;

    let session = sessions::get_session(&state.pool, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
    let exam = sessions::get_exam(&state.pool, session.exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    let exam_has_ended = Utc::now() > session.end_time;

    let answers = if exam_has_ended {
        let questions = sessions::get_questions(&state.pool, session.exam_id).await?;
        let detailed = assignment
            .answers
            .0
            .iter()
            .filter_map(|record| {
                let question = questions.iter().find(|q| q.id == record.question_id)?;
                Some(DetailedAnswer {
                    question_text: question.question_text.clone(),
                    question_type: question.question_type,
                    options: question.options.0.clone(),
                    your_answer: record.answer_text.clone(),
                    correct_answer: question.correct_answer.clone(),
                    is_correct: record.is_correct,
                    marks_awarded: record.marks_awarded,
                    total_marks: question.marks,
                })
            })
            .collect();
        Some(detailed)
    } else {
        None
    };

    let result = if assignment.score >= exam.passing_marks {
        "Pass"
    } else {
        "Fail"
    };

    Ok(Json(ExamResultResponse {
        score: assignment.score,
        total_marks: exam.total_marks,
        passing_marks: exam.passing_marks,
        result: result.to_string(),
        exam_title: exam.title,
        submit_time: assignment.submit_time,
        auto_submitted: assignment.auto_submitted,
        exam_has_ended,
        answers,
    }))
}
