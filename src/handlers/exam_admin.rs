// src/handlers/exam_admin.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{
        AddQuestionRequest, CreateExamRequest, Exam, Question, UpdateExamRequest,
        UpdateQuestionRequest,
    },
    state::AppState,
    utils::jwt::Claims,
};

/// POST /api/admin/exams
pub async fn create_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if payload.passing_marks > payload.total_marks {
        return Err(AppError::BadRequest(
            "Passing marks cannot exceed total marks".to_string(),
        ));
    }

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams (title, description, duration_minutes, total_marks, passing_marks, created_by)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.duration_minutes)
    .bind(payload.total_marks)
    .bind(payload.passing_marks)
    .bind(claims.user_id())
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(exam_id = exam.id, "created exam");
    Ok((StatusCode::CREATED, Json(exam)))
}

/// GET /api/admin/exams
pub async fn list_exams(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, Exam>("SELECT * FROM exams ORDER BY created_at DESC")
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(exams))
}

/// GET /api/admin/exams/{id}
///
/// Returns the exam together with its full question set, answer keys
/// included. This surface is admin-only.
pub async fn get_exam(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE exam_id = ? ORDER BY order_index ASC, id ASC",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({ "exam": exam, "questions": questions })))
}

/// PUT /api/admin/exams/{id}
pub async fn update_exam(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        UPDATE exams
        SET title = COALESCE(?, title),
            description = COALESCE(?, description),
            duration_minutes = COALESCE(?, duration_minutes),
            total_marks = COALESCE(?, total_marks),
            passing_marks = COALESCE(?, passing_marks),
            is_active = COALESCE(?, is_active)
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.duration_minutes)
    .bind(payload.total_marks)
    .bind(payload.passing_marks)
    .bind(payload.is_active)
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    Ok(Json(exam))
}

/// DELETE /api/admin/exams/{id}
///
/// Refused while any session still references the exam, so scheduled or
/// finished sessions never lose their question set.
pub async fn delete_exam(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let referenced =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM exam_sessions WHERE exam_id = ?")
            .bind(id)
            .fetch_one(&state.pool)
            .await?;
    if referenced > 0 {
        return Err(AppError::Conflict(
            "Exam is referenced by one or more sessions".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM exams WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    tracing::info!(exam_id = id, "deleted exam");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/exams/{id}/questions
pub async fn add_question(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<AddQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    validate_question_shape(
        payload.question_type,
        &payload.options,
        payload.correct_answer.as_deref(),
    )?;

    let exam_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM exams WHERE id = ?")
        .bind(exam_id)
        .fetch_one(&state.pool)
        .await?;
    if exam_exists == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    let order_index = match payload.order_index {
        Some(idx) => idx,
        None => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COALESCE(MAX(order_index) + 1, 0) FROM questions WHERE exam_id = ?",
            )
            .bind(exam_id)
            .fetch_one(&state.pool)
            .await?
        }
    };

    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (exam_id, question_text, question_type, options, correct_answer, marks, order_index)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(exam_id)
    .bind(&payload.question_text)
    .bind(payload.question_type)
    .bind(sqlx::types::Json(&payload.options))
    .bind(&payload.correct_answer)
    .bind(payload.marks)
    .bind(order_index)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// PUT /api/admin/questions/{id}
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let existing = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    let question_type = payload.question_type.unwrap_or(existing.question_type);
    let options = payload.options.clone().unwrap_or_else(|| existing.options.0.clone());
    let correct_answer = payload
        .correct_answer
        .clone()
        .or_else(|| existing.correct_answer.clone());
    validate_question_shape(question_type, &options, correct_answer.as_deref())?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        UPDATE questions
        SET question_text = COALESCE(?, question_text),
            question_type = ?,
            options = ?,
            correct_answer = ?,
            marks = COALESCE(?, marks),
            order_index = COALESCE(?, order_index)
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&payload.question_text)
    .bind(question_type)
    .bind(sqlx::types::Json(&options))
    .bind(&correct_answer)
    .bind(payload.marks)
    .bind(payload.order_index)
    .bind(id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(question))
}

/// DELETE /api/admin/questions/{id}
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// MCQ questions need at least two options and an answer key that is one of
/// them; descriptive questions carry neither.
fn validate_question_shape(
    question_type: crate::models::exam::QuestionType,
    options: &[String],
    correct_answer: Option<&str>,
) -> Result<(), AppError> {
    use crate::models::exam::QuestionType;

    match question_type {
        QuestionType::Mcq => {
            if options.len() < 2 {
                return Err(AppError::BadRequest(
                    "MCQ questions need at least two options".to_string(),
                ));
            }
            let Some(answer) = correct_answer else {
                return Err(AppError::BadRequest(
                    "MCQ questions need a correct answer".to_string(),
                ));
            };
            let answer_norm = answer.trim().to_lowercase();
            if !options.iter().any(|o| o.trim().to_lowercase() == answer_norm) {
                return Err(AppError::BadRequest(
                    "Correct answer must be one of the options".to_string(),
                ));
            }
        }
        QuestionType::Descriptive => {}
    }
    Ok(())
}
