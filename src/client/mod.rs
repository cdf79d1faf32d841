// src/client/mod.rs

pub mod api;
pub mod cache;
pub mod proctor;

use std::time::Duration;

use crate::{
    error::AppError,
    models::session::{SubmitExamRequest, SubmitExamResponse, SubmittedAnswer},
};

/// Submits the locally cached answers and clears the cache on success.
///
/// The cached rows are the source of truth for the outgoing payload, and
/// they are only deleted once the server has acknowledged the submission.
/// If every retry fails the cache is left intact for a later attempt.
pub async fn submit_cached_attempt(
    client: &api::ExamClient,
    cache: &cache::OfflineCache,
    session_id: i64,
    assignment_id: i64,
    session_token: &str,
    auto_submitted: bool,
) -> Result<SubmitExamResponse, AppError> {
    let answers = cache
        .get_answers(assignment_id)
        .await?
        .into_iter()
        .map(|a| SubmittedAnswer {
            question_id: a.question_id,
            answer_text: a.answer_text,
        })
        .collect();

    let request = SubmitExamRequest {
        session_token: session_token.to_string(),
        answers,
        auto_submitted,
    };

    let response = client
        .submit_with_retry(session_id, &request, 5, Duration::from_secs(5))
        .await?;

    cache.clear_attempt(session_id, assignment_id).await?;
    Ok(response)
}
