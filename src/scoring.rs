// src/scoring.rs

use chrono::Utc;

use crate::models::{
    exam::{Question, QuestionType},
    session::{AnswerRecord, SubmittedAnswer},
};

/// The outcome of grading one submission.
#[derive(Debug, Clone)]
pub struct GradedSubmission {
    pub answers: Vec<AnswerRecord>,
    pub total_score: i64,
}

/// Grades a batch of submitted answers against the exam's question set.
///
/// MCQ answers are compared after trimming and lowercasing both sides; a
/// match earns the question's full marks, anything else earns zero.
/// Descriptive answers are recorded but not auto-graded, so `is_correct`
/// stays None and no marks are awarded. Answers referencing unknown
/// question ids are dropped.
pub fn grade(questions: &[Question], submitted: &[SubmittedAnswer]) -> GradedSubmission {
    let now = Utc::now();
    let mut answers = Vec::with_capacity(submitted.len());
    let mut total_score: i64 = 0;

    for sub in submitted {
        let Some(question) = questions.iter().find(|q| q.id == sub.question_id) else {
            continue;
        };

        let (is_correct, marks_awarded) = match question.question_type {
            QuestionType::Mcq => {
                let correct = question
                    .correct_answer
                    .as_deref()
                    .map(|c| c.trim().to_lowercase())
                    .unwrap_or_default();
                let given = sub.answer_text.trim().to_lowercase();
                if !correct.is_empty() && given == correct {
                    (Some(true), question.marks)
                } else {
                    (Some(false), 0)
                }
            }
            QuestionType::Descriptive => (None, 0),
        };

        total_score += marks_awarded;
        answers.push(AnswerRecord {
            question_id: question.id,
            answer_text: sub.answer_text.clone(),
            is_correct,
            marks_awarded,
            answered_at: now,
        });
    }

    GradedSubmission {
        answers,
        total_score,
    }
}
