// src/client/cache.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{
    SqlitePool,
    prelude::FromRow,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::error::AppError;

/// A downloaded package held on disk for the offline exam flow.
#[derive(Debug, Clone, FromRow)]
pub struct CachedPackage {
    pub session_id: i64,
    pub package_key: String,
    pub encrypted_exam: String,
    pub saved_at: DateTime<Utc>,
}

/// A locally saved answer, written on every change so a crash or power
/// loss costs at most the answer currently being typed.
#[derive(Debug, Clone, FromRow)]
pub struct CachedAnswer {
    pub assignment_id: i64,
    pub question_id: i64,
    pub answer_text: String,
    pub saved_at: DateTime<Utc>,
}

/// Local persistent store for the student client.
///
/// One package per session and one row per answered question. Everything
/// survives process restarts; rows are only removed once the server has
/// acknowledged the submission.
pub struct OfflineCache {
    pool: SqlitePool,
}

impl OfflineCache {
    /// Opens (and if needed creates) the cache database at `path`.
    pub async fn open(path: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                session_id     INTEGER PRIMARY KEY,
                package_key    TEXT NOT NULL,
                encrypted_exam TEXT NOT NULL,
                saved_at       TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS answers (
                assignment_id INTEGER NOT NULL,
                question_id   INTEGER NOT NULL,
                answer_text   TEXT NOT NULL,
                saved_at      TEXT NOT NULL,
                PRIMARY KEY (assignment_id, question_id)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(OfflineCache { pool })
    }

    /// Stores a freshly downloaded package, replacing any earlier download
    /// for the same session. The old package's token is dead anyway once
    /// the server has rotated it.
    pub async fn save_package(
        &self,
        session_id: i64,
        package_key: &str,
        encrypted_exam: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO packages (session_id, package_key, encrypted_exam, saved_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (session_id) DO UPDATE
            SET package_key = excluded.package_key,
                encrypted_exam = excluded.encrypted_exam,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(session_id)
        .bind(package_key)
        .bind(encrypted_exam)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_package(&self, session_id: i64) -> Result<Option<CachedPackage>, AppError> {
        let package =
            sqlx::query_as::<_, CachedPackage>("SELECT * FROM packages WHERE session_id = ?")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(package)
    }

    /// Upserts one answer. Called on every edit.
    pub async fn save_answer(
        &self,
        assignment_id: i64,
        question_id: i64,
        answer_text: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO answers (assignment_id, question_id, answer_text, saved_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (assignment_id, question_id) DO UPDATE
            SET answer_text = excluded.answer_text,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(assignment_id)
        .bind(question_id)
        .bind(answer_text)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the saved answers for an attempt in question order.
    pub async fn get_answers(&self, assignment_id: i64) -> Result<Vec<CachedAnswer>, AppError> {
        let answers = sqlx::query_as::<_, CachedAnswer>(
            "SELECT * FROM answers WHERE assignment_id = ? ORDER BY question_id ASC",
        )
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    /// Drops the package and answers for a finished attempt. Called only
    /// after the server acknowledged the submission.
    pub async fn clear_attempt(
        &self,
        session_id: i64,
        assignment_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM packages WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM answers WHERE assignment_id = ?")
            .bind(assignment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
