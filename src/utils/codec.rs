// src/utils/codec.rs

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::exam::{Exam, Question, QuestionType},
};

/// Exam metadata carried inside an offline package.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageExam {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub total_marks: i64,
}

/// One question as shipped to the client. The answer key has no field here,
/// so it cannot leak regardless of how the package is decrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageQuestion {
    pub id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub marks: i64,
    pub order_index: i64,
}

/// The plaintext payload of an offline exam package.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPackage {
    pub assignment_id: i64,
    pub session_token: String,
    pub exam: PackageExam,
    pub questions: Vec<PackageQuestion>,
}

impl ExamPackage {
    /// Builds a package from database rows, stripping answer keys.
    pub fn build(
        assignment_id: i64,
        session_token: String,
        exam: &Exam,
        questions: &[Question],
    ) -> Self {
        ExamPackage {
            assignment_id,
            session_token,
            exam: PackageExam {
                id: exam.id,
                title: exam.title.clone(),
                description: exam.description.clone(),
                duration_minutes: exam.duration_minutes,
                total_marks: exam.total_marks,
            },
            questions: questions
                .iter()
                .map(|q| PackageQuestion {
                    id: q.id,
                    question_text: q.question_text.clone(),
                    question_type: q.question_type,
                    options: q.options.0.clone(),
                    marks: q.marks,
                    order_index: q.order_index,
                })
                .collect(),
        }
    }
}

/// Generates a fresh 256-bit package key. Each download gets its own key.
pub fn generate_key() -> [u8; 32] {
    let key = Aes256Gcm::generate_key(&mut OsRng);
    key.into()
}

/// Encrypts a package with AES-256-GCM.
///
/// Output layout is base64(nonce || ciphertext) with a random 12-byte nonce,
/// so the whole thing travels as a single opaque string.
pub fn encode(package: &ExamPackage, key: &[u8; 32]) -> Result<String, AppError> {
    let plaintext = serde_json::to_vec(package)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_ref())
        .map_err(|_| AppError::InternalServerError("Package encryption failed".to_string()))?;

    let mut out = Vec::with_capacity(nonce.len() + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

/// Decrypts a package produced by [`encode`].
///
/// Fails on a wrong key, a truncated blob, or any tampering with the
/// ciphertext (GCM authentication).
pub fn decode(encoded: &str, key: &[u8; 32]) -> Result<ExamPackage, AppError> {
    let raw = STANDARD
        .decode(encoded)
        .map_err(|_| AppError::BadRequest("Malformed exam package".to_string()))?;

    if raw.len() < 12 {
        return Err(AppError::BadRequest("Malformed exam package".to_string()));
    }
    let (nonce, ciphertext) = raw.split_at(12);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| AppError::BadRequest("Package decryption failed".to_string()))?;

    Ok(serde_json::from_slice(&plaintext)?)
}
