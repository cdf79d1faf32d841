// tests/api_tests.rs

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{Duration, Utc};
use examshield::{config::Config, routes, state::AppState, utils::codec, utils::hash};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

struct TestApp {
    address: String,
    pool: SqlitePool,
}

/// Spawns the app on a random port backed by an in-memory database.
/// The returned pool is the same one the server uses, so tests can seed
/// data directly.
async fn spawn_app() -> TestApp {
    // A single connection keeps the in-memory database alive and shared.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        submit_grace_minutes: 30,
        admin_email: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, pool }
}

/// Registers a fresh student through the API and returns (token, user_id).
async fn register_student(app: &TestApp, client: &reqwest::Client) -> (String, i64) {
    let email = format!("s_{}@test.edu", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "email": email,
            "name": "Test Student",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    let token = body["token"].as_str().expect("Token not found").to_string();
    let user_id = body["user"]["id"].as_i64().expect("User id not found");
    (token, user_id)
}

/// Seeds an admin directly and logs in through the API.
async fn login_admin(app: &TestApp, client: &reqwest::Client) -> String {
    let email = format!("a_{}@test.edu", &uuid::Uuid::new_v4().to_string()[..8]);
    let hashed = hash::hash_password("adminpass123").unwrap();
    sqlx::query("INSERT INTO users (email, name, password, role) VALUES (?, 'Admin', ?, 'admin')")
        .bind(&email)
        .bind(&hashed)
        .execute(&app.pool)
        .await
        .unwrap();

    let body: serde_json::Value = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "email": email, "password": "adminpass123" }))
        .send()
        .await
        .expect("Admin login failed")
        .json()
        .await
        .unwrap();
    body["token"].as_str().expect("Token not found").to_string()
}

/// Seeds an exam worth 20 marks with two 10-mark MCQ questions.
async fn seed_exam(pool: &SqlitePool) -> i64 {
    let exam_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO exams (title, description, duration_minutes, total_marks, passing_marks, is_active)
        VALUES ('Geography Basics', 'Two questions', 60, 20, 10, 1)
        RETURNING id
        "#,
    )
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        INSERT INTO questions (exam_id, question_text, question_type, options, correct_answer, marks, order_index)
        VALUES (?, 'Capital of France?', 'mcq', '["Paris","London","Rome"]', 'Paris', 10, 0),
               (?, 'Capital of Italy?', 'mcq', '["Paris","London","Rome"]', 'Rome', 10, 1)
        "#,
    )
    .bind(exam_id)
    .bind(exam_id)
    .execute(pool)
    .await
    .unwrap();

    exam_id
}

/// Seeds an active session for the exam and assigns the student to it.
/// Returns (session_id, assignment_id).
async fn seed_session(
    pool: &SqlitePool,
    exam_id: i64,
    student_id: i64,
    start_offset_minutes: i64,
    end_offset_minutes: i64,
) -> (i64, i64) {
    let now = Utc::now();
    let session_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO exam_sessions (exam_id, session_name, start_time, end_time, mode, is_active)
        VALUES (?, 'Morning Batch', ?, ?, 'online', 1)
        RETURNING id
        "#,
    )
    .bind(exam_id)
    .bind(now + Duration::minutes(start_offset_minutes))
    .bind(now + Duration::minutes(end_offset_minutes))
    .fetch_one(pool)
    .await
    .unwrap();

    let assignment_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO assignments (session_id, student_id) VALUES (?, ?) RETURNING id",
    )
    .bind(session_id)
    .bind(student_id)
    .fetch_one(pool)
    .await
    .unwrap();

    (session_id, assignment_id)
}

/// Downloads and decrypts the package, returning (package, raw response).
async fn download_package(
    app: &TestApp,
    client: &reqwest::Client,
    token: &str,
    session_id: i64,
) -> (codec::ExamPackage, serde_json::Value) {
    let response = client
        .get(format!(
            "{}/api/student/exams/{}/download",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Download failed");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let key_bytes = STANDARD
        .decode(body["packageKey"].as_str().unwrap())
        .unwrap();
    let key: [u8; 32] = key_bytes.try_into().unwrap();
    let package = codec::decode(body["encryptedExam"].as_str().unwrap(), &key).unwrap();
    (package, body)
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "email": "not-an-email",
            "name": "X",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let payload = serde_json::json!({
        "email": "dup@test.edu",
        "name": "First",
        "password": "password123"
    });
    let first = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    register_student(&app, &client).await;

    let response = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({
            "email": "nobody@test.edu",
            "password": "wrongpassword"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn student_routes_require_a_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/student/exams/assigned", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_routes_reject_student_tokens() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_student(&app, &client).await;

    let response = client
        .get(format!("{}/api/admin/exams", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn full_exam_flow_scores_and_gates_the_key() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, student_id) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    let (session_id, assignment_id) = seed_session(&app.pool, exam_id, student_id, -60, 60).await;

    // Download: decrypted package lists the questions but no answer key.
    let (package, _) = download_package(&app, &client, &token, session_id).await;
    assert_eq!(package.assignment_id, assignment_id);
    assert_eq!(package.questions.len(), 2);
    assert_eq!(package.exam.total_marks, 20);

    // Start with the token carried inside the package.
    let start_resp = client
        .post(format!(
            "{}/api/student/exams/{}/start",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "sessionToken": package.session_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(start_resp.status().as_u16(), 200);

    // Submit: one exact answer, one with odd casing and whitespace.
    let q1 = package.questions[0].id;
    let q2 = package.questions[1].id;
    let submit_resp = client
        .post(format!(
            "{}/api/student/exams/{}/submit",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "sessionToken": package.session_token,
            "answers": [
                { "questionId": q1, "answerText": "Paris" },
                { "questionId": q2, "answerText": "  rOmE " }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(submit_resp.status().as_u16(), 200);
    let submit_body: serde_json::Value = submit_resp.json().await.unwrap();
    assert_eq!(submit_body["score"], 20);
    assert_eq!(submit_body["autoSubmitted"], false);

    // Result: score visible, per-question breakdown withheld while the
    // session window is still open.
    let result: serde_json::Value = client
        .get(format!(
            "{}/api/student/exams/{}/result",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["score"], 20);
    assert_eq!(result["result"], "Pass");
    assert_eq!(result["examHasEnded"], false);
    assert!(result["answers"].is_null());
}

#[tokio::test]
async fn encrypted_package_does_not_leak_the_answer_key() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, student_id) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    let (session_id, _) = seed_session(&app.pool, exam_id, student_id, -60, 60).await;

    let (package, _) = download_package(&app, &client, &token, session_id).await;
    let plaintext = serde_json::to_string(&package).unwrap();
    assert!(!plaintext.contains("correctAnswer"));
    assert!(!plaintext.contains("correct_answer"));
}

#[tokio::test]
async fn double_submit_is_rejected_and_score_is_kept() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, student_id) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    let (session_id, assignment_id) = seed_session(&app.pool, exam_id, student_id, -60, 60).await;

    let (package, _) = download_package(&app, &client, &token, session_id).await;
    let q1 = package.questions[0].id;

    let first = client
        .post(format!(
            "{}/api/student/exams/{}/submit",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "sessionToken": package.session_token,
            "answers": [{ "questionId": q1, "answerText": "Paris" }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 200);

    let second = client
        .post(format!(
            "{}/api/student/exams/{}/submit",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "sessionToken": package.session_token,
            "answers": [{ "questionId": q1, "answerText": "London" }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 403);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["error"], "Exam already submitted");

    let score = sqlx::query_scalar::<_, i64>("SELECT score FROM assignments WHERE id = ?")
        .bind(assignment_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(score, 10);
}

#[tokio::test]
async fn stale_token_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, student_id) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    let (session_id, _) = seed_session(&app.pool, exam_id, student_id, -60, 60).await;

    let (first_package, _) = download_package(&app, &client, &token, session_id).await;
    // A second download rotates the token, killing the first package.
    let (second_package, _) = download_package(&app, &client, &token, session_id).await;
    assert_ne!(first_package.session_token, second_package.session_token);

    let start_resp = client
        .post(format!(
            "{}/api/student/exams/{}/start",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "sessionToken": first_package.session_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(start_resp.status().as_u16(), 403);
    let body: serde_json::Value = start_resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid session token");
}

#[tokio::test]
async fn redownload_archives_the_previous_attempt() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, student_id) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    let (session_id, assignment_id) = seed_session(&app.pool, exam_id, student_id, -60, 60).await;

    let (package, _) = download_package(&app, &client, &token, session_id).await;
    let q1 = package.questions[0].id;
    client
        .post(format!(
            "{}/api/student/exams/{}/submit",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "sessionToken": package.session_token,
            "answers": [{ "questionId": q1, "answerText": "Paris" }]
        }))
        .send()
        .await
        .unwrap();

    // Retake: the finished attempt moves into the archive and the row
    // resets to a fresh pending attempt.
    let (retake_package, _) = download_package(&app, &client, &token, session_id).await;
    assert_ne!(retake_package.session_token, package.session_token);

    let row: (String, i64, String) = sqlx::query_as(
        "SELECT status, score, previous_attempts FROM assignments WHERE id = ?",
    )
    .bind(assignment_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(row.0, "pending");
    assert_eq!(row.1, 0);

    let archive: serde_json::Value = serde_json::from_str(&row.2).unwrap();
    assert_eq!(archive.as_array().unwrap().len(), 1);
    assert_eq!(archive[0]["score"], 10);
    assert_eq!(archive[0]["status"], "submitted");

    // The new attempt is fully usable.
    let submit_resp = client
        .post(format!(
            "{}/api/student/exams/{}/submit",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "sessionToken": retake_package.session_token,
            "answers": [
                { "questionId": retake_package.questions[0].id, "answerText": "Paris" },
                { "questionId": retake_package.questions[1].id, "answerText": "Rome" }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(submit_resp.status().as_u16(), 200);
    let body: serde_json::Value = submit_resp.json().await.unwrap();
    assert_eq!(body["score"], 20);
}

#[tokio::test]
async fn answer_key_is_revealed_after_the_session_ends() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, student_id) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    // Window already closed, but still inside the grace period.
    let (session_id, _) = seed_session(&app.pool, exam_id, student_id, -120, -5).await;

    // Activation gates downloads only; this client already holds a token.
    let session_token = "held-through-outage-token";
    sqlx::query("UPDATE assignments SET session_token = ? WHERE session_id = ?")
        .bind(session_token)
        .bind(session_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let q1 = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM questions WHERE exam_id = ? ORDER BY order_index LIMIT 1",
    )
    .bind(exam_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();

    let submit_resp = client
        .post(format!(
            "{}/api/student/exams/{}/submit",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "sessionToken": session_token,
            "answers": [{ "questionId": q1, "answerText": "London" }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(submit_resp.status().as_u16(), 200);

    let result: serde_json::Value = client
        .get(format!(
            "{}/api/student/exams/{}/result",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["examHasEnded"], true);
    let answers = result["answers"].as_array().expect("answers not revealed");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0]["correctAnswer"], "Paris");
    assert_eq!(answers[0]["isCorrect"], false);
}

#[tokio::test]
async fn submission_window_closes_after_the_grace_period() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, student_id) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    // Ended two hours ago, far past the 30 minute grace window.
    let (session_id, assignment_id) = seed_session(&app.pool, exam_id, student_id, -240, -120).await;

    sqlx::query("UPDATE assignments SET session_token = 'tok-late' WHERE id = ?")
        .bind(assignment_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let response = client
        .post(format!(
            "{}/api/student/exams/{}/submit",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "sessionToken": "tok-late",
            "answers": []
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Submission window has closed");
}

#[tokio::test]
async fn inactive_session_refuses_downloads() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, student_id) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    let (session_id, _) = seed_session(&app.pool, exam_id, student_id, -60, 60).await;

    sqlx::query("UPDATE exam_sessions SET is_active = 0 WHERE id = ?")
        .bind(session_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let response = client
        .get(format!(
            "{}/api/student/exams/{}/download",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn unassigned_student_cannot_download() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (assigned_token, assigned_id) = register_student(&app, &client).await;
    let (other_token, _) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    let (session_id, _) = seed_session(&app.pool, exam_id, assigned_id, -60, 60).await;

    let ok = client
        .get(format!(
            "{}/api/student/exams/{}/download",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", assigned_token))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status().as_u16(), 200);

    let denied = client
        .get(format!(
            "{}/api/student/exams/{}/download",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", other_token))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status().as_u16(), 403);
}

#[tokio::test]
async fn auto_submitted_flag_is_recorded() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, student_id) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    let (session_id, assignment_id) = seed_session(&app.pool, exam_id, student_id, -60, 60).await;

    let (package, _) = download_package(&app, &client, &token, session_id).await;
    let response = client
        .post(format!(
            "{}/api/student/exams/{}/submit",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "sessionToken": package.session_token,
            "answers": [],
            "autoSubmitted": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["autoSubmitted"], true);

    let stored = sqlx::query_scalar::<_, bool>(
        "SELECT auto_submitted FROM assignments WHERE id = ?",
    )
    .bind(assignment_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert!(stored);
}

#[tokio::test]
async fn assigned_listing_tracks_the_attempt() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, student_id) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    let (session_id, _) = seed_session(&app.pool, exam_id, student_id, -60, 60).await;

    let listing: serde_json::Value = client
        .get(format!("{}/api/student/exams/assigned", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = listing.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["sessionId"].as_i64().unwrap(), session_id);
    assert_eq!(entries[0]["status"], "pending");
    assert_eq!(entries[0]["examTitle"], "Geography Basics");
}

#[tokio::test]
async fn admin_can_schedule_and_monitor_a_session() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login_admin(&app, &client).await;
    let (_, _student_id) = register_student(&app, &client).await;

    // Create the exam through the API.
    let exam: serde_json::Value = client
        .post(format!("{}/api/admin/exams", app.address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "title": "Unit Test Exam",
            "durationMinutes": 45,
            "totalMarks": 10,
            "passingMarks": 5
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let exam_id = exam["id"].as_i64().unwrap();

    let question_resp = client
        .post(format!("{}/api/admin/exams/{}/questions", app.address, exam_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "questionText": "2 + 2?",
            "questionType": "mcq",
            "options": ["3", "4"],
            "correctAnswer": "4",
            "marks": 10
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(question_resp.status().as_u16(), 201);

    // Schedule without studentIds: every student gets an assignment.
    let now = Utc::now();
    let session_resp = client
        .post(format!("{}/api/admin/sessions", app.address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "examId": exam_id,
            "sessionName": "Lab A",
            "startTime": now,
            "endTime": now + Duration::hours(2),
            "mode": "offline",
            "labName": "Lab A"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(session_resp.status().as_u16(), 201);
    let session_body: serde_json::Value = session_resp.json().await.unwrap();
    let session_id = session_body["session"]["id"].as_i64().unwrap();
    assert_eq!(session_body["assignedStudents"], 1);

    // The listing carries the roster counts.
    let sessions: serde_json::Value = client
        .get(format!("{}/api/admin/sessions", app.address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let summary = &sessions.as_array().unwrap()[0];
    assert_eq!(summary["totalStudents"], 1);
    assert_eq!(summary["submittedCount"], 0);

    // Nobody has downloaded yet: the dashboard shows everyone offline.
    let live: serde_json::Value = client
        .get(format!(
            "{}/api/admin/sessions/{}/live-status",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = live.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["displayStatus"], "offline");
    assert_eq!(entries[0]["answeredCount"], 0);
    assert_eq!(entries[0]["totalQuestions"], 1);

    // And the results roster shows a not-attempted row.
    let results: serde_json::Value = client
        .get(format!(
            "{}/api/admin/sessions/{}/results",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(results.as_array().unwrap()[0]["result"], "Not Attempted");
}

#[tokio::test]
async fn live_status_reflects_progress_and_submission() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login_admin(&app, &client).await;
    let (token, student_id) = register_student(&app, &client).await;
    let exam_id = seed_exam(&app.pool).await;
    let (session_id, _) = seed_session(&app.pool, exam_id, student_id, -60, 60).await;

    let (package, _) = download_package(&app, &client, &token, session_id).await;
    client
        .post(format!(
            "{}/api/student/exams/{}/start",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "sessionToken": package.session_token }))
        .send()
        .await
        .unwrap();

    let live: serde_json::Value = client
        .get(format!(
            "{}/api/admin/sessions/{}/live-status",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(live.as_array().unwrap()[0]["displayStatus"], "online");

    client
        .post(format!(
            "{}/api/student/exams/{}/submit",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "sessionToken": package.session_token,
            "answers": [{ "questionId": package.questions[0].id, "answerText": "Paris" }]
        }))
        .send()
        .await
        .unwrap();

    let live: serde_json::Value = client
        .get(format!(
            "{}/api/admin/sessions/{}/live-status",
            app.address, session_id
        ))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entry = &live.as_array().unwrap()[0];
    assert_eq!(entry["displayStatus"], "completed");
    assert_eq!(entry["answeredCount"], 1);
    assert_eq!(entry["score"], 10);
}
