// src/routes.rs

use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, exam_admin, session_admin, student},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Builds the full application router.
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let student_routes = Router::new()
        .route("/profile", get(auth::get_profile).put(auth::update_profile))
        .route("/exams/assigned", get(student::list_assigned))
        .route("/exams/{session_id}/download", get(student::download_exam))
        .route("/exams/{session_id}/start", post(student::start_exam))
        .route("/exams/{session_id}/submit", post(student::submit_exam))
        .route("/exams/{session_id}/result", get(student::exam_result))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/exams", post(exam_admin::create_exam).get(exam_admin::list_exams))
        .route(
            "/exams/{id}",
            get(exam_admin::get_exam)
                .put(exam_admin::update_exam)
                .delete(exam_admin::delete_exam),
        )
        .route("/exams/{id}/questions", post(exam_admin::add_question))
        .route(
            "/questions/{id}",
            put(exam_admin::update_question).delete(exam_admin::delete_question),
        )
        .route(
            "/sessions",
            post(session_admin::create_session).get(session_admin::list_sessions),
        )
        .route(
            "/sessions/{id}",
            get(session_admin::get_session)
                .put(session_admin::update_session)
                .delete(session_admin::delete_session),
        )
        .route("/sessions/{id}/toggle", patch(session_admin::toggle_session))
        .route("/sessions/{id}/live-status", get(session_admin::live_status))
        .route("/sessions/{id}/results", get(session_admin::session_results))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/student", student_routes)
        .nest("/api/admin", admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
