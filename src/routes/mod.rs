pub mod activations;
pub mod health;
pub mod quizzes;
pub mod results;
pub mod sessions;
pub mod violations;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::middleware::{auth, cors, rate_limit};
use crate::middleware::auth::Claims;
use crate::AppState;

pub fn app_router(state: AppState, config: &Config) -> Router {
    let staff_api = Router::new()
        .route(
            "/api/quizzes",
            get(quizzes::list_quizzes).post(quizzes::create_quiz),
        )
        .route(
            "/api/quizzes/:id",
            get(quizzes::get_quiz).delete(quizzes::delete_quiz),
        )
        .route(
            "/api/activations",
            get(activations::list_activations).post(activations::create_activation),
        )
        .route(
            "/api/activations/:id",
            patch(activations::set_active).delete(activations::delete_activation),
        )
        .route("/api/results", get(results::list_results))
        .route("/api/results/prune", delete(results::prune_results))
        .route(
            "/api/violations",
            get(violations::list_violations).delete(violations::delete_all_violations),
        )
        .route("/api/violations/summary", get(violations::violation_summary))
        .route("/api/violations/:id", delete(violations::delete_violation))
        .route_layer(axum::middleware::from_fn(auth::require_staff));

    let student_api = Router::new()
        .route("/api/student/tests", get(sessions::available_tests))
        .route(
            "/api/student/tests/:activation_id/start",
            post(sessions::start_session),
        )
        .route("/api/sessions/:id", get(sessions::session_status))
        .route("/api/sessions/:id/confirm", post(sessions::confirm_session))
        .route("/api/sessions/:id/cancel", post(sessions::cancel_session))
        .route("/api/sessions/:id/answers", put(sessions::select_answer))
        .route("/api/sessions/:id/visibility", post(sessions::report_visibility))
        .route("/api/sessions/:id/heartbeat", post(sessions::heartbeat))
        .route("/api/sessions/:id/submit", post(sessions::submit_session))
        .route("/api/sessions/:id/retry", post(sessions::retry_submission))
        .route_layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(config.student_rps),
            rate_limit::rps_middleware,
        ))
        .route_layer(axum::middleware::from_fn(auth::require_student));

    Router::new()
        .route("/health", get(health::health))
        .merge(staff_api)
        .merge(student_api)
        .with_state(state)
        .layer(cors::cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Teachers only see what they authored; admins see everything.
pub(crate) fn owner_scope(claims: &Claims) -> Option<String> {
    if claims.is_admin() {
        None
    } else {
        Some(claims.sub.clone())
    }
}

pub(crate) fn ensure_owner(claims: &Claims, owner: &str) -> Result<()> {
    if claims.is_admin() || claims.sub == owner {
        Ok(())
    } else {
        Err(Error::Forbidden(
            "Only the authoring teacher or an admin can do this".to_string(),
        ))
    }
}
