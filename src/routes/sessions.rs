use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;

use crate::dto::session_dto::{
    SelectAnswerPayload, StartKind, StartResponse, SubmitPayload, SubmitResponse,
    VisibilityPayload, VisibilityResponse, VisibilityVerdict,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::services::session_service::{StartOutcome, VisibilityOutcome};
use crate::AppState;

#[axum::debug_handler]
pub async fn available_tests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let tests = state.session_service.available_tests(&claims.sub).await?;
    Ok(Json(tests).into_response())
}

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(activation_id): Path<Uuid>,
) -> Result<Response> {
    match state
        .session_service
        .start(&claims.sub, activation_id)
        .await?
    {
        StartOutcome::Created(session) => Ok((
            StatusCode::CREATED,
            Json(StartResponse {
                kind: StartKind::Created,
                session,
            }),
        )
            .into_response()),
        StartOutcome::Resumed(session) => Ok(Json(StartResponse {
            kind: StartKind::Resumed,
            session,
        })
        .into_response()),
        StartOutcome::AlreadyAttempted { score, total } => {
            Err(Error::AlreadyAttempted { score, total })
        }
    }
}

#[axum::debug_handler]
pub async fn session_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let view = state.session_service.status(id, &claims.sub).await?;
    Ok(Json(view).into_response())
}

#[axum::debug_handler]
pub async fn confirm_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let view = state.session_service.confirm(id, &claims.sub).await?;
    Ok(Json(view).into_response())
}

#[axum::debug_handler]
pub async fn cancel_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    state.session_service.cancel(id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[axum::debug_handler]
pub async fn select_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectAnswerPayload>,
) -> Result<Response> {
    let view = state
        .session_service
        .select_answer(id, &claims.sub, payload.question_id, payload.option)
        .await?;
    Ok(Json(view).into_response())
}

#[axum::debug_handler]
pub async fn report_visibility(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VisibilityPayload>,
) -> Result<Response> {
    let (verdict, session) = match state
        .session_service
        .visibility(id, &claims.sub, payload.state)
        .await?
    {
        VisibilityOutcome::Visible(v) => (VisibilityVerdict::Visible, v),
        VisibilityOutcome::Warned(v) => (VisibilityVerdict::Warned, v),
        VisibilityOutcome::AutoSubmitted(v) => (VisibilityVerdict::AutoSubmitted, v),
        VisibilityOutcome::Ignored(v) => (VisibilityVerdict::Ignored, v),
    };
    Ok(Json(VisibilityResponse { verdict, session }).into_response())
}

#[axum::debug_handler]
pub async fn heartbeat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let view = state.session_service.heartbeat(id, &claims.sub).await?;
    Ok(Json(view).into_response())
}

#[axum::debug_handler]
pub async fn submit_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitPayload>,
) -> Result<Response> {
    let outcome = state
        .session_service
        .submit(id, &claims.sub, payload.confirmed)
        .await?;
    Ok(Json(SubmitResponse { outcome }).into_response())
}

#[axum::debug_handler]
pub async fn retry_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let outcome = state.session_service.retry(id, &claims.sub).await?;
    Ok(Json(SubmitResponse { outcome }).into_response())
}
