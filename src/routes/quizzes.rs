use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;

use super::{ensure_owner, owner_scope};
use crate::dto::quiz_dto::{CreateQuizPayload, QuizQuery};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::models::quiz::QuizFilter;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizPayload>,
) -> Result<Response> {
    let quiz = state.quiz_service.create(payload, &claims.sub).await?;
    Ok((StatusCode::CREATED, Json(quiz)).into_response())
}

#[axum::debug_handler]
pub async fn list_quizzes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<QuizQuery>,
) -> Result<Response> {
    let created_by = if query.mine.unwrap_or(false) {
        Some(claims.sub.clone())
    } else {
        owner_scope(&claims)
    };
    let filter = QuizFilter {
        created_by,
        college_year: query.college_year,
        semester: query.semester,
    };
    let quizzes = state.quiz_service.list(&filter).await?;
    Ok(Json(quizzes).into_response())
}

#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let quiz = state.quiz_service.get(id).await?;
    ensure_owner(&claims, &quiz.created_by)?;
    Ok(Json(quiz).into_response())
}

#[axum::debug_handler]
pub async fn delete_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let quiz = state.quiz_service.get(id).await?;
    ensure_owner(&claims, &quiz.created_by)?;
    state.quiz_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
