use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;

use super::owner_scope;
use crate::dto::violation_dto::{DeleteAllQuery, DeletedResponse, ViolationQuery};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::quiz::QuizFilter;
use crate::models::violation::ViolationFilter;
use crate::AppState;

/// Titles of the caller's own quizzes, or `None` for admins.
async fn own_titles(state: &AppState, claims: &Claims) -> Result<Option<HashSet<String>>> {
    let Some(owner) = owner_scope(claims) else {
        return Ok(None);
    };
    let quizzes = state
        .quiz_service
        .list(&QuizFilter {
            created_by: Some(owner),
            ..QuizFilter::default()
        })
        .await?;
    Ok(Some(quizzes.into_iter().map(|q| q.title).collect()))
}

#[axum::debug_handler]
pub async fn list_violations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ViolationQuery>,
) -> Result<Response> {
    let filter = ViolationFilter {
        test_name: query.test_name,
        quiz_id: query.quiz_id,
    };
    let mut records = state.violation_service.list(&filter).await?;
    if let Some(titles) = own_titles(&state, &claims).await? {
        records.retain(|r| titles.contains(&r.test_name));
    }
    Ok(Json(records).into_response())
}

#[axum::debug_handler]
pub async fn violation_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let mut summary = state.violation_service.summary().await?;
    if let Some(titles) = own_titles(&state, &claims).await? {
        summary.retain(|s| titles.contains(&s.test_name));
    }
    Ok(Json(summary).into_response())
}

#[axum::debug_handler]
pub async fn delete_violation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    state.violation_service.delete_one(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[axum::debug_handler]
pub async fn delete_all_violations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<DeleteAllQuery>,
) -> Result<Response> {
    if !query.confirm.unwrap_or(false) {
        return Err(Error::BadRequest(
            "Deleting every violation requires confirm=true".to_string(),
        ));
    }
    let deleted = state.violation_service.delete_all().await?;
    tracing::warn!(sub = %claims.sub, deleted, "All violations deleted");
    Ok(Json(DeletedResponse { deleted }).into_response())
}
