use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;

use super::{ensure_owner, owner_scope};
use crate::dto::activation_dto::{ActivationQuery, CreateActivationPayload, SetActivePayload};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::models::activation::ActivationFilter;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_activation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateActivationPayload>,
) -> Result<Response> {
    let quiz = state.quiz_service.get(payload.quiz_id).await?;
    ensure_owner(&claims, &quiz.created_by)?;
    let activation = state
        .activation_service
        .create(payload, &claims.sub)
        .await?;
    Ok((StatusCode::CREATED, Json(activation)).into_response())
}

#[axum::debug_handler]
pub async fn list_activations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ActivationQuery>,
) -> Result<Response> {
    let assigned_by = if query.mine.unwrap_or(false) {
        Some(claims.sub.clone())
    } else {
        owner_scope(&claims)
    };
    let filter = ActivationFilter {
        department: query.department,
        division: query.division,
        assigned_by,
    };
    let activations = state.activation_service.list(&filter).await?;
    Ok(Json(activations).into_response())
}

#[axum::debug_handler]
pub async fn set_active(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActivePayload>,
) -> Result<Response> {
    let activation = state.activation_service.get(id).await?;
    ensure_owner(&claims, &activation.assigned_by)?;
    let updated = state
        .activation_service
        .set_active(id, payload.is_active)
        .await?;
    Ok(Json(updated).into_response())
}

#[axum::debug_handler]
pub async fn delete_activation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let activation = state.activation_service.get(id).await?;
    ensure_owner(&claims, &activation.assigned_by)?;
    state.activation_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
