use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};

use super::owner_scope;
use crate::dto::result_dto::{PruneQuery, PruneResponse, ResultQuery, ResultView};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::quiz::QuizFilter;
use crate::models::quiz_result::ResultFilter;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ResultQuery>,
) -> Result<Response> {
    let quiz_ids = match owner_scope(&claims) {
        None => query.quiz_id.map(|id| vec![id]),
        Some(owner) => {
            let own = state
                .quiz_service
                .list(&QuizFilter {
                    created_by: Some(owner),
                    ..QuizFilter::default()
                })
                .await?;
            Some(
                own.into_iter()
                    .map(|q| q.id)
                    .filter(|id| query.quiz_id.map_or(true, |wanted| wanted == *id))
                    .collect(),
            )
        }
    };
    let filter = ResultFilter {
        department: query.department,
        division: query.division,
        college_year: query.college_year,
        semester: query.semester,
        quiz_ids,
    };
    let results: Vec<ResultView> = state
        .result_service
        .list(&filter)
        .await?
        .into_iter()
        .map(ResultView::from)
        .collect();
    Ok(Json(results).into_response())
}

#[axum::debug_handler]
pub async fn prune_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PruneQuery>,
) -> Result<Response> {
    let months = query
        .months
        .ok_or_else(|| Error::BadRequest("Query parameter 'months' is required".to_string()))?;
    let deleted = state.result_service.prune_older_than(months).await?;
    tracing::info!(sub = %claims.sub, months, deleted, "Result prune requested");
    Ok(Json(PruneResponse { deleted }).into_response())
}
