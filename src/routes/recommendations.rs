use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::{
    error::AppResult, middleware::request_id::RequestId, routes::AppState,
    services::Recommendation,
};

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(username): Path<String>,
) -> AppResult<Json<Recommendation>> {
    tracing::info!(
        request_id = %request_id,
        username = %username,
        "Processing recommendation request"
    );

    let recommendation = state.ranker.recommend(&username).await?;
    Ok(Json(recommendation))
}
