use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Metrics store error: {0}")]
    Metrics(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error(transparent)]
    Recommendation(#[from] RecommendationError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Reasons a recommendation request can come back empty-handed
///
/// Each variant carries its own user-facing message; they are reported in the
/// order the ranker checks them.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecommendationError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No favorites saved yet")]
    NoFavorites,

    #[error("Could not determine favorite category")]
    NoFavoriteCategory,

    #[error("No recommendations for category {0}")]
    NoRecommendations(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Recommendation(ref reason) => match reason {
                RecommendationError::UserNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
                _ => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            },
            AppError::Database(_) | AppError::Metrics(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_messages_are_distinct() {
        let messages = [
            RecommendationError::UserNotFound("ana".to_string()).to_string(),
            RecommendationError::NoFavorites.to_string(),
            RecommendationError::NoFavoriteCategory.to_string(),
            RecommendationError::NoRecommendations("Italian".to_string()).to_string(),
        ];

        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert_eq!(messages[3], "No recommendations for category Italian");
    }

    #[test]
    fn test_status_mapping() {
        let not_found: AppError = RecommendationError::UserNotFound("ana".to_string()).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let no_favorites: AppError = RecommendationError::NoFavorites.into();
        assert_eq!(
            no_favorites.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let upstream = AppError::ExternalApi("catalog down".to_string());
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
