use service_core::error::AppError;

use crate::services::StoreError;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound(err.into()),
            StoreError::DuplicateKey { .. } => AppError::Conflict(err.into()),
            StoreError::VersionConflict { .. } => AppError::Conflict(err.into()),
            StoreError::Unclassified(source) => AppError::DatabaseError(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};

    fn status(err: StoreError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn every_store_outcome_has_a_status() {
        assert_eq!(status(StoreError::not_found("comments", "k")), StatusCode::NOT_FOUND);
        assert_eq!(
            status(StoreError::duplicate_key("comments", "k")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(StoreError::version_conflict("comments", "k", "_r")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(StoreError::Unclassified(anyhow::anyhow!("socket closed"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
