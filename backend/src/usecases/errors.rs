use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("webhook signature verification failed")]
    Authentication,
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Dependency(#[from] anyhow::Error),
}

impl BillingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::Authentication | BillingError::Validation(_) => StatusCode::BAD_REQUEST,
            BillingError::NotFound(_) => StatusCode::NOT_FOUND,
            BillingError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to callers.
    pub fn client_message(&self) -> String {
        match self {
            BillingError::Dependency(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

pub type BillingResult<T> = std::result::Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            BillingError::Authentication.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BillingError::Validation("price_id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BillingError::NotFound("subscription".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BillingError::from(anyhow::anyhow!("db down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn dependency_details_are_not_leaked() {
        let err = BillingError::from(anyhow::anyhow!("password authentication failed"));
        assert_eq!(err.client_message(), "Internal server error");

        let err = BillingError::Validation("missing price_id".into());
        assert_eq!(err.client_message(), "invalid request: missing price_id");
    }
}
