use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::usecases::errors::BillingError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for BillingError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let BillingError::Dependency(err) = &self {
            // Don't leak internal error detail to client
            error!(error = ?err, "http: request failed on a dependency");
        }

        let body = Json(ErrorResponse {
            error: self.client_message(),
        });

        (status, body).into_response()
    }
}
