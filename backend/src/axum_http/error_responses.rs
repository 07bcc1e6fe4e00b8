use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::usecases::payments::{PaymentError, TRY_AGAIN_LATER};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
    pub res: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service: String,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("route not found")]
    RouteNotFound,

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    fn body(&self) -> ErrorBody {
        match self {
            AppError::BadRequest(detail) => ErrorBody {
                status: StatusCode::BAD_REQUEST.as_u16(),
                message: "Bad Request".to_string(),
                res: "Validation Error".to_string(),
                service: String::new(),
                error: detail.clone(),
            },
            AppError::RouteNotFound => ErrorBody {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: "Not Found".to_string(),
                res: TRY_AGAIN_LATER.to_string(),
                service: String::new(),
                error: self.to_string(),
            },
            AppError::Payment(err) => ErrorBody {
                status: err.status_code().as_u16(),
                message: err.message().to_string(),
                res: err.hint().to_string(),
                service: err.service().to_string(),
                // Display stops at the variant; wrapped sources stay in the logs.
                error: err.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = self.body();
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(ErrorEnvelope { error: body })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use paycore::domain::errors::LedgerError;

    use super::*;

    #[test]
    fn internal_errors_hide_their_cause() {
        let err = AppError::from(PaymentError::from(LedgerError::Persistence(anyhow::anyhow!(
            "duplicate key value violates unique constraint \"payment_intents_pkey\""
        ))));

        let body = err.body();

        assert_eq!(body.status, 500);
        assert_eq!(body.message, "Internal Server Error");
        assert_eq!(body.res, "try again later");
        assert_eq!(body.service, "payment_repo");
        assert_eq!(body.error, "ledger write failed");
    }

    #[test]
    fn not_found_carries_the_hint() {
        let err = AppError::from(PaymentError::from(LedgerError::not_found("pi_x")));

        let body = err.body();

        assert_eq!(body.status, 404);
        assert_eq!(body.message, "payment intent not found");
        assert_eq!(body.res, "provide valid intent id");
        assert_eq!(body.error, "payment intent pi_x not found");
    }
}
