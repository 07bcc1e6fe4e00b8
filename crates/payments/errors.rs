use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Provider error codes the service reacts to.
pub mod codes {
    pub const INVALID_PARAMETER: &str = "payment_intent_invalid_parameter";
    pub const AMOUNT_TOO_SMALL: &str = "amount_too_small";
    pub const ALREADY_CAPTURED: &str = "charge_already_captured";
    pub const UNEXPECTED_STATE: &str = "payment_intent_unexpected_state";
    pub const ALREADY_REFUNDED: &str = "charge_already_refunded";
}

pub mod operations {
    pub const CREATE_INTENT: &str = "error creating payment intent";
    pub const CONFIRM_INTENT: &str = "error updating payment intent";
    pub const CAPTURE_INTENT: &str = "error capturing payment intent";
    pub const LIST_INTENTS: &str = "error listing payment intents";
    pub const CREATE_REFUND: &str = "error creating refund";
}

/// Non-2xx answer from the provider API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StripeApiError {
    pub status: u16,
    pub code: Option<String>,
    pub error_type: Option<String>,
    pub message: Option<String>,
    pub param: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

impl StripeApiError {
    /// Reads the provider's `{"error": {...}}` body; unparsable bodies keep only the status.
    pub fn from_body(status: u16, request_id: Option<String>, body: &str) -> Self {
        let details = serde_json::from_str::<StripeErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error);

        match details {
            Some(details) => Self {
                status,
                code: details.code,
                error_type: details.type_,
                message: details.message,
                param: details.param,
                request_id,
            },
            None => Self {
                status,
                request_id,
                ..Self::default()
            },
        }
    }
}

impl fmt::Display for StripeApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stripe responded with status {}", self.status)?;
        if let Some(code) = &self.code {
            write!(f, " ({code})")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for StripeApiError {}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{operation}: {source}")]
    InvalidParameter {
        operation: &'static str,
        source: StripeApiError,
    },
    #[error("{operation}: {source}")]
    AmountTooSmall {
        operation: &'static str,
        source: StripeApiError,
    },
    #[error("{operation}: {source}")]
    AlreadyCaptured {
        operation: &'static str,
        source: StripeApiError,
    },
    #[error("{operation}: {source}")]
    UnexpectedState {
        operation: &'static str,
        source: StripeApiError,
    },
    #[error("{operation}: {source}")]
    AlreadyRefunded {
        operation: &'static str,
        source: StripeApiError,
    },
    #[error("{operation}: {source}")]
    Api {
        operation: &'static str,
        source: StripeApiError,
    },
    #[error("{operation}: request to stripe failed")]
    Transport {
        operation: &'static str,
        source: reqwest::Error,
    },
    #[error("{operation}: unexpected stripe response")]
    Mapping {
        operation: &'static str,
        source: serde_json::Error,
    },
}

impl ProviderError {
    /// Maps an API failure onto a classified variant when its code is one the
    /// calling operation recognises; anything else stays a generic `Api` error.
    pub fn classify(operation: &'static str, source: StripeApiError, recognised: &[&str]) -> Self {
        let code = source
            .code
            .as_deref()
            .filter(|code| recognised.contains(code));

        match code {
            Some(codes::INVALID_PARAMETER) => Self::InvalidParameter { operation, source },
            Some(codes::AMOUNT_TOO_SMALL) => Self::AmountTooSmall { operation, source },
            Some(codes::ALREADY_CAPTURED) => Self::AlreadyCaptured { operation, source },
            Some(codes::UNEXPECTED_STATE) => Self::UnexpectedState { operation, source },
            Some(codes::ALREADY_REFUNDED) => Self::AlreadyRefunded { operation, source },
            _ => Self::Api { operation, source },
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Self::InvalidParameter { operation, .. }
            | Self::AmountTooSmall { operation, .. }
            | Self::AlreadyCaptured { operation, .. }
            | Self::UnexpectedState { operation, .. }
            | Self::AlreadyRefunded { operation, .. }
            | Self::Api { operation, .. }
            | Self::Transport { operation, .. }
            | Self::Mapping { operation, .. } => operation,
        }
    }

    /// Caller-facing remedy for classified failures.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidParameter { .. } => Some("check the request params"),
            Self::AmountTooSmall { .. } => Some("amount too small"),
            Self::AlreadyCaptured { .. } => Some("payment intent already captured"),
            Self::UnexpectedState { .. } => Some("payment intent unexpected state"),
            Self::AlreadyRefunded { .. } => Some("payment intent already refunded"),
            Self::Api { .. } | Self::Transport { .. } | Self::Mapping { .. } => None,
        }
    }

    pub fn is_classified(&self) -> bool {
        self.hint().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: &str) -> StripeApiError {
        StripeApiError::from_body(
            400,
            Some("req_1".into()),
            &format!(r#"{{"error":{{"type":"invalid_request_error","code":"{code}","message":"nope"}}}}"#),
        )
    }

    #[test]
    fn parses_provider_error_body() {
        let err = api_error(codes::AMOUNT_TOO_SMALL);

        assert_eq!(err.code.as_deref(), Some("amount_too_small"));
        assert_eq!(err.error_type.as_deref(), Some("invalid_request_error"));
        assert_eq!(err.request_id.as_deref(), Some("req_1"));
    }

    #[test]
    fn unparsable_body_keeps_status_only() {
        let err = StripeApiError::from_body(502, None, "<html>bad gateway</html>");

        assert_eq!(err.status, 502);
        assert!(err.code.is_none());
    }

    #[test]
    fn classify_uses_only_recognised_codes() {
        let refund = ProviderError::classify(
            operations::CREATE_REFUND,
            api_error(codes::ALREADY_REFUNDED),
            &[codes::ALREADY_REFUNDED],
        );
        assert!(matches!(refund, ProviderError::AlreadyRefunded { .. }));
        assert_eq!(refund.hint(), Some("payment intent already refunded"));

        let create = ProviderError::classify(
            operations::CREATE_INTENT,
            api_error(codes::ALREADY_REFUNDED),
            &[codes::INVALID_PARAMETER, codes::AMOUNT_TOO_SMALL],
        );
        assert!(matches!(create, ProviderError::Api { .. }));
        assert!(!create.is_classified());
        assert_eq!(create.operation(), "error creating payment intent");
    }
}
