use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, header::CONTENT_TYPE};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, error};
use url::form_urlencoded;

use crate::{
    domain::value_objects::{
        payment_intents::{CreateIntentModel, ProviderIntent},
        refunds::ProviderRefund,
    },
    payments::errors::{ProviderError, StripeApiError, codes, operations},
};

/// Page size used when walking the intent list.
pub const LIST_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    /// Root of the API, e.g. `https://api.stripe.com`. Tests point this at a local stub.
    pub api_base: String,
    pub currency: String,
    /// Payment method attached when confirming before capture.
    pub confirm_payment_method: String,
    pub timeout_secs: u64,
}

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
    currency: String,
    confirm_payment_method: String,
}

#[derive(Debug, Deserialize)]
struct ListPage<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

fn encode_path(segment: &str) -> String {
    form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

impl StripeClient {
    pub fn new(settings: StripeSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("failed to build stripe http client")?;

        Ok(Self {
            http,
            secret_key: settings.secret_key,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            currency: settings.currency,
            confirm_payment_method: settings.confirm_payment_method,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    fn form_post(&self, path: &str, body: &[(&str, String)]) -> RequestBuilder {
        self.http
            .post(self.url(path))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(body)
    }

    /// Sends the request and decodes a success body into `T`.
    ///
    /// Failures are logged with the provider's error details and classified
    /// against the codes `recognised` by the calling operation.
    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        recognised: &[&str],
    ) -> Result<T, ProviderError> {
        let resp = request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|source| {
                error!(error = %source, context = %operation, "stripe: request could not be sent");
                ProviderError::Transport { operation, source }
            })?;

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = resp
            .text()
            .await
            .map_err(|source| ProviderError::Transport { operation, source })?;

        if !status.is_success() {
            let api_error = StripeApiError::from_body(status.as_u16(), request_id, &body);
            error!(
                status = %status,
                stripe_request_id = ?api_error.request_id,
                stripe_error_type = ?api_error.error_type,
                stripe_error_code = ?api_error.code,
                stripe_error_param = ?api_error.param,
                stripe_error_message = ?api_error.message,
                context = %operation,
                "stripe api request failed"
            );
            return Err(ProviderError::classify(operation, api_error, recognised));
        }

        serde_json::from_str(&body).map_err(|source| {
            error!(
                error = %source,
                stripe_request_id = ?request_id,
                context = %operation,
                "stripe: response did not match the expected shape"
            );
            ProviderError::Mapping { operation, source }
        })
    }

    /// Creates a manual-capture, card-only intent.
    pub async fn create_payment_intent(
        &self,
        request: &CreateIntentModel,
    ) -> Result<ProviderIntent, ProviderError> {
        let mut body = vec![
            ("amount", request.amount.to_string()),
            ("currency", self.currency.clone()),
            ("capture_method", "manual".to_string()),
            ("payment_method_types[0]", "card".to_string()),
        ];
        if !request.email.is_empty() {
            body.push(("receipt_email", request.email.clone()));
        }
        if let Some(description) = request.description.as_ref().filter(|d| !d.is_empty()) {
            body.push(("description", description.clone()));
        }
        if let Some(phone) = request.phone.as_ref().filter(|p| !p.is_empty()) {
            body.push(("metadata[phone]", phone.clone()));
        }

        self.send(
            operations::CREATE_INTENT,
            self.form_post("payment_intents", &body),
            &[codes::INVALID_PARAMETER, codes::AMOUNT_TOO_SMALL],
        )
        .await
    }

    /// Confirms the intent with the configured payment method, then captures `amount`.
    pub async fn capture_payment_intent(
        &self,
        provider_id: &str,
        amount: i64,
    ) -> Result<ProviderIntent, ProviderError> {
        let id = encode_path(provider_id);

        let confirmed: ProviderIntent = self
            .send(
                operations::CONFIRM_INTENT,
                self.form_post(
                    &format!("payment_intents/{id}/confirm"),
                    &[("payment_method", self.confirm_payment_method.clone())],
                ),
                &[
                    codes::INVALID_PARAMETER,
                    codes::ALREADY_CAPTURED,
                    codes::UNEXPECTED_STATE,
                ],
            )
            .await?;
        debug!(%provider_id, status = %confirmed.status, "stripe: intent confirmed");

        self.send(
            operations::CAPTURE_INTENT,
            self.form_post(
                &format!("payment_intents/{id}/capture"),
                &[("amount_to_capture", amount.to_string())],
            ),
            &[],
        )
        .await
    }

    /// Walks every page of the intent list, keeping provider order.
    pub async fn list_payment_intents(&self) -> Result<Vec<ProviderIntent>, ProviderError> {
        let mut intents = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut query = vec![("limit", LIST_PAGE_SIZE.to_string())];
            if let Some(cursor) = &starting_after {
                query.push(("starting_after", cursor.clone()));
            }

            let page: ListPage<ProviderIntent> = self
                .send(
                    operations::LIST_INTENTS,
                    self.http.get(self.url("payment_intents")).query(&query),
                    &[],
                )
                .await?;

            let has_more = page.has_more;
            starting_after = page.data.last().map(|intent| intent.id.clone());
            intents.extend(page.data);

            if !has_more || starting_after.is_none() {
                break;
            }
        }

        Ok(intents)
    }

    pub async fn create_refund(
        &self,
        provider_id: &str,
        amount: i64,
    ) -> Result<ProviderRefund, ProviderError> {
        let body = [
            ("amount", amount.to_string()),
            ("payment_intent", provider_id.to_string()),
        ];

        self.send(
            operations::CREATE_REFUND,
            self.form_post("refunds", &body),
            &[codes::ALREADY_REFUNDED],
        )
        .await
    }
}
