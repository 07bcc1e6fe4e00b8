use std::sync::Arc;

use async_trait::async_trait;
use paycore::{
    domain::{
        entities::{
            payment_intents::{InsertPaymentIntentEntity, PaymentIntentEntity},
            refunds::{InsertRefundEntity, RefundEntity},
        },
        errors::{LedgerError, NOT_FOUND_HINT},
        repositories::payments::PaymentRepository,
        transaction::{TransactionManager, TxScope},
        value_objects::{
            payment_intents::{CreateIntentModel, IntentsDto, ProviderIntent},
            refunds::ProviderRefund,
            statuses::{INTENT_REFUNDED, REFUND_SUCCEEDED},
        },
    },
    payments::{errors::ProviderError, stripe_client::StripeClient},
};
use thiserror::Error;
use tracing::{error, info, warn};

use super::intent_locks::IntentLocks;

pub const TRY_AGAIN_LATER: &str = "try again later";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: &CreateIntentModel) -> Result<ProviderIntent, ProviderError>;

    async fn capture_intent(&self, provider_id: &str, amount: i64) -> Result<ProviderIntent, ProviderError>;

    async fn list_intents(&self) -> Result<Vec<ProviderIntent>, ProviderError>;

    async fn create_refund(&self, provider_id: &str, amount: i64) -> Result<ProviderRefund, ProviderError>;
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_intent(&self, request: &CreateIntentModel) -> Result<ProviderIntent, ProviderError> {
        self.create_payment_intent(request).await
    }

    async fn capture_intent(&self, provider_id: &str, amount: i64) -> Result<ProviderIntent, ProviderError> {
        self.capture_payment_intent(provider_id, amount).await
    }

    async fn list_intents(&self) -> Result<Vec<ProviderIntent>, ProviderError> {
        self.list_payment_intents().await
    }

    async fn create_refund(&self, provider_id: &str, amount: i64) -> Result<ProviderRefund, ProviderError> {
        StripeClient::create_refund(self, provider_id, amount).await
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),
    #[error("payment intent {provider_id} not found")]
    NotFound { provider_id: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("ledger write failed")]
    Persistence(#[source] anyhow::Error),
    #[error("failed to serialize provider response")]
    Mapping(#[source] serde_json::Error),
}

impl From<LedgerError> for PaymentError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound { provider_id } => PaymentError::NotFound { provider_id },
            LedgerError::Persistence(source) => PaymentError::Persistence(source),
        }
    }
}

impl PaymentError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
            PaymentError::NotFound { .. } => StatusCode::NOT_FOUND,
            PaymentError::Provider(err) if err.is_classified() => StatusCode::BAD_REQUEST,
            PaymentError::Provider(_) | PaymentError::Persistence(_) | PaymentError::Mapping(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Component that raised the error, as reported to callers.
    pub fn service(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) | PaymentError::Mapping(_) => "payment_service",
            PaymentError::NotFound { .. } | PaymentError::Persistence(_) => "payment_repo",
            PaymentError::Provider(_) => "stripeclient",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "Bad Request",
            PaymentError::NotFound { .. } => "payment intent not found",
            PaymentError::Provider(err) if err.is_classified() => err.operation(),
            _ => "Internal Server Error",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "Validation Error",
            PaymentError::NotFound { .. } => NOT_FOUND_HINT,
            PaymentError::Provider(err) => err.hint().unwrap_or(TRY_AGAIN_LATER),
            PaymentError::Persistence(_) | PaymentError::Mapping(_) => TRY_AGAIN_LATER,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

pub struct PaymentUseCase<R, T, G>
where
    R: PaymentRepository + Send + Sync + 'static,
    T: TransactionManager + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    payment_repo: Arc<R>,
    tx_manager: Arc<T>,
    gateway: Arc<G>,
    intent_locks: IntentLocks,
}

impl<R, T, G> PaymentUseCase<R, T, G>
where
    R: PaymentRepository + Send + Sync + 'static,
    T: TransactionManager + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(payment_repo: Arc<R>, tx_manager: Arc<T>, gateway: Arc<G>) -> Self {
        Self {
            payment_repo,
            tx_manager,
            gateway,
            intent_locks: IntentLocks::new(),
        }
    }

    pub async fn create_intent(&self, request: CreateIntentModel) -> UseCaseResult<ProviderIntent> {
        info!(amount = request.amount, "payments: create intent requested");

        if request.amount <= 0 {
            let err = PaymentError::Validation("amount must be greater than zero".to_string());
            warn!(
                amount = request.amount,
                status = err.status_code().as_u16(),
                "payments: rejected non-positive amount"
            );
            return Err(err);
        }

        let intent = self.gateway.create_intent(&request).await.map_err(|err| {
            let err = PaymentError::from(err);
            warn!(
                amount = request.amount,
                status = err.status_code().as_u16(),
                provider_error = %err,
                "payments: provider refused intent"
            );
            err
        })?;

        let payload = serde_json::to_value(&intent).map_err(|err| {
            error!(
                reconcile = true,
                provider_id = %intent.id,
                error = %err,
                "payments: intent created at provider but payload could not be encoded"
            );
            PaymentError::Mapping(err)
        })?;

        let entity = InsertPaymentIntentEntity::new(
            intent.amount,
            intent.id.as_str(),
            intent.receipt_email.as_deref().unwrap_or_default(),
            intent.status.as_str(),
            payload,
        );

        let stored = self
            .payment_repo
            .create_payment(&TxScope::none(), entity)
            .await
            .map_err(|err| {
                error!(
                    reconcile = true,
                    provider_id = %intent.id,
                    amount = intent.amount,
                    db_error = ?err,
                    "payments: intent created at provider but not recorded"
                );
                PaymentError::from(err)
            })?;

        info!(
            provider_id = %intent.id,
            intent_id = %stored.id,
            status = %intent.status,
            "payments: intent created"
        );

        Ok(intent)
    }

    pub async fn capture_intent(&self, payment_id: &str) -> UseCaseResult<ProviderIntent> {
        info!(provider_id = %payment_id, "payments: capture requested");
        let _guard = self.intent_locks.acquire(payment_id).await;

        let mut intent = self.find_intent(payment_id).await?;

        let captured = self
            .gateway
            .capture_intent(payment_id, intent.amount)
            .await
            .map_err(|err| {
                let err = PaymentError::from(err);
                warn!(
                    provider_id = %payment_id,
                    status = err.status_code().as_u16(),
                    provider_error = %err,
                    "payments: capture failed at provider"
                );
                err
            })?;

        intent.status = captured.status.clone();
        self.payment_repo
            .update_payment(&TxScope::none(), &intent)
            .await
            .map_err(|err| {
                error!(
                    reconcile = true,
                    provider_id = %payment_id,
                    provider_status = %captured.status,
                    db_error = ?err,
                    "payments: captured at provider but local status not updated"
                );
                PaymentError::from(err)
            })?;

        info!(provider_id = %payment_id, status = %captured.status, "payments: intent captured");

        Ok(captured)
    }

    pub async fn get_intents(&self) -> UseCaseResult<IntentsDto> {
        let intents = self.gateway.list_intents().await.map_err(|err| {
            let err = PaymentError::from(err);
            warn!(
                status = err.status_code().as_u16(),
                provider_error = %err,
                "payments: listing intents failed"
            );
            err
        })?;

        info!(count = intents.len(), "payments: intents listed");

        Ok(IntentsDto { intents })
    }

    pub async fn create_refund(&self, payment_id: &str) -> UseCaseResult<ProviderRefund> {
        info!(provider_id = %payment_id, "payments: refund requested");
        let _guard = self.intent_locks.acquire(payment_id).await;

        let intent = self.find_intent(payment_id).await?;

        let refund = self
            .gateway
            .create_refund(payment_id, intent.amount)
            .await
            .map_err(|err| {
                let err = PaymentError::from(err);
                warn!(
                    provider_id = %payment_id,
                    status = err.status_code().as_u16(),
                    provider_error = %err,
                    "payments: refund failed at provider"
                );
                err
            })?;

        let recorded = self
            .tx_manager
            .run(&TxScope::none(), |scope| self.record_refund(scope, intent, &refund))
            .await
            .map_err(|err| {
                error!(
                    reconcile = true,
                    provider_id = %payment_id,
                    refund_id = %refund.id,
                    refund_status = %refund.status,
                    amount = refund.amount,
                    error = ?err,
                    "payments: refunded at provider but not recorded"
                );
                err
            })?;

        info!(
            provider_id = %payment_id,
            refund_id = %recorded.id,
            status = %refund.status,
            "payments: refund recorded"
        );

        Ok(refund)
    }

    async fn find_intent(&self, payment_id: &str) -> UseCaseResult<PaymentIntentEntity> {
        self.payment_repo
            .get_payment(&TxScope::none(), payment_id)
            .await
            .map_err(|err| {
                let err = PaymentError::from(err);
                warn!(
                    provider_id = %payment_id,
                    status = err.status_code().as_u16(),
                    db_error = %err,
                    "payments: intent lookup failed"
                );
                err
            })
    }

    /// Marks the intent refunded (when the provider says so) and stores the
    /// refund row. Both writes share `scope`.
    async fn record_refund(
        &self,
        scope: TxScope,
        mut intent: PaymentIntentEntity,
        refund: &ProviderRefund,
    ) -> UseCaseResult<RefundEntity> {
        if refund.status == REFUND_SUCCEEDED {
            intent.status = INTENT_REFUNDED.to_string();
        }

        self.payment_repo.update_payment(&scope, &intent).await?;

        let row = InsertRefundEntity::new(
            refund.id.as_str(),
            intent.provider_id.as_str(),
            refund.amount,
            refund.status.as_str(),
        );

        Ok(self.payment_repo.create_refund(&scope, row).await?)
    }
}
