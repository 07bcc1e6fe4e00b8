use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::{
        payment_intents::{InsertPaymentIntentEntity, PaymentIntentEntity},
        refunds::{InsertRefundEntity, RefundEntity},
    },
    errors::LedgerError,
    transaction::TxScope,
};

/// Local record of intents and refunds.
///
/// Every call runs inside `scope` when it carries a transaction.
#[automock]
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create_payment(
        &self,
        scope: &TxScope,
        intent: InsertPaymentIntentEntity,
    ) -> Result<PaymentIntentEntity, LedgerError>;

    /// Looks up a live intent by its provider id.
    async fn get_payment(
        &self,
        scope: &TxScope,
        provider_id: &str,
    ) -> Result<PaymentIntentEntity, LedgerError>;

    /// Writes the non-zero, non-empty fields of `intent`, keyed by its local id.
    async fn update_payment(
        &self,
        scope: &TxScope,
        intent: &PaymentIntentEntity,
    ) -> Result<(), LedgerError>;

    async fn create_refund(
        &self,
        scope: &TxScope,
        refund: InsertRefundEntity,
    ) -> Result<RefundEntity, LedgerError>;
}
