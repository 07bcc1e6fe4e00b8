use std::{future::Future, sync::Arc};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::debug;

use crate::domain::{
    entities::{
        payment_intents::{InsertPaymentIntentEntity, PaymentIntentChangeset, PaymentIntentEntity},
        refunds::{InsertRefundEntity, RefundEntity},
    },
    errors::LedgerError,
    repositories::payments::PaymentRepository,
    transaction::{TransactionManager, TxHandle, TxScope},
};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    intents: Vec<PaymentIntentEntity>,
    refunds: Vec<RefundEntity>,
}

/// A process-local ledger that mirrors the Postgres constraints.
///
/// It also acts as its own transaction manager: the outermost `run` takes a
/// snapshot and restores it when the work fails. Outer transactions and writes
/// made outside any transaction share one gate, so a rollback never discards
/// writes it did not make. Work inside `run` must write through its own scope:
/// an unscoped write there waits on the gate the transaction holds.
#[derive(Default, Clone)]
pub struct InMemoryPaymentLedger {
    state: Arc<RwLock<LedgerState>>,
    tx_gate: Arc<Mutex<()>>,
}

impl InMemoryPaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn payments(&self) -> Vec<PaymentIntentEntity> {
        self.state.read().await.intents.clone()
    }

    pub async fn refunds(&self) -> Vec<RefundEntity> {
        self.state.read().await.refunds.clone()
    }

    /// Gate for a write outside any transaction. Scoped writes already run
    /// under the gate taken by `run`.
    async fn write_gate(&self, scope: &TxScope) -> Option<MutexGuard<'_, ()>> {
        if scope.is_active() {
            None
        } else {
            Some(self.tx_gate.lock().await)
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), LedgerError> {
    if value.is_empty() {
        return Err(LedgerError::Persistence(anyhow!(
            "null value in column \"{field}\" violates not-null constraint"
        )));
    }
    Ok(())
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentLedger {
    async fn create_payment(
        &self,
        scope: &TxScope,
        intent: InsertPaymentIntentEntity,
    ) -> Result<PaymentIntentEntity, LedgerError> {
        if intent.amount <= 0 {
            return Err(LedgerError::Persistence(anyhow!(
                "new row for relation \"payment_intents\" violates check constraint on amount"
            )));
        }
        require("provider_id", &intent.provider_id)?;

        let _gate = self.write_gate(scope).await;
        let mut state = self.state.write().await;
        if state
            .intents
            .iter()
            .any(|row| row.id == intent.id || row.provider_id == intent.provider_id)
        {
            return Err(LedgerError::Persistence(anyhow!(
                "duplicate key value violates unique constraint on payment_intents"
            )));
        }

        let now = Utc::now();
        let row = PaymentIntentEntity {
            id: intent.id,
            amount: intent.amount,
            provider_id: intent.provider_id,
            email: intent.email,
            status: intent.status,
            payload: intent.payload,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.intents.push(row.clone());

        Ok(row)
    }

    async fn get_payment(
        &self,
        _scope: &TxScope,
        provider_id: &str,
    ) -> Result<PaymentIntentEntity, LedgerError> {
        let state = self.state.read().await;
        state
            .intents
            .iter()
            .find(|row| row.provider_id == provider_id && row.deleted_at.is_none())
            .cloned()
            .ok_or_else(|| LedgerError::not_found(provider_id))
    }

    async fn update_payment(
        &self,
        scope: &TxScope,
        intent: &PaymentIntentEntity,
    ) -> Result<(), LedgerError> {
        let changes = PaymentIntentChangeset::from(intent);

        let _gate = self.write_gate(scope).await;
        let mut state = self.state.write().await;
        let row = state
            .intents
            .iter_mut()
            .find(|row| row.id == intent.id)
            .ok_or_else(|| LedgerError::not_found(intent.provider_id.clone()))?;
        changes.apply(row);

        Ok(())
    }

    async fn create_refund(
        &self,
        scope: &TxScope,
        refund: InsertRefundEntity,
    ) -> Result<RefundEntity, LedgerError> {
        require("provider_id", &refund.provider_id)?;
        require("payment_intent_id", &refund.payment_intent_id)?;
        require("status", &refund.status)?;

        let _gate = self.write_gate(scope).await;
        let mut state = self.state.write().await;
        if !state
            .intents
            .iter()
            .any(|row| row.provider_id == refund.payment_intent_id)
        {
            return Err(LedgerError::Persistence(anyhow!(
                "insert on \"refunds\" violates foreign key to payment_intents"
            )));
        }
        if state.refunds.iter().any(|row| row.id == refund.id) {
            return Err(LedgerError::Persistence(anyhow!(
                "duplicate key value violates unique constraint on refunds"
            )));
        }

        let now = Utc::now();
        let row = RefundEntity {
            id: refund.id,
            provider_id: refund.provider_id,
            payment_intent_id: refund.payment_intent_id,
            amount: refund.amount,
            status: refund.status,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.refunds.push(row.clone());

        Ok(row)
    }
}

#[async_trait]
impl TransactionManager for InMemoryPaymentLedger {
    async fn run<T, E, F, Fut>(&self, scope: &TxScope, work: F) -> Result<T, E>
    where
        T: Send,
        E: From<LedgerError> + Send,
        F: FnOnce(TxScope) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if scope.is_active() {
            return work(scope.clone()).await;
        }

        let _gate = self.tx_gate.lock().await;
        let snapshot = self.state.read().await.clone();

        let outcome = work(TxScope::active(TxHandle::InMemory)).await;
        if outcome.is_err() {
            *self.state.write().await = snapshot;
            debug!("ledger: in-memory transaction rolled back");
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intent(provider_id: &str, amount: i64) -> InsertPaymentIntentEntity {
        InsertPaymentIntentEntity::new(
            amount,
            provider_id,
            "a@b.com",
            "requires_capture",
            json!({"id": provider_id, "amount": amount, "status": "requires_capture"}),
        )
    }

    #[tokio::test]
    async fn get_payment_reports_not_found() {
        let ledger = InMemoryPaymentLedger::new();

        let err = ledger
            .get_payment(&TxScope::none(), "pi_missing")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn duplicate_provider_ids_are_rejected() {
        let ledger = InMemoryPaymentLedger::new();
        ledger
            .create_payment(&TxScope::none(), intent("pi_1", 100))
            .await
            .unwrap();

        let err = ledger
            .create_payment(&TxScope::none(), intent("pi_1", 100))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Persistence(_)));
        assert_eq!(ledger.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn update_only_writes_populated_fields() {
        let ledger = InMemoryPaymentLedger::new();
        let mut row = ledger
            .create_payment(&TxScope::none(), intent("pi_1", 100))
            .await
            .unwrap();

        row.amount = 0;
        row.email = String::new();
        row.status = "succeeded".into();
        ledger.update_payment(&TxScope::none(), &row).await.unwrap();

        let stored = ledger.get_payment(&TxScope::none(), "pi_1").await.unwrap();
        assert_eq!(stored.amount, 100);
        assert_eq!(stored.email, "a@b.com");
        assert_eq!(stored.status, "succeeded");
    }

    #[tokio::test]
    async fn refunds_need_a_persisted_intent() {
        let ledger = InMemoryPaymentLedger::new();

        let err = ledger
            .create_refund(
                &TxScope::none(),
                InsertRefundEntity::new("re_1", "pi_ghost", 100, "succeeded"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Persistence(_)));
        assert!(ledger.refunds().await.is_empty());
    }

    #[tokio::test]
    async fn failed_work_rolls_back_every_write() {
        let ledger = InMemoryPaymentLedger::new();
        let mut row = ledger
            .create_payment(&TxScope::none(), intent("pi_1", 100))
            .await
            .unwrap();
        row.status = "refunded".into();

        let result: Result<(), LedgerError> = ledger
            .run(&TxScope::none(), |scope| {
                let ledger = ledger.clone();
                let row = row.clone();
                async move {
                    ledger.update_payment(&scope, &row).await?;
                    ledger
                        .create_refund(&scope, InsertRefundEntity::new("", "pi_1", 100, "succeeded"))
                        .await?;
                    Ok(())
                }
            })
            .await;

        assert!(result.is_err());
        let stored = ledger.get_payment(&TxScope::none(), "pi_1").await.unwrap();
        assert_eq!(stored.status, "requires_capture");
        assert!(ledger.refunds().await.is_empty());
    }

    #[tokio::test]
    async fn rollback_keeps_writes_made_outside_the_transaction() {
        let ledger = InMemoryPaymentLedger::new();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let tx_ledger = ledger.clone();
        let transaction = tokio::spawn(async move {
            tx_ledger
                .run(&TxScope::none(), |scope| {
                    let ledger = tx_ledger.clone();
                    async move {
                        ledger.create_payment(&scope, intent("pi_tx", 100)).await?;
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Err::<(), _>(LedgerError::Persistence(anyhow!("work failed")))
                    }
                })
                .await
        });
        started_rx.await.unwrap();

        let outside_ledger = ledger.clone();
        let outside = tokio::spawn(async move {
            outside_ledger
                .create_payment(&TxScope::none(), intent("pi_outside", 200))
                .await
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        release_tx.send(()).unwrap();

        assert!(transaction.await.unwrap().is_err());
        outside.await.unwrap().unwrap();
        let ids: Vec<String> = ledger
            .payments()
            .await
            .into_iter()
            .map(|row| row.provider_id)
            .collect();
        assert_eq!(ids, ["pi_outside"]);
    }

    #[tokio::test]
    async fn nested_run_joins_the_outer_transaction() {
        let ledger = InMemoryPaymentLedger::new();

        let result: Result<(), LedgerError> = ledger
            .run(&TxScope::none(), |outer| {
                let ledger = ledger.clone();
                async move {
                    let inner_saw_active = ledger
                        .run(&outer, |inner| async move {
                            Ok::<_, LedgerError>(inner.is_active())
                        })
                        .await?;
                    assert!(inner_saw_active);

                    ledger.create_payment(&outer, intent("pi_1", 100)).await?;
                    Err(LedgerError::Persistence(anyhow!("outer work failed")))
                }
            })
            .await;

        assert!(result.is_err());
        assert!(ledger.payments().await.is_empty());
    }

    #[tokio::test]
    async fn successful_work_commits() {
        let ledger = InMemoryPaymentLedger::new();

        let row = ledger
            .run(&TxScope::none(), |scope| {
                let ledger = ledger.clone();
                async move { ledger.create_payment(&scope, intent("pi_1", 100)).await }
            })
            .await
            .unwrap();

        assert_eq!(ledger.payments().await, vec![row]);
    }
}
