use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use diesel::{OptionalExtension, PgConnection, QueryResult, insert_into, prelude::*, update};

use crate::{
    domain::{
        entities::{
            payment_intents::{InsertPaymentIntentEntity, PaymentIntentChangeset, PaymentIntentEntity},
            refunds::{InsertRefundEntity, RefundEntity},
        },
        errors::LedgerError,
        repositories::payments::PaymentRepository,
        transaction::{TxHandle, TxScope},
    },
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{payment_intents, refunds},
        transaction::with_locked,
    },
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    /// Runs `op` on the scope's transaction, or on a fresh pooled connection.
    fn with_connection<R>(
        &self,
        scope: &TxScope,
        op: impl FnOnce(&mut PgConnection) -> QueryResult<R>,
    ) -> Result<R, LedgerError> {
        match scope.handle() {
            Some(TxHandle::Postgres(shared)) => with_locked(shared, op),
            Some(TxHandle::InMemory) => Err(LedgerError::Persistence(anyhow!(
                "postgres ledger received an in-memory transaction scope"
            ))),
            None => {
                let mut conn = Arc::clone(&self.db_pool).get()?;
                op(&mut conn).map_err(LedgerError::from)
            }
        }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn create_payment(
        &self,
        scope: &TxScope,
        intent: InsertPaymentIntentEntity,
    ) -> Result<PaymentIntentEntity, LedgerError> {
        self.with_connection(scope, |conn| {
            insert_into(payment_intents::table)
                .values(&intent)
                .returning(PaymentIntentEntity::as_returning())
                .get_result(conn)
        })
    }

    async fn get_payment(
        &self,
        scope: &TxScope,
        provider_id: &str,
    ) -> Result<PaymentIntentEntity, LedgerError> {
        let found = self.with_connection(scope, |conn| {
            payment_intents::table
                .filter(payment_intents::provider_id.eq(provider_id))
                .filter(payment_intents::deleted_at.is_null())
                .select(PaymentIntentEntity::as_select())
                .first(conn)
                .optional()
        })?;

        found.ok_or_else(|| LedgerError::not_found(provider_id))
    }

    async fn update_payment(
        &self,
        scope: &TxScope,
        intent: &PaymentIntentEntity,
    ) -> Result<(), LedgerError> {
        let changes = PaymentIntentChangeset::from(intent);

        let affected = self.with_connection(scope, |conn| {
            update(payment_intents::table.find(&intent.id))
                .set(&changes)
                .execute(conn)
        })?;

        if affected == 0 {
            return Err(LedgerError::not_found(intent.provider_id.clone()));
        }

        Ok(())
    }

    async fn create_refund(
        &self,
        scope: &TxScope,
        refund: InsertRefundEntity,
    ) -> Result<RefundEntity, LedgerError> {
        self.with_connection(scope, |conn| {
            insert_into(refunds::table)
                .values(&refund)
                .returning(RefundEntity::as_returning())
                .get_result(conn)
        })
    }
}
