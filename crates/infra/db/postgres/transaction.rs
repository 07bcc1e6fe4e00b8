use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use anyhow::anyhow;
use async_trait::async_trait;
use diesel::{
    PgConnection, QueryResult,
    connection::{AnsiTransactionManager, TransactionManager as DieselTransactionManager},
};
use tracing::{debug, error};

use crate::{
    domain::{
        errors::LedgerError,
        transaction::{SharedPgConnection, TransactionManager, TxHandle, TxScope},
    },
    infra::db::postgres::postgres_connection::PgPoolSquad,
};

type PgTxManager = AnsiTransactionManager;

/// Opens transactions on a connection pinned out of the pool.
///
/// If the work future is dropped before finishing, the pooled connection goes
/// back with an open transaction and r2d2 discards it as broken.
pub struct PgTransactionManager {
    db_pool: Arc<PgPoolSquad>,
}

impl PgTransactionManager {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// Runs `op` against the connection behind a transaction handle.
pub(crate) fn with_locked<R>(
    shared: &SharedPgConnection,
    op: impl FnOnce(&mut PgConnection) -> QueryResult<R>,
) -> Result<R, LedgerError> {
    let mut guard = shared
        .lock()
        .map_err(|_| LedgerError::Persistence(anyhow!("transaction connection lock poisoned")))?;
    op(&mut **guard).map_err(LedgerError::from)
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
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

        let conn = self.db_pool.get().map_err(LedgerError::from)?;
        let shared: SharedPgConnection = Arc::new(Mutex::new(conn));

        with_locked(&shared, |conn| {
            <PgTxManager as DieselTransactionManager<PgConnection>>::begin_transaction(conn)
        })?;
        debug!("ledger: transaction started");

        match work(TxScope::active(TxHandle::Postgres(Arc::clone(&shared)))).await {
            Ok(value) => {
                with_locked(&shared, |conn| {
                    <PgTxManager as DieselTransactionManager<PgConnection>>::commit_transaction(conn)
                })?;
                debug!("ledger: transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = with_locked(&shared, |conn| {
                    <PgTxManager as DieselTransactionManager<PgConnection>>::rollback_transaction(
                        conn,
                    )
                }) {
                    error!(db_error = ?rollback_err, "ledger: rollback failed");
                } else {
                    debug!("ledger: transaction rolled back");
                }
                Err(err)
            }
        }
    }
}
