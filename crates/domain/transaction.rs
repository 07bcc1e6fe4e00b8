use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use diesel::{
    PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::domain::errors::LedgerError;

pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Connection pinned for the lifetime of one transaction.
pub type SharedPgConnection = Arc<Mutex<PgPooledConnection>>;

/// Handle to an open transaction.
#[derive(Clone)]
pub enum TxHandle {
    Postgres(SharedPgConnection),
    InMemory,
}

/// Carries the active transaction, if any, through a call chain.
///
/// Repository methods run against the handle when one is present and against
/// the pool otherwise. A scope is cheap to clone; clones share the handle.
#[derive(Clone, Default)]
pub struct TxScope {
    handle: Option<TxHandle>,
}

impl TxScope {
    pub fn none() -> Self {
        Self { handle: None }
    }

    pub fn active(handle: TxHandle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    pub fn handle(&self) -> Option<&TxHandle> {
        self.handle.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }
}

impl fmt::Debug for TxScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.handle {
            None => "none",
            Some(TxHandle::Postgres(_)) => "postgres",
            Some(TxHandle::InMemory) => "in_memory",
        };
        f.debug_struct("TxScope").field("handle", &state).finish()
    }
}

/// Runs a unit of work inside a transaction.
///
/// When `scope` already carries a transaction the work joins it and nothing is
/// begun, committed or rolled back here; only the outermost call finishes the
/// transaction. There are no savepoints.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn run<T, E, F, Fut>(&self, scope: &TxScope, work: F) -> Result<T, E>
    where
        T: Send,
        E: From<LedgerError> + Send,
        F: FnOnce(TxScope) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send;
}
