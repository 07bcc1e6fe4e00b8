use thiserror::Error;

pub const NOT_FOUND_HINT: &str = "provide valid intent id";

/// Failures raised by the local ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("payment intent {provider_id} not found")]
    NotFound { provider_id: String },
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn not_found(provider_id: impl Into<String>) -> Self {
        Self::NotFound {
            provider_id: provider_id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<diesel::result::Error> for LedgerError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Persistence(anyhow::Error::new(err))
    }
}

impl From<diesel::r2d2::PoolError> for LedgerError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::Persistence(anyhow::Error::new(err).context("failed to check out a connection"))
    }
}
