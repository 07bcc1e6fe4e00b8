use paycore::payments::stripe_client::StripeSettings;

use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub stripe: Stripe,
    pub stage: Stage,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// Request body limit in MiB.
    pub body_limit: u64,
    /// Request timeout in seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub api_base: String,
    pub currency: String,
    pub confirm_payment_method: String,
    pub timeout: u64,
}

impl Stripe {
    pub fn settings(&self) -> StripeSettings {
        StripeSettings {
            secret_key: self.secret_key.clone(),
            api_base: self.api_base.clone(),
            currency: self.currency.clone(),
            confirm_payment_method: self.confirm_payment_method.clone(),
            timeout_secs: self.timeout,
        }
    }
}

// The secret key stays out of Debug output.
impl std::fmt::Debug for Stripe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stripe")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .field("confirm_payment_method", &self.confirm_payment_method)
            .field("timeout", &self.timeout)
            .finish()
    }
}
