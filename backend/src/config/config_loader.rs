use std::{env, str::FromStr};

use anyhow::{Context, Result};

use super::{
    config_model::{BackendServer, Database, DotEnvyConfig, Stripe},
    stage::Stage,
};

const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_CURRENCY: &str = "inr";
const DEFAULT_CONFIRM_PAYMENT_METHOD: &str = "pm_card_visa";
const DEFAULT_STRIPE_TIMEOUT: u64 = 10;

/// Reads the process environment. `.env` is loaded once by `main`.
pub fn load() -> Result<DotEnvyConfig> {
    load_from(|key| env::var(key).ok())
}

/// Builds the config from any key lookup.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<DotEnvyConfig> {
    let required = |key: &str| -> Result<String> {
        lookup(key)
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("{key} is not set"))
    };
    let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let backend_server = BackendServer {
        port: parse("SERVER_PORT_BACKEND", &required("SERVER_PORT_BACKEND")?)?,
        body_limit: parse("SERVER_BODY_LIMIT", &required("SERVER_BODY_LIMIT")?)?,
        timeout: parse("SERVER_TIMEOUT", &required("SERVER_TIMEOUT")?)?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let stripe = Stripe {
        secret_key: required("STRIPE_SECRET_KEY")?,
        api_base: optional("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
        currency: optional("STRIPE_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        confirm_payment_method: optional("STRIPE_CONFIRM_PAYMENT_METHOD")
            .unwrap_or_else(|| DEFAULT_CONFIRM_PAYMENT_METHOD.to_string()),
        timeout: match optional("STRIPE_TIMEOUT") {
            Some(raw) => parse("STRIPE_TIMEOUT", &raw)?,
            None => DEFAULT_STRIPE_TIMEOUT,
        },
    };

    let stage = match optional("STAGE") {
        Some(raw) => Stage::try_from(raw.as_str()).context("STAGE is invalid")?,
        None => Stage::default(),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        stripe,
        stage,
    })
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base() -> HashMap<String, String> {
        vars(&[
            ("SERVER_PORT_BACKEND", "8080"),
            ("SERVER_BODY_LIMIT", "10"),
            ("SERVER_TIMEOUT", "30"),
            ("DATABASE_URL", "postgres://localhost/pay"),
            ("STRIPE_SECRET_KEY", "sk_test_123"),
        ])
    }

    #[test]
    fn applies_defaults_for_optional_stripe_settings() {
        let env = base();

        let config = load_from(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.backend_server.port, 8080);
        assert_eq!(config.stripe.api_base, "https://api.stripe.com");
        assert_eq!(config.stripe.currency, "inr");
        assert_eq!(config.stripe.confirm_payment_method, "pm_card_visa");
        assert_eq!(config.stripe.timeout, 10);
        assert_eq!(config.stage, Stage::Local);
    }

    #[test]
    fn missing_required_keys_are_named() {
        let mut env = base();
        env.remove("STRIPE_SECRET_KEY");

        let err = load_from(|k| env.get(k).cloned()).unwrap_err();

        assert!(err.to_string().contains("STRIPE_SECRET_KEY"));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut env = base();
        env.insert("SERVER_PORT_BACKEND".into(), "eighty".into());

        let err = load_from(|k| env.get(k).cloned()).unwrap_err();

        assert!(err.to_string().contains("SERVER_PORT_BACKEND"));
    }

    #[test]
    fn debug_output_hides_keys() {
        let mut env = base();
        env.insert("STAGE".into(), "prod".into());

        let config = load_from(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.stage, Stage::Production);
        assert!(!format!("{config:?}").contains("sk_test_123"));
    }
}
