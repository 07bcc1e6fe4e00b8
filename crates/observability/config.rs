use std::env;

use url::Url;

#[derive(Clone, Debug)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Clone, Debug)]
pub(crate) struct AlertConfig {
    pub(crate) webhook_url: Url,
}

#[derive(Clone, Debug)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) alerts: Option<AlertConfig>,
    /// Parse problems, logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        let component = component.trim().to_string();

        let service_name = env_string("SERVICE_NAME").unwrap_or_else(|| component.clone());
        let environment = env_string("STAGE").unwrap_or_else(|| "unknown".to_string());

        let (alerts, warnings) = alerts_from_env();

        Self {
            service_context: ServiceContext {
                service_name,
                environment,
                component,
            },
            alerts,
            warnings,
        }
    }
}

fn alerts_from_env() -> (Option<AlertConfig>, Vec<String>) {
    let mut warnings = Vec::new();

    if env_bool("ALERT_NOTIFY_ENABLED") == Some(false) {
        return (None, warnings);
    }

    let Some(raw) = env_string("ALERT_WEBHOOK_URL") else {
        return (None, warnings);
    };

    match Url::parse(&raw) {
        Ok(webhook_url) => (Some(AlertConfig { webhook_url }), warnings),
        Err(err) => {
            // The URL may embed a token, keep it out of the logs.
            warnings.push(format!(
                "ALERT_WEBHOOK_URL is set but invalid; reconciliation alerts disabled (parse error: {err})"
            ));
            (None, warnings)
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    let raw = env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
