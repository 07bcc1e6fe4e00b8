mod config;
mod layer;
mod notifier;
mod webhook;

use std::sync::Arc;

use anyhow::Result;
use config::ObservabilityConfig;
use layer::ReconcileAlertLayer;
use notifier::Notifier;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use webhook::WebhookAlertSink;

/// Installs the global subscriber: env filter, local-time fmt output and, when
/// `ALERT_WEBHOOK_URL` is set, the reconciliation alert sink.
///
/// Must run inside a tokio runtime because the alert queue spawns a task.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);
    let mut warnings = config.warnings.clone();

    let alert_layer = match config.alerts.as_ref() {
        Some(alerts) => match WebhookAlertSink::new(alerts.webhook_url.clone()) {
            Ok(sink) => Some(ReconcileAlertLayer::new(
                Notifier::new(vec![Arc::new(sink)]),
                config.service_context.clone(),
            )),
            Err(err) => {
                warnings.push(format!("reconciliation alerts disabled: {err}"));
                None
            }
        },
        None => None,
    };
    let alerts_enabled = alert_layer.is_some();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &warnings {
        warn!(
            service = %config.service_context.service_name,
            environment = %config.service_context.environment,
            component = %config.service_context.component,
            warning = %warning,
            "observability config warning"
        );
    }

    info!(
        service = %config.service_context.service_name,
        environment = %config.service_context.environment,
        component = %config.service_context.component,
        alerts_enabled,
        "observability initialised"
    );

    Ok(())
}
