use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{Layer, layer::Context};

use super::{
    config::ServiceContext,
    notifier::{Notifier, ReconcileAlert},
};

/// Field that marks an event as needing manual ledger repair.
const RECONCILE_FIELD: &str = "reconcile";

/// Forwards `reconcile = true` events at ERROR level to the notifier.
#[derive(Clone)]
pub(crate) struct ReconcileAlertLayer {
    notifier: Notifier,
    service_context: ServiceContext,
}

impl ReconcileAlertLayer {
    pub(crate) fn new(notifier: Notifier, service_context: ServiceContext) -> Self {
        Self {
            notifier,
            service_context,
        }
    }
}

#[derive(Default)]
struct FieldMapVisitor {
    values: BTreeMap<String, String>,
}

impl FieldMapVisitor {
    fn insert(&mut self, field: &Field, value: String) {
        self.values
            .insert(field.name().to_string(), redact(field.name(), value));
    }
}

impl Visit for FieldMapVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }
}

impl<S: Subscriber> Layer<S> for ReconcileAlertLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }

        let mut visitor = FieldMapVisitor::default();
        event.record(&mut visitor);

        if visitor.values.remove(RECONCILE_FIELD).as_deref() != Some("true") {
            return;
        }

        let message = visitor
            .values
            .remove("message")
            .map(|raw| unquote_debug_string(&raw));

        self.notifier.try_notify(ReconcileAlert {
            timestamp: Utc::now(),
            service_name: self.service_context.service_name.clone(),
            environment: self.service_context.environment.clone(),
            component: self.service_context.component.clone(),
            target: event.metadata().target().to_string(),
            message,
            fields: visitor.values,
        });
    }
}

fn unquote_debug_string(input: &str) -> String {
    let trimmed = input.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

fn redact(field_name: &str, value: String) -> String {
    if is_sensitive_key(field_name) {
        return "[REDACTED]".to_string();
    }
    value
}

fn is_sensitive_key(field_name: &str) -> bool {
    let field = field_name.to_ascii_lowercase();
    field.contains("webhook")
        || field.contains("secret")
        || field.contains("password")
        || field.contains("token")
        || field.contains("authorization")
        || field.contains("client_secret")
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tracing::{error, warn};
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::observability::notifier::AlertSink;

    struct ChannelSink(mpsc::UnboundedSender<ReconcileAlert>);

    #[async_trait]
    impl AlertSink for ChannelSink {
        async fn send(&self, alert: &ReconcileAlert) -> Result<()> {
            let _ = self.0.send(alert.clone());
            Ok(())
        }

        fn sink_name(&self) -> &'static str {
            "channel"
        }
    }

    fn context() -> ServiceContext {
        ServiceContext {
            service_name: "paycore".into(),
            environment: "test".into(),
            component: "backend".into(),
        }
    }

    #[tokio::test]
    async fn forwards_only_reconcile_errors() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = Notifier::new(vec![Arc::new(ChannelSink(tx))]);
        let subscriber =
            tracing_subscriber::registry().with(ReconcileAlertLayer::new(notifier, context()));

        tracing::subscriber::with_default(subscriber, || {
            error!(provider_id = "pi_1", "payments: plain failure");
            warn!(reconcile = true, "payments: not severe enough");
            error!(
                reconcile = true,
                provider_id = "pi_2",
                stripe_secret = "sk_live_x",
                "payments: refund recorded at provider but not locally"
            );
        });

        let alert = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("alert should arrive")
            .expect("channel open");

        assert_eq!(
            alert.message.as_deref(),
            Some("payments: refund recorded at provider but not locally")
        );
        assert_eq!(alert.fields.get("provider_id").map(String::as_str), Some("pi_2"));
        assert_eq!(alert.fields.get("stripe_secret").map(String::as_str), Some("[REDACTED]"));
        assert!(!alert.fields.contains_key(RECONCILE_FIELD));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unquotes_debug_strings() {
        assert_eq!(unquote_debug_string("\"hello\""), "hello");
        assert_eq!(unquote_debug_string("plain"), "plain");
    }
}
