use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

const QUEUE_CAPACITY: usize = 256;

/// A ledger write that failed after the provider already accepted the call.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct ReconcileAlert {
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
    pub(crate) target: String,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
}

#[async_trait]
pub(crate) trait AlertSink: Send + Sync {
    async fn send(&self, alert: &ReconcileAlert) -> Result<()>;
    fn sink_name(&self) -> &'static str;
}

/// Fans alerts out to the sinks from a background task.
///
/// `try_notify` never blocks the logging call site; alerts are dropped when the
/// queue is full.
#[derive(Clone)]
pub(crate) struct Notifier {
    tx: mpsc::Sender<ReconcileAlert>,
}

impl Notifier {
    pub(crate) fn new(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<ReconcileAlert>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(alert) = rx.recv().await {
                for sink in &sinks {
                    if let Err(error) = sink.send(&alert).await {
                        // Must stay below ERROR or it would feed back into the queue.
                        warn!(sink = sink.sink_name(), error = %error, "alert sink failed");
                    }
                }
            }
        });

        Self { tx }
    }

    pub(crate) fn try_notify(&self, alert: ReconcileAlert) {
        match self.tx.try_send(alert) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("alert queue full; dropping reconciliation alert");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("alert queue closed; dropping reconciliation alert");
            }
        }
    }
}
