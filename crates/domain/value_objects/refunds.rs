use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Trimmed-down view of a provider refund.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderRefund {
    pub id: String,
    #[serde(default)]
    pub object: String,
    pub amount: i64,
    #[serde(default)]
    pub charge: Option<String>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub receipt_number: Option<String>,
    pub status: String,
}
