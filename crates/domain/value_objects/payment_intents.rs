use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Inbound request for a new manual-capture intent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateIntentModel {
    pub amount: i64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Trimmed-down view of a provider payment intent.
///
/// Only the fields the service reads or returns are kept; everything else the
/// provider sends is dropped during deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderIntent {
    pub id: String,
    #[serde(default)]
    pub object: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_capturable: i64,
    #[serde(default)]
    pub amount_received: i64,
    #[serde(default)]
    pub capture_method: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub confirmation_method: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub livemode: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_method_types: Vec<String>,
    #[serde(default)]
    pub receipt_email: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntentsDto {
    pub intents: Vec<ProviderIntent>,
}
