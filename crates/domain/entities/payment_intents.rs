use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::{
    domain::value_objects::{
        ids::{PAYMENT_INTENT_ID_PREFIX, generate_id},
        payment_intents::ProviderIntent,
    },
    infra::db::postgres::schema::payment_intents,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payment_intents)]
pub struct PaymentIntentEntity {
    pub id: String,
    pub amount: i64,
    pub provider_id: String,
    pub email: String,
    pub status: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl PaymentIntentEntity {
    /// Decodes the provider response stored at creation time.
    pub fn provider_snapshot(&self) -> Result<ProviderIntent, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_intents)]
pub struct InsertPaymentIntentEntity {
    pub id: String,
    pub amount: i64,
    pub provider_id: String,
    pub email: String,
    pub status: String,
    pub payload: serde_json::Value,
}

impl InsertPaymentIntentEntity {
    pub fn new(
        amount: i64,
        provider_id: impl Into<String>,
        email: impl Into<String>,
        status: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: generate_id(PAYMENT_INTENT_ID_PREFIX),
            amount,
            provider_id: provider_id.into(),
            email: email.into(),
            status: status.into(),
            payload,
        }
    }
}

/// Partial update keyed by the local id.
///
/// Zero amounts, empty strings and null payloads are left out so the stored
/// value wins.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = payment_intents)]
pub struct PaymentIntentChangeset {
    pub amount: Option<i64>,
    pub provider_id: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PaymentIntentChangeset {
    /// Applies the set fields to an in-memory row.
    pub fn apply(&self, entity: &mut PaymentIntentEntity) {
        if let Some(amount) = self.amount {
            entity.amount = amount;
        }
        if let Some(provider_id) = &self.provider_id {
            entity.provider_id = provider_id.clone();
        }
        if let Some(email) = &self.email {
            entity.email = email.clone();
        }
        if let Some(status) = &self.status {
            entity.status = status.clone();
        }
        if let Some(payload) = &self.payload {
            entity.payload = payload.clone();
        }
        if let Some(updated_at) = self.updated_at {
            entity.updated_at = updated_at;
        }
    }
}

impl From<&PaymentIntentEntity> for PaymentIntentChangeset {
    fn from(value: &PaymentIntentEntity) -> Self {
        fn non_empty(s: &str) -> Option<String> {
            (!s.is_empty()).then(|| s.to_string())
        }

        Self {
            amount: (value.amount != 0).then_some(value.amount),
            provider_id: non_empty(&value.provider_id),
            email: non_empty(&value.email),
            status: non_empty(&value.status),
            payload: (!value.payload.is_null()).then(|| value.payload.clone()),
            updated_at: Some(Utc::now()),
        }
    }
}
