use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::{
    domain::value_objects::ids::{REFUND_ID_PREFIX, generate_id},
    infra::db::postgres::schema::refunds,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = refunds)]
pub struct RefundEntity {
    pub id: String,
    pub provider_id: String,
    pub payment_intent_id: String,
    pub amount: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = refunds)]
pub struct InsertRefundEntity {
    pub id: String,
    pub provider_id: String,
    /// Provider id of the refunded intent.
    pub payment_intent_id: String,
    pub amount: i64,
    pub status: String,
}

impl InsertRefundEntity {
    pub fn new(
        provider_id: impl Into<String>,
        payment_intent_id: impl Into<String>,
        amount: i64,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id(REFUND_ID_PREFIX),
            provider_id: provider_id.into(),
            payment_intent_id: payment_intent_id.into(),
            amount,
            status: status.into(),
        }
    }
}
