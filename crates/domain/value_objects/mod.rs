pub mod ids;
pub mod payment_intents;
pub mod refunds;
pub mod statuses;
