pub mod payment_intents;
pub mod refunds;
