pub mod intent_locks;
pub mod payments;
