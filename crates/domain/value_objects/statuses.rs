/// Intent status written locally once a refund succeeds. The provider never
/// reports it.
pub const INTENT_REFUNDED: &str = "refunded";

/// Provider refund status that marks the intent refunded.
pub const REFUND_SUCCEEDED: &str = "succeeded";
