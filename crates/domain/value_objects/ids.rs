use rand::{Rng, distributions::Alphanumeric};

/// Number of random base62 characters after the prefix.
pub const ID_SUFFIX_LEN: usize = 12;

pub const PAYMENT_INTENT_ID_PREFIX: &str = "pi";
pub const REFUND_ID_PREFIX: &str = "rf";

/// Builds a primary key such as `pi_3kTz9QbWm1Lx`.
pub fn generate_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!("{prefix}_{suffix}")
}
