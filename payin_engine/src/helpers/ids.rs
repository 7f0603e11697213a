use rand::{distributions::Alphanumeric, Rng};

use crate::db_types::{DisputeId, IntentId};

fn random_token(len: usize) -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

/// A fresh `pi_`-prefixed payment intent id.
pub fn new_intent_id() -> IntentId {
    IntentId(format!("pi_{}", random_token(24)))
}

/// A fresh idempotency key for a capture. Minted once at authorization time and reused verbatim on every retry, so
/// the provider can deduplicate.
pub fn new_idempotency_key() -> String {
    format!("capture_{}", random_token(32))
}

/// A fresh `dp_`-prefixed dispute id, in the provider's format.
pub fn new_dispute_id() -> DisputeId {
    DisputeId(format!("dp_{}", random_token(24)))
}

/// A fresh `ch_`-prefixed charge id, in the provider's format. Used by test and sandbox gateways.
pub fn new_charge_id() -> String {
    format!("ch_{}", random_token(24))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_have_the_expected_shape() {
        assert!(new_intent_id().as_str().starts_with("pi_"));
        assert!(new_dispute_id().as_str().starts_with("dp_"));
        assert!(new_charge_id().starts_with("ch_"));
        assert!(new_idempotency_key().starts_with("capture_"));
        assert_ne!(new_idempotency_key(), new_idempotency_key());
    }
}
