mod ids;
pub mod retry;

pub use ids::{new_charge_id, new_dispute_id, new_idempotency_key, new_intent_id};
