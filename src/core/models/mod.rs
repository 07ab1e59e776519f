pub mod key_identity;
pub mod stage;
pub mod trust_policy;
