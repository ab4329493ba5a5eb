pub mod attempt_state;
pub mod delivery_outcome;
pub mod retry_policy;
