use crate::domain::entities::delivery_attempt::DeliveryStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    Forbidden,
}

/// Attempts leave `pending` exactly once and never change afterwards.
pub struct AttemptStateMachine;

impl AttemptStateMachine {
    pub fn can_transition(from: DeliveryStatus, to: DeliveryStatus) -> bool {
        matches!(
            (from, to),
            (DeliveryStatus::Pending, DeliveryStatus::Success)
                | (DeliveryStatus::Pending, DeliveryStatus::Failed)
                | (DeliveryStatus::Pending, DeliveryStatus::Exhausted)
        )
    }

    pub fn transition(
        from: DeliveryStatus,
        to: DeliveryStatus,
    ) -> Result<DeliveryStatus, TransitionError> {
        if Self::can_transition(from, to) {
            return Ok(to);
        }

        Err(TransitionError::Forbidden)
    }
}
