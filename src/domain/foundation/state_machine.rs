//! Lifecycle enums with a fixed transition table.

use super::ValidationError;

/// An enum whose values move only along the edges it lists.
///
/// Implementors supply the table; moving along it is provided.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug + 'static {
    /// Phases reachable in one step from `self`.
    fn valid_transitions(&self) -> &'static [Self];

    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// `target` if the edge exists, otherwise a `phase` validation error.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if !self.can_transition_to(&target) {
            return Err(ValidationError::invalid_format(
                "phase",
                format!("{:?} -> {:?} is not allowed", self, target),
            ));
        }
        Ok(target)
    }

    /// No outgoing edges.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
