use tracing::{debug, warn};

use crate::models::{ConsultationError, ConsultationStatus};

/// Transition table for consultation status. Every status write in the cell
/// is validated here first; completed and cancelled are terminal.
pub struct ConsultationLifecycle;

impl ConsultationLifecycle {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_transition(
        &self,
        current: ConsultationStatus,
        next: ConsultationStatus,
    ) -> Result<(), ConsultationError> {
        debug!("Validating status transition {} -> {}", current, next);

        if !self.valid_transitions(current).contains(&next) {
            warn!("Invalid status transition attempted: {} -> {}", current, next);
            return Err(ConsultationError::InvalidStatusTransition {
                from: current,
                to: next,
            });
        }

        Ok(())
    }

    pub fn valid_transitions(&self, current: ConsultationStatus) -> Vec<ConsultationStatus> {
        match current {
            ConsultationStatus::Pending => vec![
                ConsultationStatus::Active,
                ConsultationStatus::Cancelled,
            ],
            ConsultationStatus::Active => vec![
                ConsultationStatus::Completed,
                // Emergency cancellation mid-session
                ConsultationStatus::Cancelled,
            ],
            ConsultationStatus::Completed => vec![],
            ConsultationStatus::Cancelled => vec![],
        }
    }
}

impl Default for ConsultationLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn pending_can_become_active_or_cancelled() {
        let lifecycle = ConsultationLifecycle::new();
        assert!(lifecycle
            .validate_transition(ConsultationStatus::Pending, ConsultationStatus::Active)
            .is_ok());
        assert!(lifecycle
            .validate_transition(ConsultationStatus::Pending, ConsultationStatus::Cancelled)
            .is_ok());
    }

    #[test]
    fn pending_cannot_jump_to_completed() {
        let lifecycle = ConsultationLifecycle::new();
        assert_matches!(
            lifecycle.validate_transition(ConsultationStatus::Pending, ConsultationStatus::Completed),
            Err(ConsultationError::InvalidStatusTransition { .. })
        );
    }

    #[test]
    fn active_can_complete_or_cancel() {
        let lifecycle = ConsultationLifecycle::new();
        assert!(lifecycle
            .validate_transition(ConsultationStatus::Active, ConsultationStatus::Completed)
            .is_ok());
        assert!(lifecycle
            .validate_transition(ConsultationStatus::Active, ConsultationStatus::Cancelled)
            .is_ok());
    }

    #[test]
    fn terminal_states_have_no_exits() {
        let lifecycle = ConsultationLifecycle::new();

        for terminal in [ConsultationStatus::Completed, ConsultationStatus::Cancelled] {
            assert!(lifecycle.valid_transitions(terminal).is_empty());

            for next in [
                ConsultationStatus::Pending,
                ConsultationStatus::Active,
                ConsultationStatus::Completed,
                ConsultationStatus::Cancelled,
            ] {
                assert!(lifecycle.validate_transition(terminal, next).is_err());
            }
        }
    }

    #[test]
    fn terminal_flag_matches_table() {
        assert!(!ConsultationStatus::Pending.is_terminal());
        assert!(!ConsultationStatus::Active.is_terminal());
        assert!(ConsultationStatus::Completed.is_terminal());
        assert!(ConsultationStatus::Cancelled.is_terminal());
    }
}
