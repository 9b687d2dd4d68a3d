//! Shift lifecycle: ACTIVE -> COMPLETED | CANCELLED, both terminal.

use crate::error::AppError;
use crate::models::shift::ShiftStatus;

impl ShiftStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ShiftStatus::Completed | ShiftStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: ShiftStatus) -> bool {
        self == ShiftStatus::Active && next.is_terminal()
    }

    /// Rejects writes against a closed shift.
    pub fn ensure_open(self) -> Result<(), AppError> {
        match self {
            ShiftStatus::Active => Ok(()),
            ShiftStatus::Completed => Err(AppError::validation(
                "Shift is completed; no further changes are allowed",
            )),
            ShiftStatus::Cancelled => Err(AppError::validation(
                "Shift is cancelled; no further changes are allowed",
            )),
        }
    }

    pub fn transition(self, next: ShiftStatus) -> Result<ShiftStatus, AppError> {
        if self.can_transition_to(next) {
            return Ok(next);
        }
        Err(AppError::validation(format!(
            "Cannot move shift from {self:?} to {next:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn active_shift_accepts_writes() {
        assert!(ShiftStatus::Active.ensure_open().is_ok());
        assert!(!ShiftStatus::Active.is_terminal());
    }

    #[test]
    fn terminal_shifts_reject_writes_with_bad_request() {
        for status in [ShiftStatus::Completed, ShiftStatus::Cancelled] {
            let err = status.ensure_open().unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn only_active_moves_to_terminal_states() {
        assert_eq!(ShiftStatus::Active.transition(ShiftStatus::Completed).unwrap(), ShiftStatus::Completed);
        assert_eq!(ShiftStatus::Active.transition(ShiftStatus::Cancelled).unwrap(), ShiftStatus::Cancelled);
        assert!(ShiftStatus::Active.transition(ShiftStatus::Active).is_err());
        assert!(ShiftStatus::Completed.transition(ShiftStatus::Cancelled).is_err());
        assert!(ShiftStatus::Cancelled.transition(ShiftStatus::Active).is_err());
        assert!(ShiftStatus::Completed.transition(ShiftStatus::Active).is_err());
    }
}
