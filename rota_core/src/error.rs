use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong while turning one request into a schedule.
///
/// `Infeasible` is a legitimate business outcome, not a defect: the input
/// admits no assignment. Retry policy, if any, belongs to the caller.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Malformed or inconsistent input. Never reaches the solver.
    #[error("invalid `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// The model would exceed the configured build limits.
    #[error(
        "model would need {estimated} {quantity} but the limit is {limit}; \
         reduce tasks, instances or nurses"
    )]
    ResourceExceeded {
        quantity: &'static str,
        estimated: usize,
        limit: usize,
    },

    /// The constraints admit no assignment.
    #[error("no feasible schedule exists for this input")]
    Infeasible,

    /// The solver did not finish within its deadline.
    #[error("solver exceeded the {deadline:?} deadline")]
    Timeout { deadline: Duration },

    /// The solver itself failed.
    #[error("solver failure: {0}")]
    Solver(String),
}

impl ScheduleError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        ScheduleError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable label for each variant, used by the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            ScheduleError::Validation { .. } => "ValidationError",
            ScheduleError::ResourceExceeded { .. } => "ResourceExceeded",
            ScheduleError::Infeasible => "Infeasible",
            ScheduleError::Timeout { .. } => "Timeout",
            ScheduleError::Solver(_) => "SolverError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            ScheduleError::validation("tasks", "boom").kind(),
            "ValidationError"
        );
        assert_eq!(ScheduleError::Infeasible.kind(), "Infeasible");
        assert_eq!(
            ScheduleError::Timeout {
                deadline: Duration::from_secs(1)
            }
            .kind(),
            "Timeout"
        );
        assert_eq!(ScheduleError::Solver("x".into()).kind(), "SolverError");
    }

    #[test]
    fn validation_message_names_the_field() {
        let err = ScheduleError::validation("minimum_separation", "out of order");
        assert_eq!(
            err.to_string(),
            "invalid `minimum_separation`: out of order"
        );
    }
}
