//! Error types for rust_motion_planning

use std::fmt;

/// Failure reported by an external collaborator (collision engine, kinematics, IK solver).
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which end of a planning request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    Goal,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Start => write!(f, "start"),
            Endpoint::Goal => write!(f, "goal"),
        }
    }
}

/// Main error type for motion planning
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    /// Malformed joint bounds or a dimension mismatch with the kinematic model
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Start or goal configuration is itself rejected by the validity oracle
    #[error("Invalid {endpoint} configuration: {reason}")]
    InvalidStartOrGoal { endpoint: Endpoint, reason: String },

    /// Budget exhausted without connecting start and goal
    #[error("Planning failed after {iterations} iterations: {reason}")]
    PlanningFailure { iterations: usize, reason: String },

    /// Velocity/acceleration limits cannot move the robot along a segment
    #[error("Trajectory infeasible at segment {segment}: {reason}")]
    TrajectoryInfeasible { segment: usize, reason: String },

    /// Error raised by the collision engine or kinematics evaluator
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl PlanningError {
    /// Whether retrying with another seed or a larger budget may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PlanningError::PlanningFailure { .. })
    }
}

/// Result type alias for planning operations
pub type PlanningResult<T> = Result<T, PlanningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlanningError::PlanningFailure {
            iterations: 10,
            reason: "budget exhausted".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Planning failed after 10 iterations: budget exhausted"
        );

        let err = PlanningError::InvalidStartOrGoal {
            endpoint: Endpoint::Start,
            reason: "in collision".to_string(),
        };
        assert_eq!(format!("{}", err), "Invalid start configuration: in collision");
    }

    #[test]
    fn test_error_from_collaborator() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "engine crashed");
        let err: PlanningError = CollaboratorError::from(io_err).into();
        assert!(matches!(err, PlanningError::Collaborator(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_only_planning_failure_is_recoverable() {
        let err = PlanningError::PlanningFailure { iterations: 0, reason: String::new() };
        assert!(err.is_recoverable());
        assert!(!PlanningError::InvalidModel("dof".to_string()).is_recoverable());
    }
}
