//! Common traits defining interfaces to the planner's collaborators

use std::sync::Arc;

use nalgebra::Isometry3;
use rand::RngCore;

use crate::common::error::{CollaboratorError, PlanningResult};
use crate::common::types::*;

/// Kinematic model evaluator; the planner only needs DOF count and bounds
pub trait KinematicModel {
    fn degrees_of_freedom(&self) -> usize;

    fn joint_limits(&self) -> Vec<JointBounds>;

    /// Pose of the end effector
    fn forward_kinematics(&self, q: &Configuration) -> Result<Isometry3<f64>, CollaboratorError>;
}

/// Collision geometry engine. `Ok(true)` means a collision is present.
///
/// Engine failures must be returned as `Err`, never mapped to "no collision".
pub trait CollisionChecker {
    fn check_collision(&self, q: &Configuration) -> Result<bool, CollaboratorError>;
}

impl<T: CollisionChecker + ?Sized> CollisionChecker for &T {
    fn check_collision(&self, q: &Configuration) -> Result<bool, CollaboratorError> {
        (**self).check_collision(q)
    }
}

impl<T: CollisionChecker + ?Sized> CollisionChecker for Arc<T> {
    fn check_collision(&self, q: &Configuration) -> Result<bool, CollaboratorError> {
        (**self).check_collision(q)
    }
}

impl<T: CollisionChecker + ?Sized> CollisionChecker for Box<T> {
    fn check_collision(&self, q: &Configuration) -> Result<bool, CollaboratorError> {
        (**self).check_collision(q)
    }
}

/// Inverse kinematics solver converting a task-space pose into candidate goals
pub trait InverseKinematics {
    fn solve(&self, target: &Isometry3<f64>) -> Result<Vec<Configuration>, CollaboratorError>;
}

/// Trait for configuration-space path planners
pub trait PathPlanner {
    /// Plan a path from start to any of the goal candidates
    fn plan_path(
        &self,
        start: &Configuration,
        goals: &[Configuration],
        rng: &mut dyn RngCore,
    ) -> PlanningResult<Path>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFree;

    impl CollisionChecker for AlwaysFree {
        fn check_collision(&self, _q: &Configuration) -> Result<bool, CollaboratorError> {
            Ok(false)
        }
    }

    fn query<C: CollisionChecker>(checker: C) -> bool {
        checker.check_collision(&Configuration::zeros(2)).unwrap()
    }

    #[test]
    fn test_checker_through_handles() {
        let checker = AlwaysFree;
        assert!(!query(&checker));
        assert!(!query(Arc::new(AlwaysFree)));
        let boxed: Box<dyn CollisionChecker> = Box::new(AlwaysFree);
        assert!(!query(boxed));
    }
}
