//! Validity oracle
//!
//! Sole authority on collision safety: every state and edge accepted by the
//! planner or the shortcutter has been checked here. Joint limits are checked
//! locally, collisions are delegated to the external engine.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

use crate::common::{CollisionChecker, Configuration, PlanningError, PlanningResult};
use crate::motion_planning::ConfigurationSpace;

// Upper bound on discretization steps for a single edge
const MAX_EDGE_STEPS: usize = 1 << 24;

/// Result of checking a single discretized sample along an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleValidity {
    Valid,
    /// Out of bounds or in collision
    Invalid,
    /// Not evaluated because an earlier sample was invalid
    NotChecked,
}

/// Per-sample outcome of an edge check, ordered from `a` toward `b`
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeReport {
    pub samples: Vec<SampleValidity>,
}

impl EdgeReport {
    /// An empty report checked nothing and is never valid
    pub fn is_valid(&self) -> bool {
        !self.samples.is_empty() && self.samples.iter().all(|s| *s == SampleValidity::Valid)
    }

    /// Index of the first invalid sample, if any
    pub fn first_invalid(&self) -> Option<usize> {
        self.samples.iter().position(|s| *s == SampleValidity::Invalid)
    }
}

/// Collision and joint-limit oracle over a configuration space
pub struct ValidityOracle<'a, C> {
    space: &'a ConfigurationSpace,
    checker: C,
    resolution: f64,
    states_checked: AtomicUsize,
}

impl<'a, C: CollisionChecker> ValidityOracle<'a, C> {
    /// `resolution` is the largest metric step between checked samples on an edge
    pub fn new(space: &'a ConfigurationSpace, checker: C, resolution: f64) -> PlanningResult<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(PlanningError::InvalidParameter(format!(
                "validation resolution must be positive and finite, got {}",
                resolution
            )));
        }
        Ok(Self {
            space,
            checker,
            resolution,
            states_checked: AtomicUsize::new(0),
        })
    }

    pub fn space(&self) -> &'a ConfigurationSpace {
        self.space
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of states evaluated so far
    pub fn states_checked(&self) -> usize {
        self.states_checked.load(Ordering::Relaxed)
    }

    /// Joint-limit check followed by the collision engine query
    pub fn is_valid(&self, q: &Configuration) -> PlanningResult<bool> {
        self.space.check_dimension(q)?;
        self.states_checked.fetch_add(1, Ordering::Relaxed);
        if !self.space.contains(q) {
            trace!("state out of joint bounds: {:?}", q.as_slice());
            return Ok(false);
        }
        let in_collision = self.checker.check_collision(q)?;
        Ok(!in_collision)
    }

    /// Samples from `a` to `b` (both included) no further apart than the resolution
    pub fn discretize(&self, a: &Configuration, b: &Configuration) -> PlanningResult<Vec<Configuration>> {
        let n = self.step_count(a, b)?;
        Ok((0..=n)
            .map(|k| self.space.interpolate(a, b, k as f64 / n as f64))
            .collect())
    }

    /// Checks every discretized sample from `a` toward `b`, stopping at the first invalid one
    pub fn is_valid_edge(&self, a: &Configuration, b: &Configuration) -> PlanningResult<bool> {
        self.space.check_dimension(a)?;
        self.space.check_dimension(b)?;
        let n = self.step_count(a, b)?;
        for k in 0..=n {
            let q = self.space.interpolate(a, b, k as f64 / n as f64);
            if !self.is_valid(&q)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Like [`is_valid_edge`](Self::is_valid_edge) but reports the state of every sample
    pub fn check_edge(&self, a: &Configuration, b: &Configuration) -> PlanningResult<EdgeReport> {
        self.space.check_dimension(a)?;
        self.space.check_dimension(b)?;
        let n = self.step_count(a, b)?;
        let len = n.checked_add(1).ok_or_else(|| {
            PlanningError::InvalidParameter(format!("edge needs {} steps", n))
        })?;
        let mut samples = vec![SampleValidity::NotChecked; len];
        for (k, slot) in samples.iter_mut().enumerate() {
            let q = self.space.interpolate(a, b, k as f64 / n as f64);
            if self.is_valid(&q)? {
                *slot = SampleValidity::Valid;
            } else {
                *slot = SampleValidity::Invalid;
                break;
            }
        }
        Ok(EdgeReport { samples })
    }

    /// Steps needed so consecutive samples are at most `resolution` apart, at least 1
    fn step_count(&self, a: &Configuration, b: &Configuration) -> PlanningResult<usize> {
        let d = self.space.distance(a, b);
        let steps = (d / self.resolution).ceil();
        if !steps.is_finite() || steps > MAX_EDGE_STEPS as f64 {
            return Err(PlanningError::InvalidParameter(format!(
                "edge of length {} needs {} checks at resolution {}, limit is {}",
                d, steps, self.resolution, MAX_EDGE_STEPS
            )));
        }
        Ok((steps as usize).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{CollaboratorError, JointBounds};
    use approx::assert_relative_eq;

    /// Collision when the first joint exceeds a threshold
    struct Wall(f64);

    impl CollisionChecker for Wall {
        fn check_collision(&self, q: &Configuration) -> Result<bool, CollaboratorError> {
            Ok(q[0] > self.0)
        }
    }

    struct Broken;

    impl CollisionChecker for Broken {
        fn check_collision(&self, _q: &Configuration) -> Result<bool, CollaboratorError> {
            Err("mesh not loaded".into())
        }
    }

    fn space() -> ConfigurationSpace {
        ConfigurationSpace::new(vec![JointBounds::symmetric(2.0); 2]).unwrap()
    }

    fn q(x: f64, y: f64) -> Configuration {
        Configuration::from_slice(&[x, y])
    }

    #[test]
    fn test_resolution_is_required_positive() {
        let space = space();
        assert!(ValidityOracle::new(&space, Wall(1.0), 0.0).is_err());
        assert!(ValidityOracle::new(&space, Wall(1.0), f64::NAN).is_err());
    }

    #[test]
    fn test_joint_limits_checked() {
        let space = space();
        let oracle = ValidityOracle::new(&space, Wall(10.0), 0.1).unwrap();
        assert!(oracle.is_valid(&q(0.0, 0.0)).unwrap());
        assert!(!oracle.is_valid(&q(0.0, 2.5)).unwrap());
    }

    #[test]
    fn test_dimension_mismatch_is_model_error() {
        let space = space();
        let oracle = ValidityOracle::new(&space, Wall(10.0), 0.1).unwrap();
        let result = oracle.is_valid(&Configuration::from_slice(&[0.0]));
        assert!(matches!(result, Err(PlanningError::InvalidModel(_))));
    }

    #[test]
    fn test_engine_error_is_not_valid() {
        let space = space();
        let oracle = ValidityOracle::new(&space, Broken, 0.1).unwrap();
        assert!(matches!(
            oracle.is_valid(&q(0.0, 0.0)),
            Err(PlanningError::Collaborator(_))
        ));
        assert!(oracle.is_valid_edge(&q(0.0, 0.0), &q(1.0, 0.0)).is_err());
    }

    #[test]
    fn test_discretization_respects_resolution() {
        let space = space();
        let oracle = ValidityOracle::new(&space, Wall(10.0), 0.3).unwrap();
        let samples = oracle.discretize(&q(0.0, 0.0), &q(1.0, 0.0)).unwrap();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0], q(0.0, 0.0));
        assert_eq!(samples[4], q(1.0, 0.0));
        for w in samples.windows(2) {
            assert!(space.distance(&w[0], &w[1]) <= 0.3 + 1e-12);
        }
    }

    #[test]
    fn test_edge_short_circuits_in_order() {
        let space = space();
        let oracle = ValidityOracle::new(&space, Wall(0.5), 0.25).unwrap();
        let report = oracle.check_edge(&q(0.0, 0.0), &q(1.0, 0.0)).unwrap();
        assert_eq!(
            report.samples,
            vec![
                SampleValidity::Valid,
                SampleValidity::Valid,
                SampleValidity::Valid,
                SampleValidity::Invalid,
                SampleValidity::NotChecked,
            ]
        );
        assert_eq!(report.first_invalid(), Some(3));
        assert_eq!(oracle.states_checked(), 4);
    }

    #[test]
    fn test_thin_obstacle_between_endpoints() {
        struct Slab;
        impl CollisionChecker for Slab {
            fn check_collision(&self, q: &Configuration) -> Result<bool, CollaboratorError> {
                Ok((q[0] - 0.5).abs() < 0.05)
            }
        }
        let space = space();
        let fine = ValidityOracle::new(&space, Slab, 0.05).unwrap();
        assert!(oracle_rejects(&fine));
        let coarse = ValidityOracle::new(&space, Slab, 1.0).unwrap();
        assert!(!oracle_rejects(&coarse));
        assert_relative_eq!(coarse.resolution(), 1.0);
    }

    fn oracle_rejects<C: CollisionChecker>(oracle: &ValidityOracle<'_, C>) -> bool {
        !oracle.is_valid_edge(&q(0.0, 0.0), &q(1.0, 0.0)).unwrap()
    }

    #[test]
    fn test_tiny_resolution_fails_loudly() {
        struct Everywhere;
        impl CollisionChecker for Everywhere {
            fn check_collision(&self, _q: &Configuration) -> Result<bool, CollaboratorError> {
                Ok(true)
            }
        }
        let space = space();
        let oracle = ValidityOracle::new(&space, Everywhere, 1e-300).unwrap();
        assert!(matches!(
            oracle.is_valid_edge(&q(0.0, 0.0), &q(1.0, 0.0)),
            Err(PlanningError::InvalidParameter(_))
        ));
        assert!(oracle.check_edge(&q(0.0, 0.0), &q(1.0, 0.0)).is_err());
        assert!(oracle.discretize(&q(0.0, 0.0), &q(1.0, 0.0)).is_err());
        assert_eq!(oracle.states_checked(), 0);
    }

    #[test]
    fn test_empty_report_is_not_valid() {
        assert!(!EdgeReport { samples: Vec::new() }.is_valid());
    }
}
