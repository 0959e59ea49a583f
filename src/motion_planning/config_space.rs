//! Configuration space of an articulated manipulator
//!
//! Holds per-joint bounds and the weighted Euclidean metric used by
//! every other planning stage. Read-only once constructed.

use nalgebra::DVector;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::Serialize;

use crate::common::{Configuration, JointBounds, KinematicModel, PlanningError, PlanningResult};

/// Joint bounds plus distance metric over the configuration vector
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationSpace {
    bounds: Vec<JointBounds>,
    weights: DVector<f64>,
}

impl ConfigurationSpace {
    /// Create a space with unit joint weights
    pub fn new(bounds: Vec<JointBounds>) -> PlanningResult<Self> {
        if bounds.is_empty() {
            return Err(PlanningError::InvalidModel(
                "configuration space needs at least one joint".to_string(),
            ));
        }
        for (i, b) in bounds.iter().enumerate() {
            if !b.lower.is_finite() || !b.upper.is_finite() {
                return Err(PlanningError::InvalidModel(format!(
                    "joint {} has non-finite bounds [{}, {}]",
                    i, b.lower, b.upper
                )));
            }
            if b.lower > b.upper {
                return Err(PlanningError::InvalidModel(format!(
                    "joint {} lower bound {} exceeds upper bound {}",
                    i, b.lower, b.upper
                )));
            }
        }
        let weights = DVector::from_element(bounds.len(), 1.0);
        Ok(Self { bounds, weights })
    }

    /// Build the space from a kinematic model's joint limits
    pub fn from_model<M: KinematicModel + ?Sized>(model: &M) -> PlanningResult<Self> {
        let bounds = model.joint_limits();
        if bounds.len() != model.degrees_of_freedom() {
            return Err(PlanningError::InvalidModel(format!(
                "model reports {} degrees of freedom but {} joint limits",
                model.degrees_of_freedom(),
                bounds.len()
            )));
        }
        Self::new(bounds)
    }

    /// Per-joint metric weights, e.g. to balance revolute against prismatic joints
    pub fn with_weights(mut self, weights: Vec<f64>) -> PlanningResult<Self> {
        if weights.len() != self.bounds.len() {
            return Err(PlanningError::InvalidModel(format!(
                "expected {} joint weights, got {}",
                self.bounds.len(),
                weights.len()
            )));
        }
        if let Some(w) = weights.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(PlanningError::InvalidModel(format!(
                "joint weights must be positive and finite, got {}",
                w
            )));
        }
        self.weights = DVector::from_vec(weights);
        Ok(self)
    }

    pub fn dof(&self) -> usize {
        self.bounds.len()
    }

    pub fn bounds(&self) -> &[JointBounds] {
        &self.bounds
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    /// Fails with `InvalidModel` when `q` has the wrong number of joints
    pub fn check_dimension(&self, q: &Configuration) -> PlanningResult<()> {
        if q.dof() != self.dof() {
            return Err(PlanningError::InvalidModel(format!(
                "configuration has {} joints, space has {}",
                q.dof(),
                self.dof()
            )));
        }
        Ok(())
    }

    /// Whether every joint value lies within its bounds
    pub fn contains(&self, q: &Configuration) -> bool {
        q.dof() == self.dof()
            && q.iter().zip(self.bounds.iter()).all(|(&v, b)| b.contains(v))
    }

    pub fn clamp(&self, q: &Configuration) -> Configuration {
        let values = q
            .iter()
            .zip(self.bounds.iter())
            .map(|(&v, b)| v.clamp(b.lower, b.upper))
            .collect::<Vec<_>>();
        Configuration::from(values)
    }

    /// Uniform sample within bounds
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Configuration {
        let values = self
            .bounds
            .iter()
            .map(|b| Uniform::new_inclusive(b.lower, b.upper).sample(rng))
            .collect::<Vec<_>>();
        Configuration::from(values)
    }

    /// With probability `p_goal_bias` returns one of `targets`, otherwise a uniform sample
    pub fn sample_biased<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        targets: &[Configuration],
        p_goal_bias: f64,
    ) -> Configuration {
        if !targets.is_empty() && rng.gen::<f64>() < p_goal_bias {
            let i = rng.gen_range(0..targets.len());
            return targets[i].clone();
        }
        self.sample(rng)
    }

    /// Weighted Euclidean distance
    pub fn distance(&self, a: &Configuration, b: &Configuration) -> f64 {
        a.iter()
            .zip(b.iter())
            .zip(self.weights.iter())
            .map(|((x, y), w)| w * (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Point at fraction `t` of the straight segment from `a` to `b`
    pub fn interpolate(&self, a: &Configuration, b: &Configuration, t: f64) -> Configuration {
        if t <= 0.0 {
            return a.clone();
        }
        if t >= 1.0 {
            return b.clone();
        }
        let q = a.as_vector() + (b.as_vector() - a.as_vector()) * t;
        Configuration::new(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::PI;

    fn arm_space() -> ConfigurationSpace {
        ConfigurationSpace::new(vec![JointBounds::symmetric(PI); 2]).unwrap()
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let result = ConfigurationSpace::new(vec![JointBounds::new(1.0, -1.0)]);
        assert!(matches!(result, Err(PlanningError::InvalidModel(_))));
    }

    #[test]
    fn test_rejects_bad_weights() {
        assert!(arm_space().with_weights(vec![1.0]).is_err());
        assert!(arm_space().with_weights(vec![1.0, 0.0]).is_err());
        assert!(arm_space().with_weights(vec![1.0, 4.0]).is_ok());
    }

    #[test]
    fn test_samples_stay_in_bounds() {
        let space = ConfigurationSpace::new(vec![
            JointBounds::new(-1.0, 2.0),
            JointBounds::new(0.5, 0.5),
            JointBounds::new(-0.1, 0.3),
        ])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            assert!(space.contains(&space.sample(&mut rng)));
        }
    }

    #[test]
    fn test_goal_bias_returns_target() {
        let space = arm_space();
        let goal = Configuration::from_slice(&[1.0, 1.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let q = space.sample_biased(&mut rng, std::slice::from_ref(&goal), 1.0);
        assert_eq!(q, goal);
    }

    #[test]
    fn test_weighted_distance() {
        let space = arm_space().with_weights(vec![4.0, 1.0]).unwrap();
        let a = Configuration::from_slice(&[0.0, 0.0]);
        let b = Configuration::from_slice(&[1.0, 0.0]);
        assert_relative_eq!(space.distance(&a, &b), 2.0);
        assert_relative_eq!(space.distance(&b, &a), 2.0);
        assert_eq!(space.distance(&a, &a), 0.0);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let space = arm_space();
        let a = Configuration::from_slice(&[0.0, -1.0]);
        let b = Configuration::from_slice(&[2.0, 1.0]);
        let mid = space.interpolate(&a, &b, 0.5);
        assert_relative_eq!(mid[0], 1.0);
        assert_relative_eq!(mid[1], 0.0);
        assert_eq!(space.interpolate(&a, &b, 2.0), b);
    }
}
