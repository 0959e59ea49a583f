// Motion planning for articulated manipulators

pub mod config_space;
pub mod validity;
pub mod nearest_neighbor;
pub mod tree;
pub mod rrt;
pub mod shortcut;
pub mod time_parameterization;
pub mod request;

pub use config_space::*;
pub use validity::*;
pub use nearest_neighbor::{NearestNeighbors, NeighborIndex, NeighborIndexKind};
pub use rrt::*;
pub use shortcut::*;
pub use time_parameterization::*;
pub use request::*;

#[cfg(test)]
pub(crate) mod test_support {
    use std::f64::consts::PI;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::common::{CollaboratorError, CollisionChecker, Configuration, JointBounds};
    use crate::motion_planning::ConfigurationSpace;

    pub fn arm_space() -> ConfigurationSpace {
        ConfigurationSpace::new(vec![JointBounds::symmetric(PI); 2]).unwrap()
    }

    pub fn q(a: f64, b: f64) -> Configuration {
        Configuration::from_slice(&[a, b])
    }

    /// Obstacles defined directly in a 2-DOF joint space
    #[derive(Debug, Clone, Default)]
    pub struct JointObstacles {
        /// (center joint 0, center joint 1, radius)
        balls: Vec<(f64, f64, f64)>,
        /// Slab around joint 0 = x, open only where joint 1 is above the gap
        walls: Vec<(f64, f64)>,
    }

    impl JointObstacles {
        pub fn single(a: f64, b: f64, radius: f64) -> Self {
            Self { balls: vec![(a, b, radius)], walls: Vec::new() }
        }

        pub fn wall_x(x: f64, gap_above: f64) -> Self {
            Self { balls: Vec::new(), walls: vec![(x, gap_above)] }
        }
    }

    impl CollisionChecker for JointObstacles {
        fn check_collision(&self, q: &Configuration) -> Result<bool, CollaboratorError> {
            let in_ball = self
                .balls
                .iter()
                .any(|&(a, b, r)| (q[0] - a).powi(2) + (q[1] - b).powi(2) <= r * r);
            let in_wall = self
                .walls
                .iter()
                .any(|&(x, gap)| (q[0] - x).abs() <= 0.05 && q[1] <= gap);
            Ok(in_ball || in_wall)
        }
    }

    /// Counts engine queries of the wrapped checker
    pub struct CountingChecker<C> {
        inner: C,
        calls: AtomicUsize,
    }

    impl<C> CountingChecker<C> {
        pub fn new(inner: C) -> Self {
            Self { inner, calls: AtomicUsize::new(0) }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    impl<C: CollisionChecker> CollisionChecker for CountingChecker<C> {
        fn check_collision(&self, q: &Configuration) -> Result<bool, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.inner.check_collision(q)
        }
    }
}
