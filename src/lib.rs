//! RustMotionPlanning - sampling-based motion planning for manipulators
//!
//! This crate plans collision-free joint-space paths with RRT and
//! RRT-Connect, shortens them by shortcutting and turns them into
//! time-stamped trajectories that respect joint velocity and
//! acceleration limits.

// Core modules
pub mod common;

// Algorithm modules
pub mod motion_planning;
pub mod arm_navigation;

// Re-export common types for convenience
pub use common::{Configuration, JointBounds, Path, Trajectory, TrajectoryPoint};
pub use common::{CollisionChecker, InverseKinematics, KinematicModel, PathPlanner};
pub use common::{PlanningError, PlanningResult};
pub use motion_planning::{plan_parallel, plan_request, Goal, PlanningOutcome, PlanningRequest};
