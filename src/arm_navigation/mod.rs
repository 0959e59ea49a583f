// Arm navigation: planar manipulator models for the motion planner

pub mod planar_arm;

pub use planar_arm::*;
