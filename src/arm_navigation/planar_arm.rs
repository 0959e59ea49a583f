//! Planar serial arm
//!
//! Revolute joints about parallel z axes, links lying in the xy-plane.
//! Provides the kinematic model, a closed-form two-link inverse kinematics
//! solver and a collision checker against circular workspace obstacles.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::common::{
    CollaboratorError, CollisionChecker, Configuration, InverseKinematics, JointBounds,
    KinematicModel, Point2D,
};

/// Planar arm with one revolute joint per link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanarArm {
    pub link_lengths: Vec<f64>,
    pub limits: Vec<JointBounds>,
}

impl PlanarArm {
    pub fn new(link_lengths: Vec<f64>, limits: Vec<JointBounds>) -> Result<Self, CollaboratorError> {
        if link_lengths.is_empty() || link_lengths.len() != limits.len() {
            return Err(format!(
                "{} links need as many joint limits, got {}",
                link_lengths.len(),
                limits.len()
            )
            .into());
        }
        if let Some(l) = link_lengths.iter().find(|l| !(l.is_finite() && **l > 0.0)) {
            return Err(format!("link lengths must be positive, got {}", l).into());
        }
        Ok(Self { link_lengths, limits })
    }

    /// Two unit links with joints limited to [-pi, pi]
    pub fn two_link() -> Self {
        Self {
            link_lengths: vec![1.0, 1.0],
            limits: vec![JointBounds::symmetric(std::f64::consts::PI); 2],
        }
    }

    pub fn reach(&self) -> f64 {
        self.link_lengths.iter().sum()
    }

    fn check_dof(&self, q: &Configuration) -> Result<(), CollaboratorError> {
        if q.dof() != self.link_lengths.len() {
            return Err(format!(
                "arm has {} joints, configuration has {}",
                self.link_lengths.len(),
                q.dof()
            )
            .into());
        }
        Ok(())
    }

    /// Base, every joint and the end effector, in order
    pub fn joint_positions(&self, q: &Configuration) -> Result<Vec<Point2D>, CollaboratorError> {
        self.check_dof(q)?;
        let mut positions = Vec::with_capacity(self.link_lengths.len() + 1);
        let mut p = Point2D::origin();
        let mut angle = 0.0;
        positions.push(p);
        for (length, theta) in self.link_lengths.iter().zip(q.iter()) {
            angle += theta;
            p = Point2D::new(p.x + length * angle.cos(), p.y + length * angle.sin());
            positions.push(p);
        }
        Ok(positions)
    }
}

impl KinematicModel for PlanarArm {
    fn degrees_of_freedom(&self) -> usize {
        self.link_lengths.len()
    }

    fn joint_limits(&self) -> Vec<JointBounds> {
        self.limits.clone()
    }

    fn forward_kinematics(&self, q: &Configuration) -> Result<Isometry3<f64>, CollaboratorError> {
        let positions = self.joint_positions(q)?;
        let end = positions[positions.len() - 1];
        let heading: f64 = q.iter().sum();
        Ok(Isometry3::from_parts(
            Translation3::new(end.x, end.y, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), heading),
        ))
    }
}

impl InverseKinematics for PlanarArm {
    /// Position-only IK for two links: elbow-down and elbow-up solutions
    /// that lie inside the joint limits. Unreachable targets give no solutions.
    fn solve(&self, target: &Isometry3<f64>) -> Result<Vec<Configuration>, CollaboratorError> {
        if self.link_lengths.len() != 2 {
            return Err(format!(
                "closed-form IK needs a two-link arm, this one has {} links",
                self.link_lengths.len()
            )
            .into());
        }
        let (l1, l2) = (self.link_lengths[0], self.link_lengths[1]);
        let (x, y) = (target.translation.x, target.translation.y);

        // Law of cosines
        let cos_theta2 = (x.powi(2) + y.powi(2) - l1.powi(2) - l2.powi(2)) / (2.0 * l1 * l2);
        if !(-1.0..=1.0).contains(&cos_theta2) {
            return Ok(Vec::new());
        }
        let theta2 = cos_theta2.acos();

        let mut solutions: Vec<Configuration> = Vec::new();
        for theta2 in [theta2, -theta2] {
            let theta1 = y.atan2(x) - (l2 * theta2.sin()).atan2(l1 + l2 * theta2.cos());
            let q = Configuration::from_slice(&[wrap_angle(theta1), theta2]);
            let in_limits = q.iter().zip(&self.limits).all(|(v, b)| b.contains(*v));
            if in_limits && !solutions.contains(&q) {
                solutions.push(q);
            }
        }
        Ok(solutions)
    }
}

/// Wrap to (-pi, pi]
fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::PI;
    let mut a = angle;
    while a > PI {
        a -= 2.0 * PI;
    }
    while a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Circular obstacle in the arm's plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleObstacle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl CircleObstacle {
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Links modelled as capsules of `link_radius` around each link segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanarArmCollisionChecker {
    pub arm: PlanarArm,
    pub obstacles: Vec<CircleObstacle>,
    pub link_radius: f64,
}

impl PlanarArmCollisionChecker {
    pub fn new(arm: PlanarArm, obstacles: Vec<CircleObstacle>, link_radius: f64) -> Self {
        Self {
            arm,
            obstacles,
            link_radius,
        }
    }
}

impl CollisionChecker for PlanarArmCollisionChecker {
    fn check_collision(&self, q: &Configuration) -> Result<bool, CollaboratorError> {
        let positions = self.arm.joint_positions(q)?;
        let hit = positions.windows(2).any(|link| {
            self.obstacles.iter().any(|o| {
                point_segment_distance(&o.center(), &link[0], &link[1]) <= o.radius + self.link_radius
            })
        });
        Ok(hit)
    }
}

fn point_segment_distance(p: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(&Point2D::new(a.x + t * dx, a.y + t * dy))
}
