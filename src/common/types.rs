//! Common types used throughout rust_motion_planning

use itertools::Itertools;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::motion_planning::ConfigurationSpace;

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

/// Lower/upper limit of a single joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointBounds {
    pub lower: f64,
    pub upper: f64,
}

impl JointBounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Symmetric bounds `[-limit, limit]`
    pub fn symmetric(limit: f64) -> Self {
        Self { lower: -limit, upper: limit }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Joint-value vector of the manipulator, one entry per actuated joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "Vec<f64>")]
pub struct Configuration(DVector<f64>);

impl Configuration {
    pub fn new(values: DVector<f64>) -> Self {
        Self(values)
    }

    pub fn from_slice(values: &[f64]) -> Self {
        Self(DVector::from_column_slice(values))
    }

    pub fn zeros(dof: usize) -> Self {
        Self(DVector::zeros(dof))
    }

    pub fn dof(&self) -> usize {
        self.0.len()
    }

    pub fn as_vector(&self) -> &DVector<f64> {
        &self.0
    }

    pub fn as_slice(&self) -> &[f64] {
        self.0.as_slice()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }

    pub fn into_vector(self) -> DVector<f64> {
        self.0
    }
}

impl std::ops::Index<usize> for Configuration {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl From<Vec<f64>> for Configuration {
    fn from(values: Vec<f64>) -> Self {
        Self(DVector::from_vec(values))
    }
}

impl From<Configuration> for Vec<f64> {
    fn from(q: Configuration) -> Self {
        q.0.as_slice().to_vec()
    }
}

impl From<DVector<f64>> for Configuration {
    fn from(values: DVector<f64>) -> Self {
        Self(values)
    }
}

/// Configuration-space path, start to goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub waypoints: Vec<Configuration>,
}

impl Path {
    pub fn new() -> Self {
        Self { waypoints: Vec::new() }
    }

    pub fn from_waypoints(waypoints: Vec<Configuration>) -> Self {
        Self { waypoints }
    }

    pub fn push(&mut self, q: Configuration) {
        self.waypoints.push(q);
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn first(&self) -> Option<&Configuration> {
        self.waypoints.first()
    }

    pub fn last(&self) -> Option<&Configuration> {
        self.waypoints.last()
    }

    /// Number of straight segments between waypoints
    pub fn segment_count(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }

    /// Sum of per-edge distances under the space metric
    pub fn total_length(&self, space: &ConfigurationSpace) -> f64 {
        self.waypoints
            .iter()
            .tuple_windows()
            .map(|(a, b)| space.distance(a, b))
            .sum()
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::new()
    }
}

/// Single time-stamped sample of a trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub time: f64,
    pub configuration: Configuration,
    pub velocity: Option<DVector<f64>>,
}

/// Time-parameterized path; time is non-decreasing and starts at 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.time)
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.time).collect()
    }

    /// Configuration at `time`, linearly interpolated between neighbouring samples
    pub fn configuration_at(&self, time: f64) -> Option<Configuration> {
        let first = self.points.first()?;
        if time <= first.time {
            return Some(first.configuration.clone());
        }
        for (a, b) in self.points.iter().tuple_windows() {
            if time <= b.time {
                let dt = b.time - a.time;
                if dt <= 0.0 {
                    return Some(b.configuration.clone());
                }
                let s = (time - a.time) / dt;
                let q = a.configuration.as_vector()
                    + (b.configuration.as_vector() - a.configuration.as_vector()) * s;
                return Some(Configuration::new(q));
            }
        }
        self.points.last().map(|p| p.configuration.clone())
    }
}

impl Default for Trajectory {
    fn default() -> Self {
        Self::new()
    }
}
