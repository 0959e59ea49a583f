//! Trajectory time-parameterization
//!
//! Every segment of the path is traversed with a rest-to-rest trapezoidal
//! profile of a scalar path parameter `s` in [0, 1]. All joints share that
//! profile, so the robot stays on the straight segment the oracle validated,
//! and the slowest joint sets the segment duration.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{Configuration, Path, PlanningError, PlanningResult, Trajectory, TrajectoryPoint};

// Joint displacements below this are treated as no motion
const DISPLACEMENT_EPS: f64 = 1e-12;

/// Per-joint kinematic limits and output sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub max_velocities: Vec<f64>,
    pub max_accelerations: Vec<f64>,
    /// Spacing of interpolated samples; `None` emits only the waypoints
    #[serde(default)]
    pub sample_period: Option<f64>,
}

impl TimingConfig {
    pub fn new(max_velocities: Vec<f64>, max_accelerations: Vec<f64>) -> Self {
        Self {
            max_velocities,
            max_accelerations,
            sample_period: None,
        }
    }

    /// Same limits on every joint
    pub fn uniform(dof: usize, max_velocity: f64, max_acceleration: f64) -> Self {
        Self::new(vec![max_velocity; dof], vec![max_acceleration; dof])
    }

    pub fn with_sample_period(mut self, period: f64) -> Self {
        self.sample_period = Some(period);
        self
    }

    pub fn validate(&self, dof: usize) -> PlanningResult<()> {
        if self.max_velocities.len() != dof || self.max_accelerations.len() != dof {
            return Err(PlanningError::InvalidParameter(format!(
                "expected {} velocity and acceleration limits, got {} and {}",
                dof,
                self.max_velocities.len(),
                self.max_accelerations.len()
            )));
        }
        let limits = self.max_velocities.iter().chain(self.max_accelerations.iter());
        if let Some(l) = limits.into_iter().find(|l| !(l.is_finite() && **l >= 0.0)) {
            return Err(PlanningError::InvalidParameter(format!(
                "joint limits must be non-negative and finite, got {}",
                l
            )));
        }
        if let Some(p) = self.sample_period {
            if !(p.is_finite() && p > 0.0) {
                return Err(PlanningError::InvalidParameter(format!(
                    "sample period must be positive, got {}",
                    p
                )));
            }
        }
        Ok(())
    }
}

/// Rest-to-rest trapezoidal (or triangular) profile over s in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapezoidalProfile {
    pub acceleration: f64,
    pub peak_rate: f64,
    pub accel_time: f64,
    pub cruise_time: f64,
}

impl TrapezoidalProfile {
    /// Fastest profile covering s = 0..1 with rate and acceleration bounds
    pub fn new(max_rate: f64, max_acceleration: f64) -> Self {
        if max_rate * max_rate / max_acceleration >= 1.0 {
            // Cannot reach the rate limit: triangular profile
            let accel_time = (1.0 / max_acceleration).sqrt();
            Self {
                acceleration: max_acceleration,
                peak_rate: max_acceleration * accel_time,
                accel_time,
                cruise_time: 0.0,
            }
        } else {
            let accel_time = max_rate / max_acceleration;
            Self {
                acceleration: max_acceleration,
                peak_rate: max_rate,
                accel_time,
                cruise_time: (1.0 - max_rate * accel_time) / max_rate,
            }
        }
    }

    pub fn duration(&self) -> f64 {
        2.0 * self.accel_time + self.cruise_time
    }

    /// Path parameter and its rate at time `t` since the segment start
    pub fn evaluate(&self, t: f64) -> (f64, f64) {
        let total = self.duration();
        let t = t.clamp(0.0, total);
        let a = self.acceleration;
        if t < self.accel_time {
            (0.5 * a * t * t, a * t)
        } else if t < self.accel_time + self.cruise_time {
            let s0 = 0.5 * a * self.accel_time * self.accel_time;
            (s0 + self.peak_rate * (t - self.accel_time), self.peak_rate)
        } else {
            let remaining = total - t;
            (1.0 - 0.5 * a * remaining * remaining, a * remaining)
        }
    }
}

/// Assign time stamps to `path` so no joint exceeds its limits
pub fn parameterize(path: &Path, config: &TimingConfig) -> PlanningResult<Trajectory> {
    let mut trajectory = Trajectory::new();
    let first = match path.first() {
        Some(q) => q,
        None => return Ok(trajectory),
    };
    config.validate(first.dof())?;

    let dof = first.dof();
    trajectory.points.push(TrajectoryPoint {
        time: 0.0,
        configuration: first.clone(),
        velocity: Some(DVector::zeros(dof)),
    });

    let mut t0 = 0.0;
    for (segment, w) in path.waypoints.windows(2).enumerate() {
        let (a, b) = (&w[0], &w[1]);
        if a.dof() != dof || b.dof() != dof {
            return Err(PlanningError::InvalidModel(format!(
                "waypoint dimension changes along segment {}",
                segment
            )));
        }
        let delta = b.as_vector() - a.as_vector();
        let profile = match segment_profile(&delta, config, segment)? {
            Some(profile) => profile,
            None => {
                // Repeated waypoint: kept, at the same time stamp
                trajectory.points.push(TrajectoryPoint {
                    time: t0,
                    configuration: b.clone(),
                    velocity: Some(DVector::zeros(dof)),
                });
                continue;
            }
        };
        let duration = profile.duration();

        if let Some(period) = config.sample_period {
            let mut k = 1;
            while (k as f64) * period < duration {
                let t = k as f64 * period;
                let (s, rate) = profile.evaluate(t);
                trajectory.points.push(TrajectoryPoint {
                    time: t0 + t,
                    configuration: Configuration::new(a.as_vector() + &delta * s),
                    velocity: Some(&delta * rate),
                });
                k += 1;
            }
        }

        t0 += duration;
        trajectory.points.push(TrajectoryPoint {
            time: t0,
            configuration: b.clone(),
            velocity: Some(DVector::zeros(dof)),
        });
    }

    debug!(
        "time-parameterized {} waypoints into {} samples over {:.3} s",
        path.len(),
        trajectory.len(),
        trajectory.duration()
    );
    Ok(trajectory)
}

/// Synchronized profile for one segment, `None` for a zero-length segment
fn segment_profile(
    delta: &DVector<f64>,
    config: &TimingConfig,
    segment: usize,
) -> PlanningResult<Option<TrapezoidalProfile>> {
    let mut max_rate = f64::INFINITY;
    let mut max_accel = f64::INFINITY;
    for (joint, d) in delta.iter().enumerate() {
        let d = d.abs();
        if d <= DISPLACEMENT_EPS {
            continue;
        }
        let (v, a) = (config.max_velocities[joint], config.max_accelerations[joint]);
        if v <= 0.0 || a <= 0.0 {
            return Err(PlanningError::TrajectoryInfeasible {
                segment,
                reason: format!(
                    "joint {} must move {:.6} but has velocity limit {} and acceleration limit {}",
                    joint, d, v, a
                ),
            });
        }
        max_rate = max_rate.min(v / d);
        max_accel = max_accel.min(a / d);
    }
    if max_rate.is_infinite() {
        return Ok(None);
    }
    Ok(Some(TrapezoidalProfile::new(max_rate, max_accel)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn path(points: &[[f64; 2]]) -> Path {
        Path::from_waypoints(points.iter().map(|p| Configuration::from_slice(p)).collect())
    }

    #[test]
    fn test_trapezoid_with_cruise() {
        // 1 rad at 0.5 rad/s, 1 rad/s^2: 0.5 s ramp, 1.5 s cruise, 0.5 s ramp
        let profile = TrapezoidalProfile::new(0.5, 1.0);
        assert_relative_eq!(profile.duration(), 2.5);
        assert_relative_eq!(profile.evaluate(2.5).0, 1.0);
        assert_relative_eq!(profile.evaluate(1.25).1, 0.5);
    }

    #[test]
    fn test_triangular_profile() {
        let profile = TrapezoidalProfile::new(10.0, 1.0);
        assert_relative_eq!(profile.duration(), 2.0);
        assert_relative_eq!(profile.evaluate(1.0).0, 0.5);
        assert_relative_eq!(profile.peak_rate, 1.0);
    }

    #[test]
    fn test_timestamps_start_at_zero_and_increase() {
        let config = TimingConfig::uniform(2, 1.0, 2.0).with_sample_period(0.05);
        let traj = parameterize(&path(&[[0.0, 0.0], [1.0, 0.5], [1.0, 1.5], [-0.5, 1.0]]), &config).unwrap();
        assert_eq!(traj.points[0].time, 0.0);
        for w in traj.points.windows(2) {
            assert!(w[1].time >= w[0].time);
        }
        assert_eq!(traj.points.last().unwrap().configuration, Configuration::from_slice(&[-0.5, 1.0]));
    }

    #[test]
    fn test_limits_are_respected() {
        let config = TimingConfig::new(vec![0.8, 0.3], vec![1.5, 0.4]).with_sample_period(0.01);
        let traj = parameterize(&path(&[[0.0, 0.0], [1.0, 0.2], [0.2, 0.9]]), &config).unwrap();
        for p in &traj.points {
            let v = p.velocity.as_ref().unwrap();
            assert!(v[0].abs() <= 0.8 + 1e-9);
            assert!(v[1].abs() <= 0.3 + 1e-9);
        }
        for w in traj.points.windows(2) {
            let dt = w[1].time - w[0].time;
            if dt > 1e-9 {
                let dv = w[1].velocity.as_ref().unwrap() - w[0].velocity.as_ref().unwrap();
                assert!(dv[0].abs() / dt <= 1.5 + 1e-6);
                assert!(dv[1].abs() / dt <= 0.4 + 1e-6);
            }
        }
    }

    #[test]
    fn test_samples_stay_on_segment() {
        let config = TimingConfig::uniform(2, 1.0, 1.0).with_sample_period(0.1);
        let traj = parameterize(&path(&[[0.0, 0.0], [2.0, 1.0]]), &config).unwrap();
        for p in &traj.points {
            assert_relative_eq!(p.configuration[1] * 2.0, p.configuration[0], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_limit_is_infeasible() {
        let config = TimingConfig::new(vec![1.0, 0.0], vec![1.0, 1.0]);
        let result = parameterize(&path(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]), &config);
        match result {
            Err(PlanningError::TrajectoryInfeasible { segment, .. }) => assert_eq!(segment, 1),
            other => panic!("expected infeasible trajectory, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_limit_is_rejected() {
        let config = TimingConfig::uniform(2, -1.0, 1.0);
        let result = parameterize(&path(&[[0.0, 0.0], [1.0, 0.0]]), &config);
        assert!(matches!(result, Err(PlanningError::InvalidParameter(_))));
    }

    #[test]
    fn test_repeated_waypoint_adds_no_time() {
        let config = TimingConfig::uniform(2, 1.0, 1.0);
        let traj = parameterize(&path(&[[0.0, 0.0], [0.0, 0.0], [1.0, 0.0]]), &config).unwrap();
        assert_eq!(traj.len(), 3);
        assert_eq!(traj.points[1].time, 0.0);
        assert_eq!(traj.points[1].configuration, Configuration::from_slice(&[0.0, 0.0]));
        assert_relative_eq!(traj.duration(), 2.0);
    }
}
