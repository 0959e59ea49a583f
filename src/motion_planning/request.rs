//! Planning request pipeline
//!
//! Ties the stages together: validate the request, search for a raw path,
//! shortcut it, then time-parameterize it. Parallel attempts get their own
//! random stream, trees and collision handle.

use nalgebra::Isometry3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::{
    CollisionChecker, Configuration, InverseKinematics, Path, PlanningError, PlanningResult,
    Trajectory,
};
use crate::motion_planning::{
    parameterize, shortcut_path, ConfigurationSpace, PlannerStats, RrtConfig, RrtPlanner,
    ShortcutConfig, TimingConfig, ValidityOracle,
};

/// Goal of a planning request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Goal {
    Configuration(Configuration),
    /// Any of several candidates, e.g. multiple IK solutions
    AnyOf(Vec<Configuration>),
}

impl Goal {
    /// Candidates for a task-space pose from an IK solver
    pub fn from_ik<S: InverseKinematics + ?Sized>(solver: &S, target: &Isometry3<f64>) -> PlanningResult<Self> {
        let solutions = solver.solve(target)?;
        Ok(Goal::AnyOf(solutions))
    }

    pub fn candidates(&self) -> &[Configuration] {
        match self {
            Goal::Configuration(q) => std::slice::from_ref(q),
            Goal::AnyOf(qs) => qs,
        }
    }
}

impl From<Configuration> for Goal {
    fn from(q: Configuration) -> Self {
        Goal::Configuration(q)
    }
}

/// Everything needed for one planning call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningRequest {
    pub start: Configuration,
    pub goal: Goal,
    /// Largest metric step between collision-checked samples; no default on purpose
    pub validation_resolution: f64,
    #[serde(default)]
    pub rng_seed: u64,
    /// Planner kind, step size, goal tolerance and iteration/time budget
    #[serde(default)]
    pub rrt: RrtConfig,
    #[serde(default)]
    pub shortcut: ShortcutConfig,
    pub timing: TimingConfig,
}

impl PlanningRequest {
    pub fn new(
        start: Configuration,
        goal: impl Into<Goal>,
        validation_resolution: f64,
        timing: TimingConfig,
    ) -> Self {
        Self {
            start,
            goal: goal.into(),
            validation_resolution,
            rng_seed: 0,
            rrt: RrtConfig::default(),
            shortcut: ShortcutConfig::default(),
            timing,
        }
    }
}

/// Result of a successful planning call
#[derive(Debug, Clone)]
pub struct PlanningOutcome {
    /// Path straight out of the tree search
    pub raw_path: Path,
    /// Shortcut path the trajectory follows
    pub path: Path,
    pub trajectory: Trajectory,
    pub stats: PlannerStats,
    pub seed: u64,
}

/// Plan, shortcut and time-parameterize a single request
pub fn plan_request<C: CollisionChecker>(
    space: &ConfigurationSpace,
    checker: C,
    request: &PlanningRequest,
) -> PlanningResult<PlanningOutcome> {
    request.timing.validate(space.dof())?;
    let oracle = ValidityOracle::new(space, checker, request.validation_resolution)?;
    let planner = RrtPlanner::new(&oracle, request.rrt.clone())?;
    let mut rng = ChaCha8Rng::seed_from_u64(request.rng_seed);

    let (raw_path, stats) = planner.plan(&request.start, request.goal.candidates(), &mut rng)?;
    let path = shortcut_path(&raw_path, &oracle, &request.shortcut, &mut rng)?;
    let trajectory = parameterize(&path, &request.timing)?;

    debug!(
        "seed {}: {} raw waypoints, {} after shortcutting, {} states checked",
        request.rng_seed,
        raw_path.len(),
        path.len(),
        oracle.states_checked()
    );
    Ok(PlanningOutcome {
        raw_path,
        path,
        trajectory,
        stats,
        seed: request.rng_seed,
    })
}

/// Run one attempt per seed in parallel and keep the shortest path.
///
/// `make_checker` hands every attempt its own collision handle. Ties in path
/// length go to the earliest seed. If every attempt fails, a non-recoverable
/// error is preferred over a planning failure.
pub fn plan_parallel<C, F>(
    space: &ConfigurationSpace,
    make_checker: F,
    request: &PlanningRequest,
    seeds: &[u64],
) -> PlanningResult<PlanningOutcome>
where
    C: CollisionChecker,
    F: Fn() -> C + Sync,
{
    if seeds.is_empty() {
        return Err(PlanningError::InvalidParameter(
            "parallel planning needs at least one seed".to_string(),
        ));
    }

    let results: Vec<PlanningResult<PlanningOutcome>> = seeds
        .par_iter()
        .map(|&seed| {
            let mut attempt = request.clone();
            attempt.rng_seed = seed;
            plan_request(space, make_checker(), &attempt)
        })
        .collect();

    let mut best: Option<(f64, PlanningOutcome)> = None;
    let mut first_error: Option<PlanningError> = None;
    for result in results {
        match result {
            Ok(outcome) => {
                let length = outcome.path.total_length(space);
                if best.as_ref().map_or(true, |(best_len, _)| length < *best_len) {
                    best = Some((length, outcome));
                }
            }
            Err(err) => {
                let replace = match &first_error {
                    None => true,
                    Some(prev) => prev.is_recoverable() && !err.is_recoverable(),
                };
                if replace {
                    first_error = Some(err);
                }
            }
        }
    }

    match (best, first_error) {
        (Some((length, outcome)), _) => {
            info!(
                "parallel planning: seed {} wins with length {:.4} of {} attempts",
                outcome.seed,
                length,
                seeds.len()
            );
            Ok(outcome)
        }
        (None, Some(err)) => Err(err),
        (None, None) => Err(PlanningError::PlanningFailure {
            iterations: 0,
            reason: "no planning attempt ran".to_string(),
        }),
    }
}
