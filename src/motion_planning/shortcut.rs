//! Path shortcutting
//!
//! Removes waypoints by replacing sub-paths with direct edges that pass the
//! validity oracle. Each replacement is accepted only if it does not make the
//! path longer, so total length never grows and every edge stays validated.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{CollisionChecker, Configuration, Path, PlanningResult};
use crate::motion_planning::ValidityOracle;

// Slack for floating-point error in the triangle inequality
const LENGTH_TOLERANCE: f64 = 1e-12;

/// Configuration for path shortcutting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortcutConfig {
    /// Number of random waypoint pairs to try
    pub max_attempts: usize,
    /// Finish with greedy passes until a full pass removes nothing
    pub greedy_pass: bool,
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            greedy_pass: true,
        }
    }
}

/// Random shortcutting followed by an optional exhaustive greedy pass
pub fn shortcut_path<C, R>(
    path: &Path,
    oracle: &ValidityOracle<'_, C>,
    config: &ShortcutConfig,
    rng: &mut R,
) -> PlanningResult<Path>
where
    C: CollisionChecker,
    R: Rng + ?Sized,
{
    let mut waypoints = path.waypoints.clone();
    let mut accepted = 0;

    for _ in 0..config.max_attempts {
        if waypoints.len() < 3 {
            break;
        }
        let i = rng.gen_range(0..waypoints.len() - 2);
        let j = rng.gen_range(i + 2..waypoints.len());
        if can_shortcut(oracle, &waypoints, i, j)? {
            waypoints.drain(i + 1..j);
            accepted += 1;
        }
    }

    let mut result = Path::from_waypoints(waypoints);
    if config.greedy_pass {
        result = remove_redundant_waypoints(&result, oracle)?;
    }

    debug!(
        "shortcutting: {} -> {} waypoints ({} random shortcuts)",
        path.len(),
        result.len(),
        accepted
    );
    Ok(result)
}

/// Greedy pass: from each kept waypoint jump to the furthest one reachable by a valid edge.
/// Repeats until a full pass removes nothing.
pub fn remove_redundant_waypoints<C: CollisionChecker>(
    path: &Path,
    oracle: &ValidityOracle<'_, C>,
) -> PlanningResult<Path> {
    let mut waypoints = path.waypoints.clone();

    while waypoints.len() > 2 {
        let mut kept: Vec<Configuration> = vec![waypoints[0].clone()];
        let mut cur = 0;
        while cur < waypoints.len() - 1 {
            let mut next = cur + 1;
            for k in (cur + 2..waypoints.len()).rev() {
                if can_shortcut(oracle, &waypoints, cur, k)? {
                    next = k;
                    break;
                }
            }
            kept.push(waypoints[next].clone());
            cur = next;
        }

        if kept.len() == waypoints.len() {
            break;
        }
        waypoints = kept;
    }

    Ok(Path::from_waypoints(waypoints))
}

fn can_shortcut<C: CollisionChecker>(
    oracle: &ValidityOracle<'_, C>,
    waypoints: &[Configuration],
    i: usize,
    j: usize,
) -> PlanningResult<bool> {
    let space = oracle.space();
    let direct = space.distance(&waypoints[i], &waypoints[j]);
    let detour: f64 = waypoints[i..=j]
        .windows(2)
        .map(|w| space.distance(&w[0], &w[1]))
        .sum();
    if direct > detour + LENGTH_TOLERANCE {
        return Ok(false);
    }
    oracle.is_valid_edge(&waypoints[i], &waypoints[j])
}
