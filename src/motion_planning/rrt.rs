//! RRT and RRT-Connect planners for configuration-space goals
//!
//! Both variants share the `extend`/`connect` primitives and the arena tree.
//! Randomness comes from the caller's generator, so a fixed seed reproduces
//! the same path.
//!
//! References:
//! - RRT: <https://msl.cs.illinois.edu/~lavalle/papers/Lav98c.pdf>
//! - RRT-Connect: <https://www.cs.cmu.edu/afs/cs/academic/class/15494-s14/readings/kuffner_icra2000.pdf>

use std::time::{Duration, Instant};

use ordered_float::OrderedFloat;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::{
    CollisionChecker, Configuration, Endpoint, Path, PathPlanner, PlanningError, PlanningResult,
};
use crate::motion_planning::nearest_neighbor::NeighborIndexKind;
use crate::motion_planning::tree::Tree;
use crate::motion_planning::{ConfigurationSpace, ValidityOracle};

/// Planner variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlannerKind {
    /// Single tree grown from the start
    Rrt,
    /// Two trees with greedy connection
    #[default]
    RrtConnect,
}

/// Search state of a planning call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    Growing,
    Connected,
    Exhausted,
}

/// Outcome of a single extension step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendStatus {
    /// The target itself was added (or already present)
    Reached(usize),
    /// A node one step toward the target was added
    Advanced(usize),
    /// The step toward the target is blocked
    Trapped,
}

/// Configuration for RRT planners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrtConfig {
    pub kind: PlannerKind,
    /// Maximum metric distance covered by one extension
    pub max_step: f64,
    /// Probability of sampling a goal (or the start, for the goal tree)
    pub goal_bias: f64,
    /// A node this close to a goal counts as connected (single-tree RRT)
    pub goal_tolerance: f64,
    /// Maximum outer iterations
    pub max_iterations: usize,
    /// Wall-clock deadline
    pub max_planning_time: Option<Duration>,
    /// Check the straight start-goal edge before growing any tree
    pub try_direct_connection: bool,
    /// Single-tree RRT: try a straight edge from every new node to the nearest goal
    pub connect_new_nodes_to_goal: bool,
    /// Choose the cheapest valid parent among nearby nodes (RRT*)
    pub rrt_star: bool,
    /// Neighborhood radius for RRT* parent selection; `None` considers every node
    pub max_rewire_dist: Option<f64>,
    pub neighbor_index: NeighborIndexKind,
}

impl Default for RrtConfig {
    fn default() -> Self {
        Self {
            kind: PlannerKind::RrtConnect,
            max_step: 0.2,
            goal_bias: 0.05,
            goal_tolerance: 0.05,
            max_iterations: 5000,
            max_planning_time: None,
            try_direct_connection: true,
            connect_new_nodes_to_goal: true,
            rrt_star: false,
            max_rewire_dist: None,
            neighbor_index: NeighborIndexKind::Linear,
        }
    }
}

impl RrtConfig {
    pub fn validate(&self) -> PlanningResult<()> {
        if !(self.max_step.is_finite() && self.max_step > 0.0) {
            return Err(PlanningError::InvalidParameter(format!(
                "max_step must be positive and finite, got {}",
                self.max_step
            )));
        }
        if !(0.0..=1.0).contains(&self.goal_bias) {
            return Err(PlanningError::InvalidParameter(format!(
                "goal_bias must be in [0, 1], got {}",
                self.goal_bias
            )));
        }
        if !(self.goal_tolerance.is_finite() && self.goal_tolerance >= 0.0) {
            return Err(PlanningError::InvalidParameter(format!(
                "goal_tolerance must be non-negative and finite, got {}",
                self.goal_tolerance
            )));
        }
        if let Some(r) = self.max_rewire_dist {
            if r.is_nan() || r < 0.0 {
                return Err(PlanningError::InvalidParameter(format!(
                    "max_rewire_dist must be non-negative, got {}",
                    r
                )));
            }
        }
        Ok(())
    }
}

/// Bookkeeping of a successful planning call
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerStats {
    pub iterations: usize,
    pub start_tree_size: usize,
    pub goal_tree_size: usize,
    pub state: PlannerState,
}

/// Sampling-based planner over a validity oracle
pub struct RrtPlanner<'p, C> {
    oracle: &'p ValidityOracle<'p, C>,
    config: RrtConfig,
}

impl<'p, C: CollisionChecker> RrtPlanner<'p, C> {
    pub fn new(oracle: &'p ValidityOracle<'p, C>, config: RrtConfig) -> PlanningResult<Self> {
        config.validate()?;
        Ok(Self { oracle, config })
    }

    pub fn config(&self) -> &RrtConfig {
        &self.config
    }

    fn space(&self) -> &'p ConfigurationSpace {
        self.oracle.space()
    }

    /// Plan from `start` to the closest reachable of `goals`
    pub fn plan<R: Rng + ?Sized>(
        &self,
        start: &Configuration,
        goals: &[Configuration],
        rng: &mut R,
    ) -> PlanningResult<(Path, PlannerStats)> {
        let goals = self.check_endpoints(start, goals)?;
        let started = Instant::now();

        if self.config.max_iterations == 0 {
            return Err(PlanningError::PlanningFailure {
                iterations: 0,
                reason: "iteration budget is zero".to_string(),
            });
        }

        debug!(
            "planning with {:?}: {} goal candidate(s), budget {} iterations",
            self.config.kind,
            goals.len(),
            self.config.max_iterations
        );

        let result = match self.config.kind {
            PlannerKind::Rrt => self.plan_rrt(start, &goals, started, rng)?,
            PlannerKind::RrtConnect => self.plan_rrt_connect(start, &goals, started, rng)?,
        };

        match result {
            (Some(path), stats) => {
                info!(
                    "path found: {} waypoints after {} iterations ({} + {} nodes)",
                    path.len(),
                    stats.iterations,
                    stats.start_tree_size,
                    stats.goal_tree_size
                );
                Ok((path, stats))
            }
            (None, stats) => {
                warn!(
                    "planning exhausted after {} iterations ({} + {} nodes)",
                    stats.iterations, stats.start_tree_size, stats.goal_tree_size
                );
                Err(PlanningError::PlanningFailure {
                    iterations: stats.iterations,
                    reason: "budget exhausted without connecting start and goal".to_string(),
                })
            }
        }
    }

    /// Rejects an invalid start; drops invalid goal candidates, failing if none remain
    fn check_endpoints(
        &self,
        start: &Configuration,
        goals: &[Configuration],
    ) -> PlanningResult<Vec<Configuration>> {
        let space = self.space();
        space.check_dimension(start)?;
        for g in goals {
            space.check_dimension(g)?;
        }
        if goals.is_empty() {
            return Err(PlanningError::InvalidStartOrGoal {
                endpoint: Endpoint::Goal,
                reason: "no goal candidates given".to_string(),
            });
        }
        if !self.oracle.is_valid(start)? {
            return Err(PlanningError::InvalidStartOrGoal {
                endpoint: Endpoint::Start,
                reason: "in collision or outside joint limits".to_string(),
            });
        }
        let mut valid = Vec::with_capacity(goals.len());
        for (i, g) in goals.iter().enumerate() {
            if self.oracle.is_valid(g)? {
                valid.push(g.clone());
            } else {
                warn!("dropping goal candidate {}: in collision or outside joint limits", i);
            }
        }
        if valid.is_empty() {
            return Err(PlanningError::InvalidStartOrGoal {
                endpoint: Endpoint::Goal,
                reason: "every goal candidate is in collision or outside joint limits".to_string(),
            });
        }
        Ok(valid)
    }

    fn deadline_passed(&self, started: Instant) -> bool {
        self.config
            .max_planning_time
            .map_or(false, |limit| started.elapsed() >= limit)
    }

    /// Straight edge from start to the closest goal whose edge is valid
    fn direct_connection(
        &self,
        start: &Configuration,
        goals: &[Configuration],
    ) -> PlanningResult<Option<Path>> {
        let space = self.space();
        let mut order: Vec<usize> = (0..goals.len()).collect();
        order.sort_by_key(|&i| (OrderedFloat(space.distance(start, &goals[i])), i));
        for i in order {
            if self.oracle.is_valid_edge(start, &goals[i])? {
                debug!("start and goal candidate {} connect directly", i);
                return Ok(Some(Path::from_waypoints(vec![start.clone(), goals[i].clone()])));
            }
        }
        Ok(None)
    }

    /// One step of at most `max_step` from the nearest node toward `target`
    pub fn extend(&self, tree: &mut Tree, target: &Configuration) -> PlanningResult<ExtendStatus> {
        let space = self.space();
        let nearest = match tree.nearest(space, target) {
            Some(id) => id,
            None => return Ok(ExtendStatus::Trapped),
        };
        let from = tree.node(nearest).config.clone();
        if from == *target {
            return Ok(ExtendStatus::Reached(nearest));
        }
        let d = space.distance(&from, target);
        let (q_new, reached) = if d <= self.config.max_step {
            (target.clone(), true)
        } else {
            (space.interpolate(&from, target, self.config.max_step / d), false)
        };
        if !self.oracle.is_valid_edge(&from, &q_new)? {
            return Ok(ExtendStatus::Trapped);
        }
        let id = self.insert(tree, q_new, nearest)?;
        Ok(if reached {
            ExtendStatus::Reached(id)
        } else {
            ExtendStatus::Advanced(id)
        })
    }

    /// Repeated extension toward `target` until it is reached or blocked
    pub fn connect(&self, tree: &mut Tree, target: &Configuration) -> PlanningResult<ExtendStatus> {
        loop {
            match self.extend(tree, target)? {
                ExtendStatus::Advanced(_) => {}
                status => return Ok(status),
            }
        }
    }

    fn insert(&self, tree: &mut Tree, q_new: Configuration, parent: usize) -> PlanningResult<usize> {
        let space = self.space();
        let id = tree.add_node(space, q_new, parent);
        if !self.config.rrt_star {
            return Ok(id);
        }

        let radius = self.config.max_rewire_dist.unwrap_or(f64::INFINITY);
        let q = tree.node(id).config.clone();
        let mut best_cost = tree.node(id).cost;
        for other in tree.near(space, &q, radius) {
            if other == id || other == parent {
                continue;
            }
            let cost = tree.cost_through(space, other, &q);
            if cost < best_cost && self.oracle.is_valid_edge(&tree.node(other).config, &q)? {
                tree.set_parent(id, other, cost);
                best_cost = cost;
            }
        }
        Ok(id)
    }

    fn plan_rrt<R: Rng + ?Sized>(
        &self,
        start: &Configuration,
        goals: &[Configuration],
        started: Instant,
        rng: &mut R,
    ) -> PlanningResult<(Option<Path>, PlannerStats)> {
        let space = self.space();
        let mut tree = Tree::new("start", self.config.neighbor_index);
        tree.add_root(start.clone());

        let mut state = PlannerState::Growing;
        let mut iterations = 0;
        let mut path = None;

        while state == PlannerState::Growing {
            if iterations >= self.config.max_iterations || self.deadline_passed(started) {
                state = PlannerState::Exhausted;
                continue;
            }
            iterations += 1;

            if iterations == 1 && self.config.try_direct_connection {
                if let Some(direct) = self.direct_connection(start, goals)? {
                    path = Some(direct);
                    state = PlannerState::Connected;
                }
                continue;
            }

            let sample = space.sample_biased(rng, goals, self.config.goal_bias);
            let new_id = match self.extend(&mut tree, &sample)? {
                ExtendStatus::Trapped => continue,
                ExtendStatus::Advanced(id) | ExtendStatus::Reached(id) => id,
            };

            let found = match self.reach_goal(&tree, new_id, goals)? {
                Some(found) => Some(found),
                None if self.config.connect_new_nodes_to_goal => {
                    self.connect_node_to_goal(&tree, new_id, goals)?
                }
                None => None,
            };
            if found.is_some() {
                path = found;
                state = PlannerState::Connected;
            }
        }

        let stats = PlannerStats {
            iterations,
            start_tree_size: tree.len(),
            goal_tree_size: 0,
            state,
        };
        Ok((path, stats))
    }

    /// Path ending at the goal closest to node `id`, if it is within tolerance
    fn reach_goal(
        &self,
        tree: &Tree,
        id: usize,
        goals: &[Configuration],
    ) -> PlanningResult<Option<Path>> {
        let space = self.space();
        let q = &tree.node(id).config;
        let closest = goals
            .iter()
            .map(|g| (space.distance(q, g), g))
            .min_by_key(|(d, _)| OrderedFloat(*d));
        let (d, goal) = match closest {
            Some((d, goal)) if d <= self.config.goal_tolerance => (d, goal),
            _ => return Ok(None),
        };

        let mut waypoints = tree.path_to_root(id);
        waypoints.reverse();
        if d > 0.0 && self.oracle.is_valid_edge(q, goal)? {
            waypoints.push(goal.clone());
        }
        Ok(Some(Path::from_waypoints(waypoints)))
    }

    /// Path through node `id` and a straight edge to its nearest goal, if that edge is valid
    fn connect_node_to_goal(
        &self,
        tree: &Tree,
        id: usize,
        goals: &[Configuration],
    ) -> PlanningResult<Option<Path>> {
        let space = self.space();
        let q = &tree.node(id).config;
        let nearest = goals
            .iter()
            .enumerate()
            .min_by_key(|&(i, g)| (OrderedFloat(space.distance(q, g)), i))
            .map(|(_, g)| g);
        let goal = match nearest {
            Some(goal) => goal,
            None => return Ok(None),
        };
        if !self.oracle.is_valid_edge(q, goal)? {
            return Ok(None);
        }
        debug!("node {} of the {} tree connects straight to a goal", id, tree.name());
        let mut waypoints = tree.path_to_root(id);
        waypoints.reverse();
        waypoints.push(goal.clone());
        Ok(Some(Path::from_waypoints(waypoints)))
    }

    fn plan_rrt_connect<R: Rng + ?Sized>(
        &self,
        start: &Configuration,
        goals: &[Configuration],
        started: Instant,
        rng: &mut R,
    ) -> PlanningResult<(Option<Path>, PlannerStats)> {
        let space = self.space();
        let mut start_tree = Tree::new("start", self.config.neighbor_index);
        start_tree.add_root(start.clone());
        let mut goal_tree = Tree::new("goal", self.config.neighbor_index);
        for g in goals {
            goal_tree.add_root(g.clone());
        }

        let mut state = PlannerState::Growing;
        let mut iterations = 0;
        let mut path = None;
        let mut start_phase = true;

        while state == PlannerState::Growing {
            if iterations >= self.config.max_iterations || self.deadline_passed(started) {
                state = PlannerState::Exhausted;
                continue;
            }
            iterations += 1;

            if iterations == 1 && self.config.try_direct_connection {
                if let Some(direct) = self.direct_connection(start, goals)? {
                    path = Some(direct);
                    state = PlannerState::Connected;
                }
                continue;
            }

            let (grow, other, targets) = if start_phase {
                (&mut start_tree, &mut goal_tree, goals)
            } else {
                (&mut goal_tree, &mut start_tree, std::slice::from_ref(start))
            };

            let sample = space.sample_biased(rng, targets, self.config.goal_bias);
            let meeting = match self.extend(grow, &sample)? {
                ExtendStatus::Trapped => None,
                ExtendStatus::Advanced(new_id) | ExtendStatus::Reached(new_id) => {
                    let q_new = grow.node(new_id).config.clone();
                    match self.connect(other, &q_new)? {
                        ExtendStatus::Reached(other_id) => Some((new_id, other_id)),
                        _ => None,
                    }
                }
            };

            if let Some((grow_id, other_id)) = meeting {
                let (start_id, goal_id) = if start_phase {
                    (grow_id, other_id)
                } else {
                    (other_id, grow_id)
                };
                path = Some(self.join_trees(&start_tree, start_id, &goal_tree, goal_id));
                state = PlannerState::Connected;
            }

            start_phase = !start_phase;
        }

        let stats = PlannerStats {
            iterations,
            start_tree_size: start_tree.len(),
            goal_tree_size: goal_tree.len(),
            state,
        };
        Ok((path, stats))
    }

    /// Start root to the meeting node, then on to a goal root
    fn join_trees(&self, start_tree: &Tree, start_id: usize, goal_tree: &Tree, goal_id: usize) -> Path {
        let mut waypoints = start_tree.path_to_root(start_id);
        waypoints.reverse();
        let goal_part = goal_tree.path_to_root(goal_id);
        let mut goal_part = goal_part.into_iter().peekable();
        if let (Some(last), Some(first)) = (waypoints.last(), goal_part.peek()) {
            if last == first {
                goal_part.next();
            }
        }
        waypoints.extend(goal_part);
        Path::from_waypoints(waypoints)
    }
}

impl<'p, C: CollisionChecker> PathPlanner for RrtPlanner<'p, C> {
    fn plan_path(
        &self,
        start: &Configuration,
        goals: &[Configuration],
        rng: &mut dyn RngCore,
    ) -> PlanningResult<Path> {
        self.plan(start, goals, rng).map(|(path, _)| path)
    }
}
