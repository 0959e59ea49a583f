// Two-link arm motion planning demo
//
// Plans from a stretched-out arm to an IK goal behind a circular obstacle,
// shortcuts the path and time-parameterizes it.
// Set RUST_LOG=debug for per-stage details.

use nalgebra::Isometry3;
use tracing_subscriber::EnvFilter;

use rust_motion_planning::arm_navigation::{CircleObstacle, PlanarArm, PlanarArmCollisionChecker};
use rust_motion_planning::common::{Configuration, KinematicModel};
use rust_motion_planning::motion_planning::{
    plan_parallel, ConfigurationSpace, Goal, PlannerKind, PlanningRequest, TimingConfig,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let arm = PlanarArm::two_link();
    let obstacles = vec![
        CircleObstacle::new(1.2, 1.2, 0.3),
        CircleObstacle::new(-1.0, 0.6, 0.25),
    ];
    let checker = PlanarArmCollisionChecker::new(arm.clone(), obstacles, 0.05);

    let space = match ConfigurationSpace::from_model(&arm) {
        Ok(space) => space,
        Err(e) => {
            eprintln!("Invalid arm model: {}", e);
            return;
        }
    };

    let target = Isometry3::translation(0.0, 1.8, 0.0);
    let goal = match Goal::from_ik(&arm, &target) {
        Ok(goal) => goal,
        Err(e) => {
            eprintln!("IK failed: {}", e);
            return;
        }
    };
    println!("Goal candidates: {}", goal.candidates().len());

    let mut request = PlanningRequest::new(
        Configuration::from_slice(&[0.0, 0.0]),
        goal,
        0.02,
        TimingConfig::uniform(2, 1.0, 2.0).with_sample_period(0.05),
    );
    request.rrt.kind = PlannerKind::RrtConnect;
    request.rrt.max_iterations = 10_000;

    let seeds: Vec<u64> = (0..8).collect();
    match plan_parallel(&space, || checker.clone(), &request, &seeds) {
        Ok(outcome) => {
            println!(
                "Seed {}: {} iterations, {} raw waypoints, {} after shortcutting",
                outcome.seed,
                outcome.stats.iterations,
                outcome.raw_path.len(),
                outcome.path.len()
            );
            println!(
                "Path length {:.3} rad -> {:.3} rad",
                outcome.raw_path.total_length(&space),
                outcome.path.total_length(&space)
            );
            for q in &outcome.path.waypoints {
                if let Ok(tip) = arm.forward_kinematics(q) {
                    println!(
                        "  q = ({:+.3}, {:+.3})  tip = ({:+.3}, {:+.3})",
                        q[0], q[1], tip.translation.x, tip.translation.y
                    );
                }
            }
            println!(
                "Trajectory: {} samples over {:.3} s",
                outcome.trajectory.len(),
                outcome.trajectory.duration()
            );
        }
        Err(e) => eprintln!("Planning failed: {}", e),
    }
}
