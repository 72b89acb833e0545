//! # Kinematic Solver Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arm_lib::{
    kin_model::{Chain, JointConfiguration, RobotDescription},
    kin_solver::{KinematicSolver, SolverParams},
    traj_gen::{TrajParams, TrajectoryGenerator},
};

fn kin_solver_benchmark(c: &mut Criterion) {
    // ---- Build the iiwa solver ----

    let desc = RobotDescription::from_toml_str(include_str!("../../params/lbr_iiwa.toml")).unwrap();
    let chain = Chain::build(&desc, "lbr_iiwa_link_0", "lbr_iiwa_link_7").unwrap();
    let solver = KinematicSolver::new(chain, SolverParams::default());

    let reference = JointConfiguration::new(vec![0.0, 1.57, 0.0, 1.57, 0.0, 0.0, 0.0], 7).unwrap();
    let traj = TrajectoryGenerator::new(TrajParams::default());

    // Seed for a tracking cycle, the solution one IK period earlier on the circle
    let seed = solver
        .inverse_position(&reference, &traj.target_at(1.0))
        .unwrap()
        .configuration;
    let target = traj.target_at(1.005);

    // ---- Benchmarks ----

    c.bench_function("forward", |b| b.iter(|| solver.forward(black_box(&seed))));

    c.bench_function("tracking cycle IK", |b| {
        b.iter(|| solver.inverse_position(black_box(&seed), black_box(&target)))
    });

    c.bench_function("IK from reference", |b| {
        b.iter(|| solver.inverse_position(black_box(&reference), black_box(&target)))
    });
}

criterion_group!(benches, kin_solver_benchmark);
criterion_main!(benches);
