/*
 * Flock Benchmark
 *
 * Measures grid rebuilds on their own and full ticks with and without grid
 * acceleration, across flock sizes.
 */

use boids_sim::config::{Dimensionality, SimulationConfig};
use boids_sim::{BoidState, Flock, NeighborGrid};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

const SIZES: [u32; 4] = [256, 1024, 2048, 4096];

fn bench_grid_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_rebuild");

    for &count in SIZES.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &n| {
            let config = SimulationConfig::for_count(n, Dimensionality::ThreeD);
            let mut rng = StdRng::seed_from_u64(1);
            let state = BoidState::random(&mut rng, n as usize, config.bounds, config.dimensionality);
            let mut grid = NeighborGrid::for_config(&config);

            b.iter(|| {
                grid.rebuild(black_box(&state.positions));
            });
        });
    }

    group.finish();
}

fn bench_step(c: &mut Criterion, name: &str, use_grid: bool, sizes: &[u32]) {
    let mut group = c.benchmark_group(name);

    for &count in sizes {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &n| {
            let config = SimulationConfig {
                use_grid,
                ..SimulationConfig::for_count(n, Dimensionality::ThreeD)
            };
            let mut flock = Flock::new(config, 1).expect("valid bench config");

            b.iter(|| {
                flock.step(black_box(0.016)).expect("valid timestep");
            });
        });
    }

    group.finish();
}

fn bench_step_grid(c: &mut Criterion) {
    bench_step(c, "step_grid", true, &SIZES);
}

// Quadratic; keep the sizes small.
fn bench_step_brute_force(c: &mut Criterion) {
    bench_step(c, "step_brute_force", false, &SIZES[..2]);
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));
    targets = bench_grid_rebuild, bench_step_grid, bench_step_brute_force
}

criterion_main!(benches);
