use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::time::Duration;
use swarm_core::{HarvestPolicy, ParameterGenome, World, WorldConfig};

fn bench_world_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_tick");
    let samples: usize = std::env::var("SWARM_BENCH_SAMPLES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(30);
    let ticks: usize = std::env::var("SWARM_BENCH_TICKS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(100);
    group.sample_size(samples);
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(10));

    for team_size in [10_usize, 50, 200] {
        group.bench_function(format!("ticks{ticks}_team{team_size}"), |b| {
            b.iter_batched(
                || {
                    let config = WorldConfig {
                        team_size,
                        rng_seed: Some(0xBEEF),
                        ..WorldConfig::default()
                    };
                    World::new(config, ParameterGenome::default(), ParameterGenome::default())
                        .expect("world")
                },
                |mut world| {
                    let policy = HarvestPolicy::default();
                    for _ in 0..ticks {
                        policy.apply(&mut world);
                        world.tick().expect("tick");
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_world_ticks);
criterion_main!(benches);
