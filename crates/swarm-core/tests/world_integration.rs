use swarm_core::{
    Agent, AgentState, BehaviorError, BehaviorKind, HarvestPolicy, ParameterGenome, Team, Tick,
    Vector, World, WorldConfig, WorldError,
};

fn seeded_config(seed: u64) -> WorldConfig {
    WorldConfig {
        world_width: 600,
        world_height: 400,
        team_size: 6,
        deposits: 4,
        deposit_stash: 5,
        spawn_radius: 40.0,
        ally_home: Vector::new(150.0, 150.0),
        enemy_home: Vector::new(450.0, 250.0),
        deposit_slope: -0.5,
        deposit_intercept: 400.0,
        deposit_length: 600.0,
        rng_seed: Some(seed),
        ..WorldConfig::default()
    }
}

fn positions(world: &World) -> Vec<Vector> {
    world
        .agents()
        .as_slice()
        .iter()
        .map(|agent| agent.position)
        .collect()
}

#[test]
fn positions_stay_inside_torus_and_speed_stays_bounded() {
    let config = seeded_config(0xDEAD_BEEF);
    let (width, height) = (
        f64::from(config.world_width),
        f64::from(config.world_height),
    );
    let max_velocity = config.max_velocity;
    let mut world = World::new(
        config,
        ParameterGenome::default(),
        ParameterGenome::default(),
    )
    .expect("world");
    let policy = HarvestPolicy::default();

    for _ in 0..200 {
        policy.apply(&mut world);
        world.tick().expect("tick");
        for agent in world.agents().as_slice() {
            assert!(
                (0.0..width).contains(&agent.position.x),
                "x out of bounds: {}",
                agent.position
            );
            assert!(
                (0.0..height).contains(&agent.position.y),
                "y out of bounds: {}",
                agent.position
            );
            assert!(agent.velocity.length() <= max_velocity + 1e-9);
        }
    }
    assert_eq!(world.time(), Tick(200));
}

#[test]
fn seeded_worlds_advance_identically() {
    let build = || {
        World::new(
            seeded_config(42),
            ParameterGenome::default(),
            ParameterGenome::default(),
        )
        .expect("world")
    };
    let mut a = build();
    let mut b = build();
    let policy = HarvestPolicy::default();
    for _ in 0..50 {
        policy.apply(&mut a);
        policy.apply(&mut b);
        a.tick().expect("tick a");
        b.tick().expect("tick b");
    }
    assert_eq!(positions(&a), positions(&b));
    assert_eq!(a.status(), b.status());
}

#[test]
fn seeking_without_target_aborts_tick_without_commit() {
    let agent = Agent::mobile(
        "ally01",
        Team::Ally,
        Vector::new(10.0, 10.0),
        Vector::new(1.0, 0.0),
    )
    .with_state(AgentState::Seeking);
    let mut world = World::with_agents(
        seeded_config(1),
        ParameterGenome::default(),
        ParameterGenome::default(),
        vec![agent],
    )
    .expect("world");

    let before = positions(&world);
    let err = world.tick().expect_err("missing target");
    assert_eq!(
        err,
        WorldError::Behavior(BehaviorError::MissingTarget {
            agent: "ally01".to_string(),
            behavior: BehaviorKind::Seeking,
        })
    );
    assert_eq!(world.time(), Tick::zero());
    assert_eq!(positions(&world), before);
}

#[test]
fn status_reports_homes_then_deposits() {
    let world = World::new(
        seeded_config(3),
        ParameterGenome::default(),
        ParameterGenome::default(),
    )
    .expect("world");
    assert_eq!(world.status().to_vec(), vec![0, 0, 5, 5, 5, 5]);
    assert_eq!(world.agents().len(), 6 * 2 + 2 + 4);
}

#[test]
fn invalid_genome_is_rejected_with_team() {
    let mut genome = ParameterGenome::default();
    genome.home_guard_threshold = 9;
    let err = World::new(seeded_config(5), ParameterGenome::default(), genome)
        .expect_err("threshold out of range");
    assert!(matches!(err, WorldError::Genome { team: Team::Enemy, .. }));
}
