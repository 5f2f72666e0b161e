use std::time::Duration;

use detour_defence_core::{
    AgentSnapshot, CellCoord, Command, Event, PlacementError, SessionStatus, Waypoint,
};
use detour_defence_world::{self as world, query, Config, World};

const FRAME: Duration = Duration::from_millis(16);

#[test]
fn undefended_agent_leaks_and_costs_a_life() {
    let mut world = corridor_world(Config {
        wave_size: 1,
        ..corridor_config()
    });
    let mut events = Vec::new();

    world::apply(&mut world, Command::SpawnWave, &mut events);
    assert!(events.contains(&Event::WaveSpawned { wave: 1, count: 1 }));

    let events = run_ticks(&mut world, 300);

    assert_eq!(count(&events, |event| matches!(event, Event::AgentReachedEnd { .. })), 1);
    assert!(events.contains(&Event::AgentsCleared { wave: 1 }));
    assert!(query::agent_view(&world).is_empty());
    assert_eq!(query::economy(&world).lives, 49);
    assert_eq!(query::status(&world), SessionStatus::Playing);
}

#[test]
fn tower_defeats_agent_and_final_wave_wins() {
    let mut world = corridor_world(Config {
        wave_size: 1,
        agent_health: 10,
        waves_to_win: Some(1),
        ..corridor_config()
    });
    let mut events = Vec::new();

    world::apply(
        &mut world,
        Command::PlaceTower {
            cell: CellCoord::new(5, 0),
        },
        &mut events,
    );
    world::apply(&mut world, Command::SpawnWave, &mut events);
    let events = run_ticks(&mut world, 300);

    assert!(events
        .iter()
        .any(|event| matches!(event, Event::ProjectileFired { .. })));
    assert!(events.contains(&Event::AgentsDefeated {
        count: 1,
        reward: 1
    }));
    assert!(events.contains(&Event::Victory));
    assert_eq!(count(&events, |event| matches!(event, Event::AgentReachedEnd { .. })), 0);

    let economy = query::economy(&world);
    assert_eq!(economy.money, 11);
    assert_eq!(economy.score, 1);
    assert_eq!(economy.lives, 50);
    assert_eq!(economy.status, SessionStatus::Victory);
}

#[test]
fn losing_the_last_life_freezes_the_session() {
    let mut world = corridor_world(Config {
        wave_size: 2,
        starting_lives: 1,
        ..corridor_config()
    });
    let mut events = Vec::new();
    world::apply(&mut world, Command::SpawnWave, &mut events);

    let events = run_ticks(&mut world, 300);
    assert_eq!(count(&events, |event| *event == Event::GameOver), 1);
    assert_eq!(query::status(&world), SessionStatus::GameOver);

    let clock = query::clock(&world);
    let mut events = Vec::new();
    world::apply(&mut world, Command::Tick { dt: FRAME }, &mut events);
    world::apply(&mut world, Command::SpawnWave, &mut events);
    world::apply(
        &mut world,
        Command::PlaceTower {
            cell: CellCoord::new(5, 0),
        },
        &mut events,
    );

    assert_eq!(
        events,
        vec![
            Event::TimeAdvanced { dt: FRAME },
            Event::TowerPlacementRejected {
                cell: CellCoord::new(5, 0),
                reason: PlacementError::SessionOver,
            },
        ]
    );
    assert_eq!(query::clock(&world), clock);
}

#[test]
fn placement_that_seals_the_corridor_is_rejected() {
    let mut world = corridor_world(Config {
        height: 3,
        route: vec![Waypoint::new(0.0, 1.0), Waypoint::new(9.0, 1.0)],
        ..corridor_config()
    });
    let mut events = Vec::new();

    for cell in [CellCoord::new(5, 0), CellCoord::new(5, 2)] {
        world::apply(&mut world, Command::PlaceTower { cell }, &mut events);
    }
    events.clear();

    let cell = CellCoord::new(5, 1);
    world::apply(&mut world, Command::PlaceTower { cell }, &mut events);

    assert_eq!(
        events,
        vec![Event::TowerPlacementRejected {
            cell,
            reason: PlacementError::SealsCorridor {
                from: CellCoord::new(0, 1),
                to: CellCoord::new(9, 1),
            },
        }]
    );
    assert!(!query::grid(&world).is_occupied(cell));
    assert_eq!(query::economy(&world).money, 5);
    assert!(!query::can_place(&world, cell));
}

#[test]
fn placing_a_tower_on_the_path_reroutes_agents() {
    let mut world = corridor_world(Config {
        wave_size: 1,
        ..corridor_config()
    });
    let mut events = Vec::new();
    world::apply(&mut world, Command::SpawnWave, &mut events);
    let _ = run_ticks(&mut world, 2);

    let blocker = CellCoord::new(6, 2);
    events.clear();
    world::apply(&mut world, Command::PlaceTower { cell: blocker }, &mut events);

    assert!(events
        .iter()
        .any(|event| matches!(event, Event::AgentRerouted { .. })));
    let view = query::agent_view(&world);
    let agent = view.iter().next().expect("agent still active");
    assert!(agent
        .current_route
        .iter()
        .all(|waypoint| waypoint.cell() != blocker));

    let events = run_ticks(&mut world, 300);
    assert_eq!(count(&events, |event| matches!(event, Event::AgentReachedEnd { .. })), 1);
}

#[test]
fn reset_restores_the_economy_but_keeps_route_edits() {
    let mut world = corridor_world(corridor_config());
    let mut events = Vec::new();

    world::apply(
        &mut world,
        Command::AddCheckpoint {
            waypoint: Waypoint::new(9.0, 4.0),
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::PlaceTower {
            cell: CellCoord::new(3, 0),
        },
        &mut events,
    );
    world::apply(&mut world, Command::SpawnWave, &mut events);
    let _ = run_ticks(&mut world, 10);

    events.clear();
    world::apply(&mut world, Command::ResetSession, &mut events);

    assert_eq!(events, vec![Event::SessionReset]);
    assert!(query::agent_view(&world).is_empty());
    assert_eq!(query::tower_view(&world).iter().count(), 0);
    assert!(query::projectiles(&world).is_empty());
    assert_eq!(query::grid(&world).occupied_count(), 0);
    assert_eq!(query::economy(&world).money, 15);
    assert_eq!(query::economy(&world).wave, 0);
    assert_eq!(query::clock(&world), Duration::ZERO);
    assert_eq!(query::route(&world).len(), 3);

    world::apply(&mut world, Command::SpawnWave, &mut events);
    assert!(events.contains(&Event::WaveSpawned { wave: 1, count: 3 }));
}

#[test]
fn agents_heading_off_the_grid_still_walk_around_towers() {
    let mut world = corridor_world(Config {
        wave_size: 1,
        route: vec![Waypoint::new(0.0, 2.0), Waypoint::new(25.0, 2.0)],
        ..corridor_config()
    });
    let tower = CellCoord::new(5, 2);
    let mut events = Vec::new();

    world::apply(&mut world, Command::PlaceTower { cell: tower }, &mut events);
    world::apply(&mut world, Command::SpawnWave, &mut events);
    assert!(events.contains(&Event::TowerPlaced {
        tower: detour_defence_core::TowerId::new(0),
        cell: tower,
    }));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::AgentRerouted { .. })));

    let mut inside = 0;
    let mut leaked = 0;
    for _ in 0..400 {
        let mut tick_events = Vec::new();
        world::apply(&mut world, Command::Tick { dt: FRAME }, &mut tick_events);
        inside += query::agent_view(&world)
            .iter()
            .filter(|agent| agent.position.cell() == tower)
            .count();
        leaked += count(&tick_events, |event| matches!(event, Event::AgentReachedEnd { .. }));
    }

    assert_eq!(inside, 0);
    assert_eq!(leaked, 1);
}

#[test]
fn identical_scripts_replay_identically() {
    let first = replay();
    let second = replay();

    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
}

fn replay() -> (Vec<Event>, Vec<AgentSnapshot>) {
    let mut world = corridor_world(Config {
        wave_size: 4,
        ..corridor_config()
    });
    let mut events = Vec::new();
    world::apply(&mut world, Command::SpawnWave, &mut events);
    for tick in 0..120 {
        if tick == 10 {
            world::apply(
                &mut world,
                Command::PlaceTower {
                    cell: CellCoord::new(4, 2),
                },
                &mut events,
            );
        }
        if tick == 30 {
            world::apply(
                &mut world,
                Command::PlaceTower {
                    cell: CellCoord::new(7, 3),
                },
                &mut events,
            );
        }
        world::apply(&mut world, Command::Tick { dt: FRAME }, &mut events);
    }
    (events, query::agent_view(&world).into_vec())
}

fn corridor_config() -> Config {
    Config {
        width: 10,
        height: 5,
        route: vec![Waypoint::new(0.0, 2.0), Waypoint::new(9.0, 2.0)],
        wave_size: 3,
        ..Config::default()
    }
}

fn corridor_world(config: Config) -> World {
    World::with_config(config).expect("valid config")
}

fn run_ticks(world: &mut World, ticks: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        world::apply(world, Command::Tick { dt: FRAME }, &mut events);
    }
    events
}

fn count(events: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|event| predicate(event)).count()
}
