use std::time::Duration;

use detour_defence_core::{CellCoord, Event, ObstacleBus, ObstacleChange, Waypoint};
use detour_defence_system_navigation::{Grid, Pathfinder};
use detour_defence_system_movement::{AgentManager, AgentStats};

const STEP: Duration = Duration::from_millis(16);

#[test]
fn agent_detours_and_still_reaches_its_checkpoint() {
    let mut grid = Grid::new(20, 12, 20.0);
    let pathfinder = Pathfinder::for_grid(&grid);
    let mut manager = AgentManager::new(AgentStats::default(), false);
    let base = vec![Waypoint::new(1.0, 6.0), Waypoint::new(15.0, 6.0)];
    let _ = manager.spawn_wave(&base, 1).expect("valid route");

    let mut events = Vec::new();
    manager.update(STEP, &grid.obstacles(), &pathfinder, &mut events);
    assert!(events.is_empty());

    for row in 4..9 {
        let _ = grid.set_occupancy(CellCoord::new(8, row), true);
    }
    let obstacles = grid.obstacles();
    manager.update(STEP, &obstacles, &pathfinder, &mut events);

    let agent = manager.iter().next().expect("agent active");
    assert!(agent
        .current_route()
        .iter()
        .all(|waypoint| !obstacles.contains(waypoint.cell())));
    assert_eq!(agent.current_route().last(), Some(&base[1]));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::AgentRerouted { .. })));

    let mut arrived = Vec::new();
    for _ in 0..1_000 {
        manager.update(STEP, &obstacles, &pathfinder, &mut events);
        arrived.extend(manager.remove_arrived(&mut events));
        if manager.is_empty() {
            break;
        }
    }
    assert_eq!(arrived.len(), 1);
}

#[test]
fn obstacle_notification_reroutes_every_agent() {
    let mut grid = Grid::new(30, 20, 20.0);
    let pathfinder = Pathfinder::for_grid(&grid);
    let mut bus = ObstacleBus::new();
    let mut manager = AgentManager::new(AgentStats::default(), false);
    manager.subscribe(&mut bus);
    let base = vec![
        Waypoint::new(2.0, 2.0),
        Waypoint::new(20.0, 2.0),
        Waypoint::new(20.0, 15.0),
    ];
    let ids = manager.spawn_wave(&base, 4).expect("valid route");

    let cell = CellCoord::new(10, 2);
    assert!(grid.set_occupancy(cell, true));
    bus.publish(ObstacleChange::Placed { cell });

    let mut events = Vec::new();
    let changed = manager.sync_obstacles(&mut bus, &grid.obstacles(), &pathfinder, &mut events);

    assert_eq!(changed, ids.len());
    for agent in manager.iter() {
        assert!(agent
            .current_route()
            .iter()
            .all(|waypoint| waypoint.cell() != cell));
        assert!(agent.current_route().ends_with(&base[2..]));
    }

    events.clear();
    let again = manager.re_route_all(&grid.obstacles(), &pathfinder, &mut events);
    assert_eq!(again, 0);
}
