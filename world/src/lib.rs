#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state for Detour Defence.
//!
//! The world owns the grid, the designer route, agents, towers and the player
//! economy. It only changes through [`apply`] and is observed through the
//! functions in [`query`].

mod config;
mod economy;
mod towers;

use std::time::Duration;

use detour_defence_core::{
    CellCoord, Command, Event, ObstacleBus, ObstacleChange, PlacementError, RouteError,
    WaypointList,
};
use detour_defence_system_navigation::{Grid, Pathfinder};
use detour_defence_system_movement::AgentManager;
use detour_defence_system_placement as placement;
use detour_defence_system_tower_combat::Target;
use tracing::{debug, info};

pub use config::{Config, ConfigError};

use economy::Economy;
use towers::TowerRegistry;

/// Represents the complete mutable state of a play session.
#[derive(Debug)]
pub struct World {
    config: Config,
    grid: Grid,
    pathfinder: Pathfinder,
    route: WaypointList,
    agents: AgentManager,
    towers: TowerRegistry,
    obstacle_bus: ObstacleBus,
    economy: Economy,
    clock: Duration,
    tick_index: u64,
}

impl World {
    /// Creates a world using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(Config::default())
    }

    /// Creates a world from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] reported by [`Config::validate`].
    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: Config) -> Self {
        let mut obstacle_bus = ObstacleBus::new();
        let mut agents = AgentManager::new(config.agent_stats(), config.looping_agents);
        agents.subscribe(&mut obstacle_bus);

        Self {
            grid: Grid::new(config.width, config.height, config.cell_size),
            pathfinder: config.pathfinder(),
            route: WaypointList::new(config.route.clone()),
            economy: Economy::new(&config),
            towers: TowerRegistry::new(),
            agents,
            obstacle_bus,
            clock: Duration::ZERO,
            tick_index: 0,
            config,
        }
    }

    fn check_placement(&self, cell: CellCoord) -> Result<(), PlacementError> {
        if !self.economy.is_playing() {
            return Err(PlacementError::SessionOver);
        }
        if !self.economy.can_afford(self.config.tower_cost) {
            return Err(PlacementError::InsufficientFunds {
                cost: self.config.tower_cost,
                available: self.economy.snapshot().money,
            });
        }
        placement::validate(cell, &self.grid, self.route.as_slice(), &self.pathfinder)
    }

    fn place_tower(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        let spent = self
            .check_placement(cell)
            .and_then(|()| self.economy.spend(self.config.tower_cost));
        if let Err(reason) = spent {
            debug!(%cell, %reason, "tower placement rejected");
            out_events.push(Event::TowerPlacementRejected { cell, reason });
            return;
        }

        let _ = self.grid.set_occupancy(cell, true);
        let center = self.grid.grid_to_world(cell);
        let tower = self.towers.insert(cell, center, self.config.tower_spec());
        info!(tower = tower.get(), %cell, "tower placed");
        out_events.push(Event::TowerPlaced { tower, cell });

        self.obstacle_bus.publish(ObstacleChange::Placed { cell });
        let obstacles = self.grid.obstacles();
        let rerouted = self.agents.sync_obstacles(
            &mut self.obstacle_bus,
            &obstacles,
            &self.pathfinder,
            out_events,
        );
        debug!(rerouted, "agents re-planned after placement");
    }

    fn spawn_wave(&mut self, out_events: &mut Vec<Event>) {
        if !self.economy.is_playing() {
            return;
        }
        if self.route.is_empty() {
            out_events.push(Event::WaveSpawnRejected {
                reason: RouteError::InvalidRoute,
            });
            return;
        }

        let spawned = match self
            .agents
            .spawn_wave(self.route.as_slice(), self.config.wave_size)
        {
            Ok(spawned) => spawned,
            Err(reason) => {
                out_events.push(Event::WaveSpawnRejected { reason });
                return;
            }
        };

        let wave = self.economy.next_wave();
        let count = u32::try_from(spawned.len()).unwrap_or(u32::MAX);
        info!(wave, count, "wave spawned");
        out_events.push(Event::WaveSpawned { wave, count });

        let obstacles = self.grid.obstacles();
        let _ = self
            .agents
            .re_route_all(&obstacles, &self.pathfinder, out_events);
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if !self.economy.is_playing() {
            return;
        }
        self.clock = self.clock.saturating_add(dt);
        let had_agents = !self.agents.is_empty();
        let obstacles = self.grid.obstacles();

        self.agents
            .update(dt, &obstacles, &self.pathfinder, out_events);

        let leaked = self.agents.remove_arrived(out_events);
        let leaked_count = u32::try_from(leaked.len()).unwrap_or(u32::MAX);
        let game_over = leaked_count > 0 && self.economy.lose_lives(leaked_count);
        if leaked_count > 0 {
            info!(
                leaked = leaked_count,
                lives = self.economy.snapshot().lives,
                "agents reached the end of the route"
            );
        }

        let targets = self.targets();
        let hits = self.towers.step(&targets, self.clock, dt, out_events);
        for hit in hits {
            let _ = self.agents.apply_damage(hit.target, hit.damage);
        }

        let reward = self.agents.remove_defeated(out_events);
        self.economy.credit(reward);

        if game_over {
            info!(wave = self.economy.wave(), "game over");
            out_events.push(Event::GameOver);
            return;
        }

        if had_agents && self.agents.is_empty() {
            let wave = self.economy.wave();
            out_events.push(Event::AgentsCleared { wave });
            if self.economy.check_victory(self.config.waves_to_win) {
                info!(wave, "victory");
                out_events.push(Event::Victory);
            }
        }
    }

    fn targets(&self) -> Vec<Target> {
        let mut targets: Vec<Target> = self
            .agents
            .iter()
            .map(|agent| Target {
                id: agent.id(),
                position: self.grid.cells_to_world(agent.position()),
            })
            .collect();
        targets.sort_by_key(|target| target.id);
        targets
    }

    fn edit_route(&mut self, edit: Result<(), RouteError>, out_events: &mut Vec<Event>) {
        match edit {
            Ok(()) => {
                let len = self.route.len();
                debug!(len, "route edited");
                out_events.push(Event::RouteEdited { len });
            }
            Err(reason) => {
                debug!(%reason, "route edit rejected");
                out_events.push(Event::RouteEditRejected { reason });
            }
        }
    }

    fn reset(&mut self, out_events: &mut Vec<Event>) {
        self.grid.clear();
        self.towers = TowerRegistry::new();
        self.obstacle_bus = ObstacleBus::new();
        self.agents = AgentManager::new(self.config.agent_stats(), self.config.looping_agents);
        self.agents.subscribe(&mut self.obstacle_bus);
        self.economy = Economy::new(&self.config);
        self.clock = Duration::ZERO;
        info!("session reset");
        out_events.push(Event::SessionReset);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
            world.tick(dt, out_events);
        }
        Command::PlaceTower { cell } => world.place_tower(cell, out_events),
        Command::SpawnWave => world.spawn_wave(out_events),
        Command::ResetSession => world.reset(out_events),
        Command::AddCheckpoint { waypoint } => {
            world.route.push(waypoint);
            world.edit_route(Ok(()), out_events);
        }
        Command::UpdateCheckpoint { index, waypoint } => {
            let edit = world.route.update(index, waypoint);
            world.edit_route(edit, out_events);
        }
        Command::RemoveCheckpoint { index } => {
            let edit = world.route.remove(index).map(|_| ());
            world.edit_route(edit, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use detour_defence_core::{
        AgentView, CellCoord, EconomySnapshot, PlacementError, ProjectileSnapshot,
        SessionStatus, TowerView, Waypoint,
    };
    use detour_defence_system_navigation::Grid;

    use super::{Config, World};

    /// Current money, lives, wave, score and status.
    #[must_use]
    pub fn economy(world: &World) -> EconomySnapshot {
        world.economy.snapshot()
    }

    /// Overall state of the session.
    #[must_use]
    pub fn status(world: &World) -> SessionStatus {
        world.economy.status()
    }

    /// Captures a read-only view of the active agents sorted by identifier.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        world.agents.view()
    }

    /// Captures a read-only view of the placed towers sorted by identifier.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        world.towers.view()
    }

    /// Projectiles currently in flight.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .towers
            .projectiles()
            .iter()
            .map(|projectile| projectile.snapshot())
            .collect()
    }

    /// Provides read-only access to the occupancy grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Designer route new waves spawn on.
    #[must_use]
    pub fn route(world: &World) -> &[Waypoint] {
        world.route.as_slice()
    }

    /// Configuration the session was created with.
    #[must_use]
    pub fn config(world: &World) -> &Config {
        &world.config
    }

    /// Simulated time elapsed since the session started or was last reset.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Number of ticks processed since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Runs every check a [`PlaceTower`](detour_defence_core::Command::PlaceTower)
    /// command performs without mutating the world.
    ///
    /// # Errors
    ///
    /// Returns the [`PlacementError`] the command would report.
    pub fn validate_placement(world: &World, cell: CellCoord) -> Result<(), PlacementError> {
        world.check_placement(cell)
    }

    /// Reports whether a tower could be placed on `cell` right now.
    #[must_use]
    pub fn can_place(world: &World, cell: CellCoord) -> bool {
        validate_placement(world, cell).is_ok()
    }
}
