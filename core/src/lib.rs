#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Detour Defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative session world, and the pure systems. Adapters submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then reports [`Event`] values the
//! presentation layer reacts to. Systems operate on the value types declared
//! here and never reach into the world's storage directly.

use std::{collections::BTreeSet, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Distance within which two waypoints are considered the same point.
pub const WAYPOINT_TOLERANCE: f64 = 0.1;

/// Commands that express all permissible session mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests placement of a tower on the provided grid cell.
    PlaceTower {
        /// Cell the tower should occupy.
        cell: CellCoord,
    },
    /// Requests that the next wave of agents be spawned on the base route.
    SpawnWave,
    /// Discards every tower, agent and projectile and restores the starting economy.
    ResetSession,
    /// Appends a checkpoint to the designer route.
    AddCheckpoint {
        /// Checkpoint appended after the current final checkpoint.
        waypoint: Waypoint,
    },
    /// Replaces the checkpoint stored at the provided index.
    UpdateCheckpoint {
        /// Zero-based index of the checkpoint to replace.
        index: usize,
        /// Replacement checkpoint.
        waypoint: Waypoint,
    },
    /// Removes the checkpoint stored at the provided index.
    RemoveCheckpoint {
        /// Zero-based index of the checkpoint to remove.
        index: usize,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a tower was placed and its cell marked as an obstacle.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Cell occupied by the tower.
        cell: CellCoord,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed; its `Display` text is user facing.
        reason: PlacementError,
    },
    /// Confirms that a new wave of agents entered the route.
    WaveSpawned {
        /// One-based index of the wave.
        wave: u32,
        /// Number of agents created for the wave.
        count: u32,
    },
    /// Reports that a wave could not be spawned from the current base route.
    WaveSpawnRejected {
        /// Reason the base route was unusable.
        reason: RouteError,
    },
    /// Reports that an agent committed a new detour.
    AgentRerouted {
        /// Identifier of the agent that changed route.
        agent: AgentId,
        /// Number of waypoints in the detour segment that was spliced in.
        segment_len: usize,
    },
    /// Reports that an agent consumed its final checkpoint and cost a life.
    AgentReachedEnd {
        /// Identifier of the agent that leaked through.
        agent: AgentId,
    },
    /// Reports the agents removed for having no health left.
    AgentsDefeated {
        /// Number of agents removed in the pass.
        count: u32,
        /// Reward credited for the whole pass.
        reward: u32,
    },
    /// Confirms that a tower fired a projectile.
    ProjectileFired {
        /// Tower that fired.
        tower: TowerId,
        /// Agent the projectile homes on.
        target: AgentId,
    },
    /// Announces that the last active agent left the field.
    AgentsCleared {
        /// Wave that was in progress when the field emptied.
        wave: u32,
    },
    /// Announces that the player ran out of lives.
    GameOver,
    /// Announces that the final wave was cleared.
    Victory,
    /// Confirms a change to the designer route.
    RouteEdited {
        /// Number of checkpoints in the route after the edit.
        len: usize,
    },
    /// Reports that a route edit addressed a missing checkpoint.
    RouteEditRejected {
        /// Reason the edit failed.
        reason: RouteError,
    },
    /// Confirms that the session returned to its starting state.
    SessionReset,
}

/// Overall state of the play session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Waves may be spawned and towers placed.
    #[default]
    Playing,
    /// Lives reached zero.
    GameOver,
    /// The configured number of waves was survived and cleared.
    Victory,
}

/// Unique identifier assigned to a moving agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Coordinates are signed so neighbourhood arithmetic near the border can step
/// outside the grid; bounds are enforced by the grid, not by this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: i32,
    row: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Cell displaced by the provided column and row deltas.
    #[must_use]
    pub const fn offset(self, columns: i32, rows: i32) -> Self {
        Self::new(self.column + columns, self.row + rows)
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Computes the Chebyshev distance, the step count of an unobstructed
    /// eight-directional walk.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }

    /// Iterates the eight cells surrounding this one, without bounds checks.
    pub fn surrounding(self) -> impl Iterator<Item = CellCoord> {
        SURROUNDING_OFFSETS
            .into_iter()
            .map(move |(columns, rows)| self.offset(columns, rows))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

const SURROUNDING_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Point on the grid measured in (possibly fractional) cell units.
///
/// Checkpoints and detour waypoints are integral; agent positions become
/// fractional while they interpolate between waypoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Horizontal coordinate in cells.
    pub x: f64,
    /// Vertical coordinate in cells.
    pub y: f64,
}

impl Waypoint {
    /// Creates a waypoint from raw coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Waypoint sitting exactly on the provided cell coordinate.
    #[must_use]
    pub fn from_cell(cell: CellCoord) -> Self {
        Self::new(f64::from(cell.column()), f64::from(cell.row()))
    }

    /// Cell containing the waypoint, obtained by flooring both axes.
    #[must_use]
    pub fn cell(self) -> CellCoord {
        CellCoord::new(self.x.floor() as i32, self.y.floor() as i32)
    }

    /// Euclidean distance between two waypoints.
    #[must_use]
    pub fn distance(self, other: Waypoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Reports whether both axes differ by less than `tolerance`.
    #[must_use]
    pub fn approx_eq(self, other: Waypoint, tolerance: f64) -> bool {
        (self.x - other.x).abs() < tolerance && (self.y - other.y).abs() < tolerance
    }

    /// Waypoint displaced by the provided deltas.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<CellCoord> for Waypoint {
    fn from(cell: CellCoord) -> Self {
        Self::from_cell(cell)
    }
}

/// Snapshot of blocked cells taken for a single planning or validation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObstacleSet {
    cells: BTreeSet<CellCoord>,
}

impl ObstacleSet {
    /// Creates an empty obstacle set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether the provided cell is blocked.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains(&cell)
    }

    /// Marks the provided cell as blocked, returning `true` if it was free.
    pub fn insert(&mut self, cell: CellCoord) -> bool {
        self.cells.insert(cell)
    }

    /// Copy of the set with one additional blocked cell.
    #[must_use]
    pub fn with(&self, cell: CellCoord) -> Self {
        let mut candidate = self.clone();
        let _ = candidate.insert(cell);
        candidate
    }

    /// Number of cells blocked by the three-by-three neighbourhood around `cell`,
    /// excluding `cell` itself.
    #[must_use]
    pub fn adjacent_count(&self, cell: CellCoord) -> u32 {
        if self.cells.is_empty() {
            return 0;
        }
        cell.surrounding()
            .filter(|neighbor| self.cells.contains(neighbor))
            .count() as u32
    }

    /// Number of blocked cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether no cell is blocked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterator over blocked cells in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells.iter().copied()
    }
}

impl FromIterator<CellCoord> for ObstacleSet {
    fn from_iter<I: IntoIterator<Item = CellCoord>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Failures raised while building or editing routes.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteError {
    /// A route or detour segment contained no waypoints.
    #[error("route must contain at least one waypoint")]
    InvalidRoute,
    /// A waypoint index did not address an existing entry.
    #[error("waypoint index {index} out of range for route of length {len}")]
    IndexOutOfRange {
        /// Index supplied by the caller.
        index: usize,
        /// Length of the route at the time of the call.
        len: usize,
    },
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested cell lies outside the grid.
    #[error("cell is outside the playing field")]
    OutOfBounds,
    /// The requested cell already holds an obstacle.
    #[error("cell is already occupied")]
    Occupied,
    /// The base route has fewer than two checkpoints, so no corridor can be verified.
    #[error("base route needs at least two checkpoints")]
    RouteTooShort,
    /// The obstacle would disconnect two consecutive checkpoints.
    #[error("tower would block the path from {from} to {to}")]
    SealsCorridor {
        /// Checkpoint cell the severed segment starts from.
        from: CellCoord,
        /// Checkpoint cell the severed segment leads to.
        to: CellCoord,
    },
    /// The player cannot pay for the tower.
    #[error("not enough money: tower costs {cost}, {available} available")]
    InsufficientFunds {
        /// Price of a tower.
        cost: u32,
        /// Money held by the player.
        available: u32,
    },
    /// The session already ended.
    #[error("the session is over")]
    SessionOver,
}

/// Designer-authored checkpoint list with index-checked editing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WaypointList {
    waypoints: Vec<Waypoint>,
}

impl WaypointList {
    /// Creates a list holding the provided checkpoints.
    #[must_use]
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints }
    }

    /// Checkpoints in travel order.
    #[must_use]
    pub fn as_slice(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Checkpoint stored at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Waypoint> {
        self.waypoints.get(index).copied()
    }

    /// Appends a checkpoint after the current final checkpoint.
    pub fn push(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    /// Replaces the checkpoint at `index`.
    pub fn update(&mut self, index: usize, waypoint: Waypoint) -> Result<(), RouteError> {
        let len = self.waypoints.len();
        let slot = self
            .waypoints
            .get_mut(index)
            .ok_or(RouteError::IndexOutOfRange { index, len })?;
        *slot = waypoint;
        Ok(())
    }

    /// Removes and returns the checkpoint at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Waypoint, RouteError> {
        if index >= self.waypoints.len() {
            return Err(RouteError::IndexOutOfRange {
                index,
                len: self.waypoints.len(),
            });
        }
        Ok(self.waypoints.remove(index))
    }

    /// Number of checkpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reports whether the list holds no checkpoint.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// Change to the obstacle layout announced on an [`ObstacleBus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObstacleChange {
    /// A cell became blocked.
    Placed {
        /// Newly blocked cell.
        cell: CellCoord,
    },
    /// A cell became free.
    Cleared {
        /// Newly freed cell.
        cell: CellCoord,
    },
}

/// Handle identifying one subscriber of an [`ObstacleBus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

/// Publish/subscribe channel for obstacle changes owned by the session.
///
/// Every subscriber receives its own copy of each published change and drains
/// it when convenient; publishing never calls back into subscribers.
#[derive(Debug, Default)]
pub struct ObstacleBus {
    queues: Vec<Option<Vec<ObstacleChange>>>,
}

impl ObstacleBus {
    /// Creates a bus without subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber that sees every change published from now on.
    pub fn subscribe(&mut self) -> SubscriberId {
        self.queues.push(Some(Vec::new()));
        SubscriberId(self.queues.len() - 1)
    }

    /// Drops a subscriber and any changes still queued for it.
    pub fn unsubscribe(&mut self, subscriber: SubscriberId) {
        if let Some(slot) = self.queues.get_mut(subscriber.0) {
            *slot = None;
        }
    }

    /// Queues the change for every live subscriber.
    pub fn publish(&mut self, change: ObstacleChange) {
        for queue in self.queues.iter_mut().flatten() {
            queue.push(change);
        }
    }

    /// Takes every change queued for the subscriber.
    pub fn drain(&mut self, subscriber: SubscriberId) -> Vec<ObstacleChange> {
        self.queues
            .get_mut(subscriber.0)
            .and_then(Option::as_mut)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.queues.iter().flatten().count()
    }
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Current position in cell units.
    pub position: Waypoint,
    /// Remaining health.
    pub health: u32,
    /// Route the agent is following, starting with the last reached waypoint.
    pub current_route: Vec<Waypoint>,
    /// Index of the last reached waypoint within `current_route`.
    pub current_index: usize,
    /// Most recent detour segment, kept for debug overlays.
    pub last_reroute_segment: Vec<Waypoint>,
}

/// Read-only snapshot describing all agents on the field.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured agent snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no agent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single tower used for drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Cell occupied by the tower.
    pub cell: CellCoord,
    /// Centre of the tower in world units.
    pub center: Waypoint,
    /// Firing radius in world units.
    pub range: f64,
}

/// Read-only snapshot describing all towers placed on the grid.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of an in-flight projectile used for drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Position in world units.
    pub position: Waypoint,
    /// Visual radius in world units.
    pub radius: f64,
    /// Agent the projectile homes on.
    pub target: AgentId,
}

/// Player-facing counters tracked by the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomySnapshot {
    /// Currency available for towers.
    pub money: u32,
    /// Lives left before the game is lost.
    pub lives: u32,
    /// Number of waves spawned so far.
    pub wave: u32,
    /// Accumulated score.
    pub score: u32,
    /// Overall session state.
    pub status: SessionStatus,
}
