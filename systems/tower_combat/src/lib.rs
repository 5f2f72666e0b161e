#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tower firing and projectile flight.
//!
//! Everything here works in world units. Callers convert agent positions with
//! the grid before handing them over as [`Target`]s.

use std::time::Duration;

use detour_defence_core::{
    AgentId, CellCoord, Event, ProjectileSnapshot, TowerId, TowerSnapshot, Waypoint,
};
use glam::DVec2;
use tracing::trace;

/// Distance below which a projectile counts as having reached its target.
pub const IMPACT_RADIUS: f64 = 5.0;

/// Visual radius of a projectile.
pub const PROJECTILE_RADIUS: f64 = 5.0;

/// Combat parameters shared by every tower of a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSpec {
    /// Firing radius in world units.
    pub range: f64,
    /// Minimum time between two shots.
    pub firing_rate: Duration,
    /// Projectile speed in world units per millisecond.
    pub projectile_speed: f64,
    /// Damage dealt by each projectile.
    pub projectile_damage: u32,
}

impl Default for TowerSpec {
    fn default() -> Self {
        Self {
            range: 200.0,
            firing_rate: Duration::from_millis(1000),
            projectile_speed: 0.7,
            projectile_damage: 10,
        }
    }
}

/// Stationary tower occupying one grid cell.
#[derive(Clone, Debug)]
pub struct Tower {
    id: TowerId,
    cell: CellCoord,
    center: DVec2,
    spec: TowerSpec,
    last_fired_at: Option<Duration>,
}

impl Tower {
    /// Creates a tower on `cell` whose shots start from the world-space `center`.
    #[must_use]
    pub fn new(id: TowerId, cell: CellCoord, center: Waypoint, spec: TowerSpec) -> Self {
        Self {
            id,
            cell,
            center: to_vec(center),
            spec,
            last_fired_at: None,
        }
    }

    /// Identifier allocated by the world.
    #[must_use]
    pub const fn id(&self) -> TowerId {
        self.id
    }

    /// Cell occupied by the tower.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Session time of the last shot, if any.
    #[must_use]
    pub const fn last_fired_at(&self) -> Option<Duration> {
        self.last_fired_at
    }

    /// Whether a world-space point lies within range.
    #[must_use]
    pub fn is_in_range(&self, point: Waypoint) -> bool {
        self.center.distance(to_vec(point)) <= self.spec.range
    }

    /// Whether the cooldown elapsed at session time `now`.
    #[must_use]
    pub fn is_ready(&self, now: Duration) -> bool {
        self.last_fired_at
            .map_or(true, |last| now.saturating_sub(last) >= self.spec.firing_rate)
    }

    /// Fires at `target` when it is in range and the cooldown elapsed.
    pub fn try_fire(&mut self, target: &Target, now: Duration) -> Option<Projectile> {
        if !self.is_ready(now) || !self.is_in_range(target.position) {
            return None;
        }
        self.last_fired_at = Some(now);
        Some(Projectile {
            position: self.center,
            speed: self.spec.projectile_speed,
            target: target.id,
            damage: self.spec.projectile_damage,
            active: true,
        })
    }

    /// Captures the tower for presentation.
    #[must_use]
    pub fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            cell: self.cell,
            center: from_vec(self.center),
            range: self.spec.range,
        }
    }
}

/// Agent position as seen by the towers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    /// Agent identifier.
    pub id: AgentId,
    /// Agent position in world units.
    pub position: Waypoint,
}

/// Damage delivered by a projectile that reached its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    /// Agent that was hit.
    pub target: AgentId,
    /// Damage to apply.
    pub damage: u32,
}

/// Homing projectile chasing one agent.
#[derive(Clone, Debug)]
pub struct Projectile {
    position: DVec2,
    speed: f64,
    target: AgentId,
    damage: u32,
    active: bool,
}

impl Projectile {
    /// Agent the projectile homes on.
    #[must_use]
    pub const fn target(&self) -> AgentId {
        self.target
    }

    /// Whether the projectile is still in flight.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Current position in world units.
    #[must_use]
    pub fn position(&self) -> Waypoint {
        from_vec(self.position)
    }

    /// Moves toward the target's current position.
    ///
    /// Returns a [`Hit`] exactly once, on the step that reaches the target. A
    /// missing target deactivates the projectile without effect.
    pub fn advance(&mut self, dt: Duration, target_position: Option<Waypoint>) -> Option<Hit> {
        if !self.active {
            return None;
        }
        let Some(target_position) = target_position else {
            self.active = false;
            return None;
        };

        let target = to_vec(target_position);
        let delta = target - self.position;
        let distance = delta.length();
        let elapsed_ms = dt.as_secs_f64() * 1000.0;
        let move_distance = self.speed * elapsed_ms;

        if move_distance >= distance || distance < IMPACT_RADIUS {
            self.position = target;
            self.active = false;
            return Some(Hit {
                target: self.target,
                damage: self.damage,
            });
        }

        self.position += delta * (move_distance / distance);
        None
    }

    /// Captures the projectile for presentation.
    #[must_use]
    pub fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            position: self.position(),
            radius: PROJECTILE_RADIUS,
            target: self.target,
        }
    }
}

/// Lets every ready tower fire at the first target in range.
///
/// `targets` are scanned in the order given; callers pass them sorted by id.
pub fn fire_ready_towers(
    towers: &mut [Tower],
    targets: &[Target],
    now: Duration,
    projectiles: &mut Vec<Projectile>,
    out: &mut Vec<Event>,
) {
    if targets.is_empty() {
        return;
    }

    for tower in towers.iter_mut() {
        if !tower.is_ready(now) {
            continue;
        }
        let Some(target) = targets.iter().find(|target| tower.is_in_range(target.position)) else {
            continue;
        };
        if let Some(projectile) = tower.try_fire(target, now) {
            trace!(tower = tower.id().get(), target = target.id.get(), "projectile fired");
            out.push(Event::ProjectileFired {
                tower: tower.id(),
                target: target.id,
            });
            projectiles.push(projectile);
        }
    }
}

/// Advances every projectile, collecting hits and dropping spent projectiles.
pub fn advance_projectiles(
    projectiles: &mut Vec<Projectile>,
    targets: &[Target],
    dt: Duration,
    hits: &mut Vec<Hit>,
) {
    for projectile in projectiles.iter_mut() {
        let position = targets
            .iter()
            .find(|target| target.id == projectile.target)
            .map(|target| target.position);
        if let Some(hit) = projectile.advance(dt, position) {
            hits.push(hit);
        }
    }
    projectiles.retain(Projectile::is_active);
}

fn to_vec(point: Waypoint) -> DVec2 {
    DVec2::new(point.x, point.y)
}

fn from_vec(vector: DVec2) -> Waypoint {
    Waypoint::new(vector.x, vector.y)
}
