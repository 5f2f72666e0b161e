use std::time::Duration;

use detour_defence_core::{
    AgentId, AgentSnapshot, ObstacleSet, RouteError, Waypoint, WAYPOINT_TOLERANCE,
};
use detour_defence_system_navigation::rasterize_line;
use glam::DVec2;

/// Radius within which the next waypoint counts as reached.
pub const ARRIVAL_RADIUS: f64 = 0.25;

/// Distance an agent must cover after a reroute before waypoint arrival is reported again.
pub const REROUTE_SETTLE_DISTANCE: f64 = 0.25;

/// Attributes shared by every agent spawned from the same configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentStats {
    /// Starting health.
    pub health: u32,
    /// Movement speed in cells per millisecond.
    pub speed: f64,
    /// Currency granted when the agent is defeated.
    pub reward: u32,
}

impl Default for AgentStats {
    fn default() -> Self {
        Self {
            health: 100,
            speed: 0.01,
            reward: 1,
        }
    }
}

/// Enemy walking a designer route, splicing detours in front of the checkpoints it still owes.
///
/// `current_route` is never empty and `current_index` always addresses one of
/// its entries. Right after a reroute the agent stands on `current_route[0]`.
#[derive(Clone, Debug)]
pub struct MovingAgent {
    id: AgentId,
    position: DVec2,
    speed: f64,
    health: u32,
    reward: u32,
    original_route: Vec<Waypoint>,
    current_route: Vec<Waypoint>,
    current_index: usize,
    next_original_index: usize,
    last_reroute_segment: Vec<Waypoint>,
    reroute_anchor: Option<DVec2>,
    looping: bool,
}

impl MovingAgent {
    /// Creates an agent standing on the first checkpoint of `route`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidRoute`] when `route` is empty.
    pub fn new(id: AgentId, route: Vec<Waypoint>, stats: AgentStats) -> Result<Self, RouteError> {
        let Some(first) = route.first().copied() else {
            return Err(RouteError::InvalidRoute);
        };

        Ok(Self {
            id,
            position: to_vec(first),
            speed: stats.speed,
            health: stats.health,
            reward: stats.reward,
            current_route: route.clone(),
            original_route: route,
            current_index: 0,
            next_original_index: 1,
            last_reroute_segment: Vec::new(),
            reroute_anchor: None,
            looping: false,
        })
    }

    /// Makes the agent restart from its first checkpoint instead of finishing.
    #[must_use]
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Identifier assigned at spawn.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Current position in cell units.
    #[must_use]
    pub fn position(&self) -> Waypoint {
        from_vec(self.position)
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Currency granted on defeat.
    #[must_use]
    pub const fn reward(&self) -> u32 {
        self.reward
    }

    /// Designer route the agent was spawned with.
    #[must_use]
    pub fn original_route(&self) -> &[Waypoint] {
        &self.original_route
    }

    /// Route being followed.
    #[must_use]
    pub fn current_route(&self) -> &[Waypoint] {
        &self.current_route
    }

    /// Index of the last reached waypoint within the current route.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// Index of the next checkpoint of the original route not yet visited.
    #[must_use]
    pub const fn next_original_index(&self) -> usize {
        self.next_original_index
    }

    /// Most recent detour segment handed to [`MovingAgent::reroute`].
    #[must_use]
    pub fn last_reroute_segment(&self) -> &[Waypoint] {
        &self.last_reroute_segment
    }

    /// Whether the agent restarts its route on completion.
    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    /// Next checkpoint of the original route the agent still owes a visit.
    #[must_use]
    pub fn next_checkpoint(&self) -> Option<Waypoint> {
        self.original_route.get(self.next_original_index).copied()
    }

    /// Whether the agent stands on the last waypoint of its current route.
    #[must_use]
    pub fn is_at_final_waypoint(&self) -> bool {
        self.current_index + 1 >= self.current_route.len()
    }

    /// Whether every checkpoint was visited and the route is exhausted.
    #[must_use]
    pub fn has_finished(&self) -> bool {
        !self.looping
            && self.is_at_final_waypoint()
            && self.next_original_index >= self.original_route.len()
    }

    /// Whether the agent has no health left.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.health == 0
    }

    /// Moves the agent along its current route for the elapsed time.
    pub fn advance(&mut self, dt: Duration) {
        if self.is_at_final_waypoint() {
            if self.looping && self.next_original_index >= self.original_route.len() {
                self.restart();
            }
            return;
        }

        let target = self.current_route[self.current_index + 1];
        let delta = to_vec(target) - self.position;
        let distance = delta.length();
        let elapsed_ms = dt.as_secs_f64() * 1000.0;
        let move_distance = self.speed * elapsed_ms;

        if move_distance >= distance {
            self.position = to_vec(target);
            self.current_index += 1;
            if self
                .next_checkpoint()
                .is_some_and(|checkpoint| checkpoint.approx_eq(target, WAYPOINT_TOLERANCE))
            {
                self.next_original_index += 1;
            }
        } else {
            self.position += delta * (move_distance / distance);
        }

        if let Some(anchor) = self.reroute_anchor {
            if self.position.distance(anchor) > REROUTE_SETTLE_DISTANCE {
                self.reroute_anchor = None;
            }
        }
    }

    /// Whether the next waypoint is within [`ARRIVAL_RADIUS`] or the route is exhausted.
    ///
    /// Always `false` until the agent has moved away from the spot of its last reroute.
    #[must_use]
    pub fn has_reached_waypoint(&self) -> bool {
        if self.reroute_anchor.is_some() {
            return false;
        }
        if self.is_at_final_waypoint() {
            return true;
        }
        self.position
            .distance(to_vec(self.current_route[self.current_index + 1]))
            < ARRIVAL_RADIUS
    }

    /// Whether any cell on the straight line to the next waypoint is blocked.
    #[must_use]
    pub fn is_route_blocked(&self, obstacles: &ObstacleSet) -> bool {
        if self.is_at_final_waypoint() || obstacles.is_empty() {
            return false;
        }
        let next = self.current_route[self.current_index + 1];
        rasterize_line(self.position(), next).any(|cell| obstacles.contains(cell))
    }

    /// Route the agent would follow after committing `segment` as a detour.
    ///
    /// The segment's first point is dropped when it coincides with the current
    /// position, the pending checkpoint is appended when the segment stops short
    /// of it, and every checkpoint after it follows unchanged.
    #[must_use]
    pub fn planned_route(&self, segment: &[Waypoint]) -> Vec<Waypoint> {
        let position = self.position();
        let remainder = self
            .original_route
            .get(self.next_original_index + 1..)
            .unwrap_or_default();

        let mut route = Vec::with_capacity(segment.len() + remainder.len() + 2);
        route.push(position);
        let duplicate = segment
            .first()
            .is_some_and(|first| first.approx_eq(position, WAYPOINT_TOLERANCE));
        route.extend(segment.iter().skip(usize::from(duplicate)).copied());

        if let Some(checkpoint) = self.next_checkpoint() {
            let reaches_checkpoint = route
                .last()
                .is_some_and(|last| last.approx_eq(checkpoint, WAYPOINT_TOLERANCE));
            if !reaches_checkpoint {
                route.push(checkpoint);
            }
            route.extend_from_slice(remainder);
        }
        route
    }

    /// Remaining route as seen from the current position.
    #[must_use]
    pub fn remaining_route(&self) -> Vec<Waypoint> {
        let mut route = Vec::with_capacity(self.current_route.len() - self.current_index);
        route.push(self.position());
        route.extend_from_slice(&self.current_route[self.current_index + 1..]);
        route
    }

    /// Replaces the current route with a detour starting at the current position.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidRoute`] when `segment` is empty; the route is left untouched.
    pub fn reroute(&mut self, segment: Vec<Waypoint>) -> Result<(), RouteError> {
        if segment.is_empty() {
            return Err(RouteError::InvalidRoute);
        }

        self.current_route = self.planned_route(&segment);
        self.current_index = 0;
        self.last_reroute_segment = segment;
        self.reroute_anchor = Some(self.position);

        let position = self.position();
        if self
            .next_checkpoint()
            .is_some_and(|checkpoint| checkpoint.approx_eq(position, WAYPOINT_TOLERANCE))
        {
            self.next_original_index += 1;
        }
        Ok(())
    }

    /// Subtracts damage from the agent's health, stopping at zero.
    pub fn apply_damage(&mut self, damage: u32) {
        self.health = self.health.saturating_sub(damage);
    }

    /// Captures the agent state for presentation.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            position: self.position(),
            health: self.health,
            current_route: self.current_route.clone(),
            current_index: self.current_index,
            last_reroute_segment: self.last_reroute_segment.clone(),
        }
    }

    pub(crate) fn place_at(&mut self, position: Waypoint) {
        self.position = to_vec(position);
        self.current_route[0] = position;
    }

    fn restart(&mut self) {
        let position = self.position();
        let skip_first = self
            .original_route
            .first()
            .is_some_and(|first| first.approx_eq(position, WAYPOINT_TOLERANCE));

        let mut route = vec![position];
        route.extend(self.original_route.iter().skip(usize::from(skip_first)).copied());
        self.current_route = route;
        self.current_index = 0;
        self.next_original_index = usize::from(skip_first);
    }
}

fn to_vec(waypoint: Waypoint) -> DVec2 {
    DVec2::new(waypoint.x, waypoint.y)
}

fn from_vec(vector: DVec2) -> Waypoint {
    Waypoint::new(vector.x, vector.y)
}
