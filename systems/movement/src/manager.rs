use std::time::Duration;

use detour_defence_core::{
    AgentId, AgentView, Event, ObstacleBus, ObstacleSet, RouteError, SubscriberId, Waypoint,
    WAYPOINT_TOLERANCE,
};
use detour_defence_system_navigation::Pathfinder;
use tracing::debug;

use crate::{AgentStats, MovingAgent};

/// Horizontal spacing between agents of the same wave, in cells.
const SPAWN_OFFSET_X: f64 = 0.5;
/// Vertical spacing between agents of the same wave, in cells.
const SPAWN_OFFSET_Y: f64 = 0.25;

/// Owns the active agents and decides when they need a new route.
#[derive(Debug)]
pub struct AgentManager {
    agents: Vec<MovingAgent>,
    stats: AgentStats,
    looping: bool,
    next_id: u32,
    subscription: Option<SubscriberId>,
}

impl AgentManager {
    /// Creates an empty manager spawning agents with the provided stats.
    #[must_use]
    pub fn new(stats: AgentStats, looping: bool) -> Self {
        Self {
            agents: Vec::new(),
            stats,
            looping,
            next_id: 0,
            subscription: None,
        }
    }

    /// Registers the manager on the bus so obstacle changes trigger a global re-route.
    pub fn subscribe(&mut self, bus: &mut ObstacleBus) {
        if let Some(previous) = self.subscription.replace(bus.subscribe()) {
            bus.unsubscribe(previous);
        }
    }

    /// Re-routes every agent when obstacle changes were published since the last call.
    ///
    /// Returns the number of agents whose route changed.
    pub fn sync_obstacles(
        &mut self,
        bus: &mut ObstacleBus,
        obstacles: &ObstacleSet,
        pathfinder: &Pathfinder,
        out: &mut Vec<Event>,
    ) -> usize {
        let Some(subscription) = self.subscription else {
            return 0;
        };
        if bus.drain(subscription).is_empty() {
            return 0;
        }
        self.re_route_all(obstacles, pathfinder, out)
    }

    /// Advances every agent, then re-plans those whose segment is blocked or whose detour ran out.
    pub fn update(
        &mut self,
        dt: Duration,
        obstacles: &ObstacleSet,
        pathfinder: &Pathfinder,
        out: &mut Vec<Event>,
    ) {
        for index in 0..self.agents.len() {
            self.agents[index].advance(dt);

            let agent = &self.agents[index];
            if agent.is_route_blocked(obstacles) {
                let _ = self.reroute_if_changed(index, obstacles, pathfinder, out);
            } else if agent.has_reached_waypoint()
                && agent.is_at_final_waypoint()
                && agent.next_checkpoint().is_some()
            {
                if let Some(segment) = self.build_path(index, obstacles, pathfinder) {
                    self.commit(index, segment, out);
                }
            }
        }
    }

    /// Recomputes a path for every agent toward its next checkpoint.
    ///
    /// Agents whose planned route matches the one they follow are left alone,
    /// so a second call with unchanged obstacles changes nothing. Returns the
    /// number of agents whose route changed.
    pub fn re_route_all(
        &mut self,
        obstacles: &ObstacleSet,
        pathfinder: &Pathfinder,
        out: &mut Vec<Event>,
    ) -> usize {
        (0..self.agents.len())
            .filter(|&index| self.reroute_if_changed(index, obstacles, pathfinder, out))
            .count()
    }

    /// Spawns `count` agents on `base_route`, each shifted so they do not stack.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidRoute`] when `base_route` is empty.
    pub fn spawn_wave(
        &mut self,
        base_route: &[Waypoint],
        count: u32,
    ) -> Result<Vec<AgentId>, RouteError> {
        let Some(origin) = base_route.first().copied() else {
            return Err(RouteError::InvalidRoute);
        };

        let mut spawned = Vec::with_capacity(count as usize);
        for offset in 0..count {
            let id = AgentId::new(self.next_id);
            let mut agent = MovingAgent::new(id, base_route.to_vec(), self.stats)?
                .with_looping(self.looping);
            let step = f64::from(offset);
            agent.place_at(origin.offset(step * SPAWN_OFFSET_X, step * SPAWN_OFFSET_Y));

            self.next_id += 1;
            self.agents.push(agent);
            spawned.push(id);
        }
        Ok(spawned)
    }

    /// Removes agents with no health left, reporting them as a single batch.
    ///
    /// Returns the total reward of the removed agents.
    pub fn remove_defeated(&mut self, out: &mut Vec<Event>) -> u32 {
        let mut count = 0;
        let mut reward = 0;
        self.agents.retain(|agent| {
            if agent.is_defeated() {
                count += 1;
                reward += agent.reward();
                false
            } else {
                true
            }
        });

        if count > 0 {
            debug!(count, reward, "defeated agents removed");
            out.push(Event::AgentsDefeated { count, reward });
        }
        reward
    }

    /// Removes agents that consumed their final checkpoint.
    ///
    /// Returns the identifiers of the removed agents in id order.
    pub fn remove_arrived(&mut self, out: &mut Vec<Event>) -> Vec<AgentId> {
        let mut arrived = Vec::new();
        self.agents.retain(|agent| {
            if agent.has_finished() && !agent.is_defeated() {
                arrived.push(agent.id());
                false
            } else {
                true
            }
        });
        arrived.sort();
        out.extend(arrived.iter().map(|&agent| Event::AgentReachedEnd { agent }));
        arrived
    }

    /// Applies damage to the agent, returning `false` when it no longer exists.
    pub fn apply_damage(&mut self, id: AgentId, damage: u32) -> bool {
        match self.agents.iter_mut().find(|agent| agent.id() == id) {
            Some(agent) => {
                agent.apply_damage(damage);
                true
            }
            None => false,
        }
    }

    /// Agent with the provided identifier.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&MovingAgent> {
        self.agents.iter().find(|agent| agent.id() == id)
    }

    /// Iterator over the active agents in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &MovingAgent> {
        self.agents.iter()
    }

    /// Number of active agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Reports whether no agent is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Captures every agent for presentation.
    #[must_use]
    pub fn view(&self) -> AgentView {
        AgentView::from_snapshots(self.agents.iter().map(MovingAgent::snapshot).collect())
    }

    /// Drops every agent.
    pub fn clear(&mut self) {
        self.agents.clear();
    }

    fn reroute_if_changed(
        &mut self,
        index: usize,
        obstacles: &ObstacleSet,
        pathfinder: &Pathfinder,
        out: &mut Vec<Event>,
    ) -> bool {
        let Some(segment) = self.build_path(index, obstacles, pathfinder) else {
            return false;
        };
        let agent = &self.agents[index];
        if routes_match(&agent.planned_route(&segment), &agent.remaining_route()) {
            return false;
        }
        self.commit(index, segment, out);
        true
    }

    fn build_path(
        &self,
        index: usize,
        obstacles: &ObstacleSet,
        pathfinder: &Pathfinder,
    ) -> Option<Vec<Waypoint>> {
        let agent = &self.agents[index];
        let target = agent.next_checkpoint()?.cell();
        let start = agent.position().cell();
        let goal = pathfinder.clamp(target);
        if goal != target && start == goal {
            return None;
        }
        let crowd: ObstacleSet = self
            .agents
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .map(|(_, other)| other.position().cell())
            .collect();

        let path = pathfinder.find_path(start, goal, obstacles, Some(&crowd))?;
        Some(path.into_iter().map(Waypoint::from_cell).collect())
    }

    fn commit(&mut self, index: usize, segment: Vec<Waypoint>, out: &mut Vec<Event>) {
        let agent = &mut self.agents[index];
        let segment_len = segment.len();
        if agent.reroute(segment).is_ok() {
            debug!(agent = agent.id().get(), segment_len, "agent rerouted");
            out.push(Event::AgentRerouted {
                agent: agent.id(),
                segment_len,
            });
        }
    }
}

fn routes_match(left: &[Waypoint], right: &[Waypoint]) -> bool {
    left.len() == right.len()
        && left.iter().zip(right).all(|(a, b)| {
            (a.x - b.x).abs() <= WAYPOINT_TOLERANCE && (a.y - b.y).abs() <= WAYPOINT_TOLERANCE
        })
}
