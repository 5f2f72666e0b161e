//! Authoritative tower and projectile storage.

use std::time::Duration;

use detour_defence_core::{CellCoord, Event, TowerId, TowerView, Waypoint};
use detour_defence_system_tower_combat::{
    advance_projectiles, fire_ready_towers, Hit, Projectile, Target, Tower, TowerSpec,
};

/// Registry that stores towers, their projectiles and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    towers: Vec<Tower>,
    projectiles: Vec<Projectile>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            towers: Vec::new(),
            projectiles: Vec::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Records a tower on `cell` and returns its identifier.
    pub(crate) fn insert(&mut self, cell: CellCoord, center: Waypoint, spec: TowerSpec) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get() + 1);
        self.towers.push(Tower::new(id, cell, center, spec));
        id
    }

    /// Fires ready towers and moves projectiles, returning the hits of this step.
    pub(crate) fn step(
        &mut self,
        targets: &[Target],
        now: Duration,
        dt: Duration,
        out: &mut Vec<Event>,
    ) -> Vec<Hit> {
        fire_ready_towers(&mut self.towers, targets, now, &mut self.projectiles, out);
        let mut hits = Vec::new();
        advance_projectiles(&mut self.projectiles, targets, dt, &mut hits);
        hits
    }

    pub(crate) fn view(&self) -> TowerView {
        TowerView::from_snapshots(self.towers.iter().map(Tower::snapshot).collect())
    }

    pub(crate) fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }
}
