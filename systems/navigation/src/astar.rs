use std::{cmp::Ordering, collections::BinaryHeap, f64::consts::SQRT_2};

use detour_defence_core::{CellCoord, ObstacleSet};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::Grid;

/// Neighbour offsets in expansion order: cardinals first, then diagonals.
const NEIGHBORS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

/// Estimate of the remaining cost used to order the open set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    /// `|dx| + |dy|`. Overestimates once diagonal steps are taken into account.
    #[default]
    Manhattan,
    /// `max(dx, dy) + (√2 - 1) * min(dx, dy)`, admissible for eight-directional movement.
    Octile,
}

impl Heuristic {
    fn estimate(self, from: CellCoord, to: CellCoord) -> f64 {
        let dx = f64::from(from.column().abs_diff(to.column()));
        let dy = f64::from(from.row().abs_diff(to.row()));
        match self {
            Self::Manhattan => dx + dy,
            Self::Octile => dx.max(dy) + (SQRT_2 - 1.0) * dx.min(dy),
        }
    }
}

/// Additive penalties applied when stepping into a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoftCosts {
    /// Cost added per obstacle in the entered cell's eight-neighbourhood.
    pub wall_penalty: f64,
    /// Cost added per other agent in the entered cell's eight-neighbourhood.
    pub crowd_penalty: f64,
}

impl SoftCosts {
    /// Penalties used by the reference game: 2 per wall, 3 per neighbouring agent.
    #[must_use]
    pub const fn new(wall_penalty: f64, crowd_penalty: f64) -> Self {
        Self {
            wall_penalty,
            crowd_penalty,
        }
    }

    /// Penalties that reduce the search to plain shortest path.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Default for SoftCosts {
    fn default() -> Self {
        Self::new(2.0, 3.0)
    }
}

/// Stateless A* search over an eight-connected grid.
///
/// Diagonal steps are allowed between two blocked orthogonal neighbours.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pathfinder {
    width: u32,
    height: u32,
    heuristic: Heuristic,
    costs: SoftCosts,
}

impl Pathfinder {
    /// Creates a pathfinder for a grid of the provided dimensions with default costs.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            heuristic: Heuristic::default(),
            costs: SoftCosts::default(),
        }
    }

    /// Creates a pathfinder sized to the grid.
    #[must_use]
    pub fn for_grid(grid: &Grid) -> Self {
        Self::new(grid.width(), grid.height())
    }

    /// Replaces the heuristic.
    #[must_use]
    pub const fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Replaces the soft-cost penalties.
    #[must_use]
    pub const fn with_soft_costs(mut self, costs: SoftCosts) -> Self {
        self.costs = costs;
        self
    }

    /// Heuristic used to order the open set.
    #[must_use]
    pub const fn heuristic(&self) -> Heuristic {
        self.heuristic
    }

    /// Clamps the cell onto the searched area, matching [`Grid::clamp`].
    #[must_use]
    pub fn clamp(&self, cell: CellCoord) -> CellCoord {
        let max_column = self.width.saturating_sub(1) as i32;
        let max_row = self.height.saturating_sub(1) as i32;
        CellCoord::new(
            cell.column().clamp(0, max_column),
            cell.row().clamp(0, max_row),
        )
    }

    /// Searches for a path from `start` to `goal`, both included.
    ///
    /// `obstacles` are impassable and make neighbouring cells more expensive;
    /// `crowd` cells only add their penalty to neighbouring cells. The start
    /// cell itself is never tested against `obstacles`. Returns `None` when the
    /// goal cannot be reached or either endpoint lies outside the grid.
    #[must_use]
    pub fn find_path(
        &self,
        start: CellCoord,
        goal: CellCoord,
        obstacles: &ObstacleSet,
        crowd: Option<&ObstacleSet>,
    ) -> Option<Vec<CellCoord>> {
        let start_index = self.index(start)?;
        let goal_index = self.index(goal)?;
        let cell_count = self.width as usize * self.height as usize;

        let mut g_score = vec![f64::INFINITY; cell_count];
        let mut parent: Vec<Option<usize>> = vec![None; cell_count];
        let mut closed = vec![false; cell_count];
        let mut open = BinaryHeap::new();
        let mut sequence = 0_u64;
        let mut expanded = 0_usize;

        g_score[start_index] = 0.0;
        open.push(OpenNode {
            f: self.heuristic.estimate(start, goal),
            sequence,
            cell: start,
        });

        while let Some(OpenNode { cell, .. }) = open.pop() {
            let Some(current) = self.index(cell) else {
                continue;
            };
            if closed[current] {
                continue;
            }
            closed[current] = true;
            expanded += 1;

            if current == goal_index {
                trace!(%start, %goal, expanded, "path found");
                return Some(self.reconstruct(&parent, current));
            }

            for (dx, dy) in NEIGHBORS {
                let neighbor = cell.offset(dx, dy);
                let Some(next) = self.index(neighbor) else {
                    continue;
                };
                if closed[next] || obstacles.contains(neighbor) {
                    continue;
                }

                let tentative = g_score[current] + self.step_cost(dx, dy, neighbor, obstacles, crowd);
                if tentative < g_score[next] {
                    g_score[next] = tentative;
                    parent[next] = Some(current);
                    sequence += 1;
                    open.push(OpenNode {
                        f: tentative + self.heuristic.estimate(neighbor, goal),
                        sequence,
                        cell: neighbor,
                    });
                }
            }
        }

        trace!(%start, %goal, expanded, "no path");
        None
    }

    fn step_cost(
        &self,
        dx: i32,
        dy: i32,
        neighbor: CellCoord,
        obstacles: &ObstacleSet,
        crowd: Option<&ObstacleSet>,
    ) -> f64 {
        let base = if dx == 0 || dy == 0 { 1.0 } else { SQRT_2 };
        let walls = f64::from(obstacles.adjacent_count(neighbor)) * self.costs.wall_penalty;
        let agents = crowd.map_or(0.0, |crowd| {
            f64::from(crowd.adjacent_count(neighbor)) * self.costs.crowd_penalty
        });
        base + walls + agents
    }

    fn reconstruct(&self, parent: &[Option<usize>], mut current: usize) -> Vec<CellCoord> {
        let mut path = vec![self.cell_at(current)];
        while let Some(previous) = parent[current] {
            path.push(self.cell_at(previous));
            current = previous;
        }
        path.reverse();
        path
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        let column = u32::try_from(cell.column()).ok()?;
        let row = u32::try_from(cell.row()).ok()?;
        if column >= self.width || row >= self.height {
            return None;
        }
        Some(row as usize * self.width as usize + column as usize)
    }

    fn cell_at(&self, index: usize) -> CellCoord {
        let width = self.width as usize;
        CellCoord::new((index % width) as i32, (index / width) as i32)
    }
}

/// Open-set entry; the heap pops the lowest `f`, earliest inserted first.
#[derive(Clone, Copy, Debug)]
struct OpenNode {
    f: f64,
    sequence: u64,
    cell: CellCoord,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(width: u32, height: u32) -> Pathfinder {
        Pathfinder::new(width, height).with_soft_costs(SoftCosts::none())
    }

    fn is_contiguous(path: &[CellCoord]) -> bool {
        path.windows(2)
            .all(|pair| pair[0].chebyshev_distance(pair[1]) == 1)
    }

    #[test]
    fn path_to_self_is_single_cell() {
        let pathfinder = Pathfinder::new(5, 5);
        let cell = CellCoord::new(2, 2);
        let path = pathfinder
            .find_path(cell, cell, &ObstacleSet::new(), None)
            .expect("trivial path");
        assert_eq!(path, vec![cell]);
    }

    #[test]
    fn empty_grid_path_length_matches_chebyshev_distance() {
        let pathfinder = plain(10, 10);
        let start = CellCoord::new(0, 0);
        let goal = CellCoord::new(3, 4);
        let path = pathfinder
            .find_path(start, goal, &ObstacleSet::new(), None)
            .expect("open grid");
        assert_eq!(path.len() - 1, 4);
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        assert!(is_contiguous(&path));
    }

    #[test]
    fn walled_in_start_has_no_path() {
        let pathfinder = Pathfinder::new(5, 5);
        let start = CellCoord::new(2, 2);
        let obstacles: ObstacleSet = start.surrounding().collect();
        assert_eq!(
            pathfinder.find_path(start, CellCoord::new(4, 4), &obstacles, None),
            None
        );
    }

    #[test]
    fn corner_start_surrounded_by_grid_edge_and_walls_has_no_path() {
        let pathfinder = Pathfinder::new(5, 5);
        let obstacles: ObstacleSet = [CellCoord::new(1, 0), CellCoord::new(0, 1), CellCoord::new(1, 1)]
            .into_iter()
            .collect();
        assert_eq!(
            pathfinder.find_path(CellCoord::new(0, 0), CellCoord::new(4, 4), &obstacles, None),
            None
        );
    }

    #[test]
    fn walled_in_goal_has_no_path() {
        let pathfinder = Pathfinder::new(6, 6);
        let goal = CellCoord::new(4, 4);
        let obstacles: ObstacleSet = goal.surrounding().collect();
        assert_eq!(
            pathfinder.find_path(CellCoord::new(0, 0), goal, &obstacles, None),
            None
        );
    }

    #[test]
    fn out_of_bounds_endpoints_have_no_path() {
        let pathfinder = Pathfinder::new(4, 4);
        let inside = CellCoord::new(1, 1);
        assert_eq!(
            pathfinder.find_path(CellCoord::new(-1, 0), inside, &ObstacleSet::new(), None),
            None
        );
        assert_eq!(
            pathfinder.find_path(inside, CellCoord::new(4, 0), &ObstacleSet::new(), None),
            None
        );
    }

    #[test]
    fn start_cell_is_not_checked_against_obstacles() {
        let pathfinder = Pathfinder::new(4, 4);
        let start = CellCoord::new(0, 0);
        let obstacles: ObstacleSet = std::iter::once(start).collect();
        let path = pathfinder
            .find_path(start, CellCoord::new(2, 0), &obstacles, None)
            .expect("start may sit on an obstacle");
        assert_eq!(path.first(), Some(&start));
    }

    #[test]
    fn diagonal_moves_may_cut_between_blocked_corners() {
        let pathfinder = plain(2, 2);
        let obstacles: ObstacleSet = [CellCoord::new(1, 0), CellCoord::new(0, 1)]
            .into_iter()
            .collect();
        let path = pathfinder
            .find_path(CellCoord::new(0, 0), CellCoord::new(1, 1), &obstacles, None)
            .expect("corner cutting is allowed");
        assert_eq!(path, vec![CellCoord::new(0, 0), CellCoord::new(1, 1)]);
    }

    #[test]
    fn path_detours_around_a_wall() {
        let pathfinder = Pathfinder::new(7, 7);
        let obstacles: ObstacleSet = (0..6).map(|row| CellCoord::new(3, row)).collect();
        let path = pathfinder
            .find_path(CellCoord::new(0, 0), CellCoord::new(6, 0), &obstacles, None)
            .expect("gap at the bottom");
        assert!(path.iter().all(|cell| !obstacles.contains(*cell)));
        assert!(path.contains(&CellCoord::new(3, 6)));
        assert!(is_contiguous(&path));
    }

    #[test]
    fn wall_penalty_pushes_path_away_from_obstacles() {
        let obstacles: ObstacleSet = std::iter::once(CellCoord::new(3, 1)).collect();
        let start = CellCoord::new(0, 2);
        let goal = CellCoord::new(6, 2);

        let hugging = plain(7, 5)
            .with_heuristic(Heuristic::Octile)
            .find_path(start, goal, &obstacles, None)
            .expect("open corridor");
        let avoiding = Pathfinder::new(7, 5)
            .with_heuristic(Heuristic::Octile)
            .find_path(start, goal, &obstacles, None)
            .expect("open corridor");

        assert!(hugging.contains(&CellCoord::new(3, 2)));
        assert!(!avoiding.contains(&CellCoord::new(3, 2)));
    }

    #[test]
    fn crowd_penalty_only_applies_when_provided() {
        let pathfinder = Pathfinder::new(7, 5).with_heuristic(Heuristic::Octile);
        let crowd: ObstacleSet = std::iter::once(CellCoord::new(3, 1)).collect();
        let start = CellCoord::new(0, 2);
        let goal = CellCoord::new(6, 2);

        let ignoring = pathfinder
            .find_path(start, goal, &ObstacleSet::new(), None)
            .expect("open corridor");
        let avoiding = pathfinder
            .find_path(start, goal, &ObstacleSet::new(), Some(&crowd))
            .expect("open corridor");

        assert!(ignoring.contains(&CellCoord::new(3, 2)));
        assert!(!avoiding.contains(&CellCoord::new(3, 2)));
        assert_eq!(avoiding.last(), Some(&goal));
    }

    #[test]
    fn octile_estimate_never_exceeds_manhattan() {
        let a = CellCoord::new(0, 0);
        let b = CellCoord::new(3, 5);
        assert_eq!(Heuristic::Manhattan.estimate(a, b), 8.0);
        let octile = Heuristic::Octile.estimate(a, b);
        assert!((octile - (5.0 + (SQRT_2 - 1.0) * 3.0)).abs() < 1e-9);
    }

    #[test]
    fn clamp_pulls_goals_onto_the_searched_area() {
        let pathfinder = Pathfinder::new(10, 5);
        assert_eq!(pathfinder.clamp(CellCoord::new(25, 2)), CellCoord::new(9, 2));
        assert_eq!(pathfinder.clamp(CellCoord::new(-4, 7)), CellCoord::new(0, 4));
    }

    #[test]
    fn manhattan_heuristic_can_return_a_costlier_path() {
        let start = CellCoord::new(6, 5);
        let goal = CellCoord::new(1, 1);
        let obstacles: ObstacleSet = std::iter::once(CellCoord::new(4, 3)).collect();

        let manhattan = plain(8, 6)
            .find_path(start, goal, &obstacles, None)
            .expect("open grid");
        let octile = plain(8, 6)
            .with_heuristic(Heuristic::Octile)
            .find_path(start, goal, &obstacles, None)
            .expect("open grid");

        // Manhattan overestimates once diagonals are allowed, so the search
        // settles for a path one step longer than necessary.
        assert!((path_cost(&manhattan) - (3.0 + 3.0 * SQRT_2)).abs() < 1e-9);
        assert!((path_cost(&octile) - (1.0 + 4.0 * SQRT_2)).abs() < 1e-9);
        assert!(path_cost(&manhattan) > path_cost(&octile));
        assert!(is_contiguous(&manhattan));
    }

    fn path_cost(path: &[CellCoord]) -> f64 {
        path.windows(2)
            .map(|pair| {
                if pair[0].column() == pair[1].column() || pair[0].row() == pair[1].row() {
                    1.0
                } else {
                    SQRT_2
                }
            })
            .sum()
    }
}
