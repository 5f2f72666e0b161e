#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system deciding whether a tower may occupy a cell without sealing the route.

use detour_defence_core::{CellCoord, PlacementError, Waypoint};
use detour_defence_system_navigation::{Grid, Pathfinder};
use tracing::warn;

/// Checks that `candidate` can become an obstacle.
///
/// The cell must lie on the grid and be free, the base route needs at least two
/// checkpoints, and every pair of consecutive checkpoints must stay connected
/// once the candidate is added to the current obstacles. The grid is never
/// mutated; the check runs from scratch on every call.
///
/// # Errors
///
/// Returns the first [`PlacementError`] that applies.
pub fn validate(
    candidate: CellCoord,
    grid: &Grid,
    base_route: &[Waypoint],
    pathfinder: &Pathfinder,
) -> Result<(), PlacementError> {
    if !grid.in_bounds(candidate) {
        return Err(PlacementError::OutOfBounds);
    }
    if grid.is_occupied(candidate) {
        return Err(PlacementError::Occupied);
    }
    if base_route.len() < 2 {
        return Err(PlacementError::RouteTooShort);
    }

    let obstacles = grid.obstacles().with(candidate);
    for pair in base_route.windows(2) {
        let from = grid.clamp(pair[0].cell());
        let to = grid.clamp(pair[1].cell());
        if pathfinder.find_path(from, to, &obstacles, None).is_none() {
            warn!(%candidate, %from, %to, "tower would seal the corridor");
            return Err(PlacementError::SealsCorridor { from, to });
        }
    }
    Ok(())
}

/// Boolean form of [`validate`].
#[must_use]
pub fn can_place(
    candidate: CellCoord,
    grid: &Grid,
    base_route: &[Waypoint],
    pathfinder: &Pathfinder,
) -> bool {
    validate(candidate, grid, base_route, pathfinder).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> Vec<Waypoint> {
        vec![Waypoint::new(0.0, 2.0), Waypoint::new(9.0, 2.0)]
    }

    #[test]
    fn free_cell_next_to_route_is_accepted() {
        let grid = Grid::new(10, 5, 20.0);
        let pathfinder = Pathfinder::for_grid(&grid);
        assert_eq!(
            validate(CellCoord::new(4, 2), &grid, &route(), &pathfinder),
            Ok(())
        );
    }

    #[test]
    fn rejections_follow_check_order() {
        let mut grid = Grid::new(10, 5, 20.0);
        let pathfinder = Pathfinder::for_grid(&grid);
        let _ = grid.set_occupancy(CellCoord::new(3, 3), true);

        assert_eq!(
            validate(CellCoord::new(10, 0), &grid, &route(), &pathfinder),
            Err(PlacementError::OutOfBounds)
        );
        assert_eq!(
            validate(CellCoord::new(3, 3), &grid, &[], &pathfinder),
            Err(PlacementError::Occupied)
        );
        assert_eq!(
            validate(CellCoord::new(4, 4), &grid, &route()[..1], &pathfinder),
            Err(PlacementError::RouteTooShort)
        );
    }

    #[test]
    fn sealing_the_last_gap_is_rejected() {
        let mut grid = Grid::new(10, 5, 20.0);
        let pathfinder = Pathfinder::for_grid(&grid);
        for row in 0..4 {
            let _ = grid.set_occupancy(CellCoord::new(5, row), true);
        }
        let before = grid.clone();

        assert_eq!(
            validate(CellCoord::new(5, 4), &grid, &route(), &pathfinder),
            Err(PlacementError::SealsCorridor {
                from: CellCoord::new(0, 2),
                to: CellCoord::new(9, 2),
            })
        );
        assert!(!can_place(CellCoord::new(5, 4), &grid, &route(), &pathfinder));
        assert_eq!(grid, before);
    }

    #[test]
    fn checkpoints_cannot_be_built_on() {
        let grid = Grid::new(10, 5, 20.0);
        let pathfinder = Pathfinder::for_grid(&grid);
        assert!(!can_place(CellCoord::new(9, 2), &grid, &route(), &pathfinder));
    }

    #[test]
    fn checkpoints_beyond_the_grid_are_clamped() {
        let grid = Grid::new(10, 5, 20.0);
        let pathfinder = Pathfinder::for_grid(&grid);
        let route = vec![Waypoint::new(0.0, 2.0), Waypoint::new(25.0, 2.0)];
        assert_eq!(
            validate(CellCoord::new(9, 2), &grid, &route, &pathfinder),
            Err(PlacementError::SealsCorridor {
                from: CellCoord::new(0, 2),
                to: CellCoord::new(9, 2),
            })
        );
        assert!(can_place(CellCoord::new(8, 2), &grid, &route, &pathfinder));
    }
}
