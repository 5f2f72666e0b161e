#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid occupancy and path planning primitives.
//!
//! The [`Grid`] is the single source of obstacle truth for a session. Planning
//! never reads it directly: callers take an [`ObstacleSet`] snapshot with
//! [`Grid::obstacles`] and hand it to the [`Pathfinder`], so a search always
//! observes a consistent layout.
//!
//! [`ObstacleSet`]: detour_defence_core::ObstacleSet

mod astar;
mod grid;
mod line;

pub use astar::{Heuristic, Pathfinder, SoftCosts};
pub use grid::Grid;
pub use line::{rasterize_line, BresenhamLine};
