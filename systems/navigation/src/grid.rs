use detour_defence_core::{CellCoord, ObstacleSet, Waypoint};

/// Fixed-size occupancy map of the playing field.
///
/// Dimensions never change after construction. Each mutation toggles a single
/// cell; the grid performs no legality checks of its own.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: u32,
    height: u32,
    cell_size: f64,
    cells: Vec<bool>,
}

impl Grid {
    /// Creates an empty grid with the provided dimensions and world-space cell size.
    #[must_use]
    pub fn new(width: u32, height: u32, cell_size: f64) -> Self {
        let cell_count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            cell_size,
            cells: vec![false; cell_count],
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Side length of a cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Reports whether the cell holds an obstacle. Cells outside the grid are never occupied.
    #[must_use]
    pub fn is_occupied(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(false)
    }

    /// Reports whether movement into the cell is impossible. Cells outside the grid are blocked.
    #[must_use]
    pub fn is_blocked(&self, cell: CellCoord) -> bool {
        match self.index(cell) {
            Some(index) => self.cells.get(index).copied().unwrap_or(true),
            None => true,
        }
    }

    /// Marks the cell as occupied or free.
    ///
    /// Returns `true` when the stored value changed. Out-of-bounds cells are ignored.
    pub fn set_occupancy(&mut self, cell: CellCoord, occupied: bool) -> bool {
        let Some(slot) = self.index(cell).and_then(|index| self.cells.get_mut(index)) else {
            return false;
        };
        let changed = *slot != occupied;
        *slot = occupied;
        changed
    }

    /// Frees every cell.
    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// Snapshot of all occupied cells.
    #[must_use]
    pub fn obstacles(&self) -> ObstacleSet {
        let width = self.width as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, occupied)| **occupied)
            .map(|(index, _)| CellCoord::new((index % width) as i32, (index / width) as i32))
            .collect()
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|occupied| **occupied).count()
    }

    /// Clamps the cell onto the grid, so both axes lie in `0..=dimension - 1`.
    #[must_use]
    pub fn clamp(&self, cell: CellCoord) -> CellCoord {
        let max_column = self.width.saturating_sub(1) as i32;
        let max_row = self.height.saturating_sub(1) as i32;
        CellCoord::new(
            cell.column().clamp(0, max_column),
            cell.row().clamp(0, max_row),
        )
    }

    /// World-space centre of the cell.
    #[must_use]
    pub fn grid_to_world(&self, cell: CellCoord) -> Waypoint {
        let half = self.cell_size / 2.0;
        Waypoint::new(
            f64::from(cell.column()) * self.cell_size + half,
            f64::from(cell.row()) * self.cell_size + half,
        )
    }

    /// Cell containing the world-space point.
    #[must_use]
    pub fn world_to_grid(&self, point: Waypoint) -> CellCoord {
        CellCoord::new(
            (point.x / self.cell_size).floor() as i32,
            (point.y / self.cell_size).floor() as i32,
        )
    }

    /// World-space position of a point measured in fractional cell units,
    /// using the same half-cell offset as [`Grid::grid_to_world`].
    #[must_use]
    pub fn cells_to_world(&self, point: Waypoint) -> Waypoint {
        let half = self.cell_size / 2.0;
        Waypoint::new(
            point.x * self.cell_size + half,
            point.y * self.cell_size + half,
        )
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        let column = u32::try_from(cell.column()).ok()?;
        let row = u32::try_from(cell.row()).ok()?;
        if column >= self.width || row >= self.height {
            return None;
        }
        usize::try_from(u64::from(row) * u64::from(self.width) + u64::from(column)).ok()
    }
}
