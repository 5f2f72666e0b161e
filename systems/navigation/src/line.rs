use detour_defence_core::{CellCoord, Waypoint};

/// Iterator over the cells crossed by a straight segment, endpoints included.
#[derive(Clone, Debug)]
pub struct BresenhamLine {
    current: CellCoord,
    end: CellCoord,
    dx: i32,
    dy: i32,
    step_x: i32,
    step_y: i32,
    error: i32,
    finished: bool,
}

impl BresenhamLine {
    /// Creates a line walking from `start` to `end`.
    #[must_use]
    pub fn new(start: CellCoord, end: CellCoord) -> Self {
        let dx = (end.column() - start.column()).abs();
        let dy = (end.row() - start.row()).abs();
        Self {
            current: start,
            end,
            dx,
            dy,
            step_x: if start.column() < end.column() { 1 } else { -1 },
            step_y: if start.row() < end.row() { 1 } else { -1 },
            error: dx - dy,
            finished: false,
        }
    }
}

impl Iterator for BresenhamLine {
    type Item = CellCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let cell = self.current;
        if cell == self.end {
            self.finished = true;
            return Some(cell);
        }

        let doubled = 2 * self.error;
        let mut column = cell.column();
        let mut row = cell.row();
        if doubled > -self.dy {
            self.error -= self.dy;
            column += self.step_x;
        }
        if doubled < self.dx {
            self.error += self.dx;
            row += self.step_y;
        }
        self.current = CellCoord::new(column, row);
        Some(cell)
    }
}

/// Cells crossed by the segment between two fractional points, each floored to its cell.
#[must_use]
pub fn rasterize_line(start: Waypoint, end: Waypoint) -> BresenhamLine {
    BresenhamLine::new(start.cell(), end.cell())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(line: impl Iterator<Item = CellCoord>) -> Vec<(i32, i32)> {
        line.map(|cell| (cell.column(), cell.row())).collect()
    }

    #[test]
    fn single_cell_line_yields_one_cell() {
        let cell = CellCoord::new(4, 4);
        assert_eq!(cells(BresenhamLine::new(cell, cell)), vec![(4, 4)]);
    }

    #[test]
    fn horizontal_line_covers_every_column() {
        let line = BresenhamLine::new(CellCoord::new(0, 2), CellCoord::new(4, 2));
        assert_eq!(
            cells(line),
            vec![(0, 2), (1, 2), (2, 2), (3, 2), (4, 2)]
        );
    }

    #[test]
    fn reversed_diagonal_walks_backwards() {
        let line = BresenhamLine::new(CellCoord::new(3, 3), CellCoord::new(0, 0));
        assert_eq!(cells(line), vec![(3, 3), (2, 2), (1, 1), (0, 0)]);
    }

    #[test]
    fn shallow_slope_steps_rows_occasionally() {
        let line = BresenhamLine::new(CellCoord::new(0, 0), CellCoord::new(4, 2));
        assert_eq!(cells(line), vec![(0, 0), (1, 0), (2, 1), (3, 1), (4, 2)]);
    }

    #[test]
    fn fractional_endpoints_are_floored() {
        let line = rasterize_line(Waypoint::new(0.9, 0.2), Waypoint::new(2.7, 0.99));
        assert_eq!(cells(line), vec![(0, 0), (1, 0), (2, 0)]);
    }
}
