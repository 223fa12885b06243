use std::fmt;

use super::cell::{Cell, CellPatch};

/// Row-major 2D array of cells addressed by `(x, y)`.
///
/// The grid belongs to one generation run. Renderers only ever see it through a shared
/// reference handed out by the driver, so every read is a live view of the run at that moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    data: Box<[Cell]>,
    width: u16,
    height: u16,
}

impl Grid {
    pub fn new(width: u16, height: u16, cell: Cell) -> Self {
        let data = vec![cell; width as usize * height as usize].into_boxed_slice();
        Grid {
            data,
            width,
            height,
        }
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.data
    }

    /// Bounds check only.
    pub fn is_valid_coordinate(&self, coord: (u16, u16)) -> bool {
        coord.0 < self.width && coord.1 < self.height
    }

    pub fn is_boundary(&self, coord: (u16, u16)) -> bool {
        let (x, y) = coord;
        x == 0 || y == 0 || x == self.width - 1 || y == self.height - 1
    }

    fn ravel_index(&self, x: u16, y: u16) -> usize {
        // Overflow-safe since width and height are u16 (assuming usize is at least 32 bits)
        y as usize * self.width as usize + x as usize
    }

    /// Returns a copy of the cell at `coord`, or `None` when out of bounds.
    pub fn get(&self, coord: (u16, u16)) -> Option<Cell> {
        self.is_valid_coordinate(coord)
            .then(|| self.data[self.ravel_index(coord.0, coord.1)])
    }

    /// Merges `patch` into the cell at `coord`. Returns whether the cell changed.
    ///
    /// # Panics
    /// If `coord` is out of bounds.
    pub fn set(&mut self, coord: (u16, u16), patch: CellPatch) -> bool {
        assert!(
            self.is_valid_coordinate(coord),
            "coordinate {:?} is out of bounds of a {}x{} grid",
            coord,
            self.width,
            self.height
        );
        let idx = self.ravel_index(coord.0, coord.1);
        self.data[idx].merge(patch)
    }

    /// Overwrites every cell.
    pub fn fill(&mut self, cell: Cell) {
        self.data.fill(cell);
    }

    /// Coordinates `distance` steps away in the four cardinal directions (left, right, up, down),
    /// skipping any that fall outside the grid.
    pub fn neighbors4(
        &self,
        coord: (u16, u16),
        distance: u16,
    ) -> impl Iterator<Item = (u16, u16)> + '_ {
        let (x, y) = coord;
        [
            // NOTE: When x < distance or y < distance, use u16::MAX instead of underflowing,
            // so the bounds check below filters it out.
            // When x + distance exceeds u16::MAX it saturates to u16::MAX, which is also never
            // a valid index since the largest dimension is u16::MAX.
            (x.checked_sub(distance).unwrap_or(u16::MAX), y),
            (x.saturating_add(distance), y),
            (x, y.checked_sub(distance).unwrap_or(u16::MAX)),
            (x, y.saturating_add(distance)),
        ]
        .into_iter()
        .filter(move |&c| self.is_valid_coordinate(coord) && self.is_valid_coordinate(c))
    }

    /// The up to 8 in-bounds coordinates surrounding `coord`.
    pub fn neighbors8(&self, coord: (u16, u16)) -> impl Iterator<Item = (u16, u16)> + '_ {
        let (x, y) = coord;
        let (x, y) = (x as i32, y as i32);
        (-1..=1)
            .flat_map(move |dy| (-1..=1).map(move |dx| (dx, dy)))
            .filter(|&offset| offset != (0, 0))
            .filter_map(move |(dx, dy)| {
                let nx = u16::try_from(x + dx).ok()?;
                let ny = u16::try_from(y + dy).ok()?;
                self.is_valid_coordinate((nx, ny)).then_some((nx, ny))
            })
    }
}

impl std::ops::Index<(u16, u16)> for Grid {
    type Output = Cell;

    fn index(&self, index: (u16, u16)) -> &Self::Output {
        &self.data[self.ravel_index(index.0, index.1)]
    }
}

/// Plain text view: `#` for walls, a space for passages.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.data.chunks(self.width.max(1) as usize) {
            for cell in row {
                let symbol = if cell.is_wall { '#' } else { ' ' };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_indexing() {
        let mut grid = Grid::new(5, 3, Cell::WALL);
        assert!(grid.set((2, 1), CellPatch::new().wall(false)));
        assert_eq!(grid[(2, 1)], Cell::OPEN);
        assert_eq!(grid.get((2, 1)), Some(Cell::OPEN));
        assert_eq!(grid.get((5, 1)), None);
        assert_eq!(grid.cells()[5 + 2], Cell::OPEN);
    }

    #[test]
    fn test_set_merges() {
        let mut grid = Grid::new(3, 3, Cell::WALL);
        grid.set((1, 1), CellPatch::new().visited(true));
        grid.set((1, 1), CellPatch::new().current(true));
        let cell = grid[(1, 1)];
        assert!(cell.is_wall && cell.visited && cell.is_current && !cell.is_path);
        // Setting the same state again reports no change
        assert!(!grid.set((1, 1), CellPatch::new().current(true)));
    }

    #[test]
    #[should_panic]
    fn test_set_out_of_bounds() {
        let mut grid = Grid::new(3, 3, Cell::WALL);
        grid.set((3, 0), CellPatch::new().wall(false));
    }

    #[test]
    fn test_out_of_bounds() {
        let grid = Grid::new(5, 5, Cell::WALL);
        assert!(!grid.is_valid_coordinate((5, 5)));
        assert!(!grid.is_valid_coordinate((0, 5)));
        assert!(!grid.is_valid_coordinate((5, 0)));
        assert!(grid.is_valid_coordinate((4, 4)));
        assert!(grid.is_boundary((0, 2)));
        assert!(grid.is_boundary((4, 2)));
        assert!(!grid.is_boundary((2, 2)));
    }

    #[test]
    fn test_neighbors4() {
        let grid = Grid::new(7, 7, Cell::WALL);
        let neighbors = grid.neighbors4((3, 3), 2).collect::<Vec<_>>();
        assert_eq!(neighbors, vec![(1, 3), (5, 3), (3, 1), (3, 5)]);

        let neighbors = grid.neighbors4((1, 1), 2).collect::<Vec<_>>();
        assert_eq!(neighbors, vec![(3, 1), (1, 3)]);

        assert_eq!(grid.neighbors4((9, 9), 1).count(), 0);
    }

    #[test]
    fn test_neighbors8() {
        let grid = Grid::new(4, 4, Cell::WALL);
        assert_eq!(grid.neighbors8((1, 1)).count(), 8);
        assert_eq!(grid.neighbors8((0, 0)).count(), 3);
        assert_eq!(grid.neighbors8((3, 1)).count(), 5);
    }

    #[test]
    fn test_display() {
        let mut grid = Grid::new(3, 2, Cell::WALL);
        grid.set((1, 0), CellPatch::new().wall(false));
        assert_eq!(grid.to_string(), "# #\n###\n");
    }
}
