pub mod analysis;
pub mod cell;
pub mod grid;

pub use cell::{Cell, CellPatch};
pub use grid::Grid;

/// Coordinate of the cell strictly between two cells that lie two steps apart on one axis.
pub fn cell_between(a: (u16, u16), b: (u16, u16)) -> (u16, u16) {
    (a.0.min(b.0) + a.0.abs_diff(b.0) / 2, a.1.min(b.1) + a.1.abs_diff(b.1) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_between() {
        assert_eq!(cell_between((1, 1), (3, 1)), (2, 1));
        assert_eq!(cell_between((3, 1), (1, 1)), (2, 1));
        assert_eq!(cell_between((5, 7), (5, 5)), (5, 6));
    }
}
