//! Read-only queries over a finished (or in-progress) grid.

use std::collections::VecDeque;

use super::grid::Grid;

/// Number of passage cells.
pub fn open_cells(grid: &Grid) -> usize {
    grid.cells().iter().filter(|cell| cell.is_passage()).count()
}

/// Number of pairs of passage cells that are next to each other horizontally or vertically.
pub fn passage_edges(grid: &Grid) -> usize {
    (0..grid.height())
        .flat_map(|y| (0..grid.width()).map(move |x| (x, y)))
        .filter(|&coord| grid[coord].is_passage())
        .map(|(x, y)| {
            // Only look right and down so every edge is counted once
            [(x.saturating_add(1), y), (x, y.saturating_add(1))]
                .into_iter()
                .filter(|&n| n != (x, y))
                .filter(|&n| grid.get(n).is_some_and(|cell| cell.is_passage()))
                .count()
        })
        .sum()
}

/// Number of passage cells reachable from `start` by flood fill, `start` included.
/// Zero when `start` is a wall or out of bounds.
pub fn reachable_from(grid: &Grid, start: (u16, u16)) -> usize {
    if !grid.get(start).is_some_and(|cell| cell.is_passage()) {
        return 0;
    }

    let mut seen = vec![false; grid.cells().len()];
    let index = |(x, y): (u16, u16)| y as usize * grid.width() as usize + x as usize;

    let mut queue = VecDeque::from([start]);
    seen[index(start)] = true;
    let mut count = 0;

    while let Some(coord) = queue.pop_front() {
        count += 1;
        for neighbor in grid.neighbors4(coord, 1) {
            if grid[neighbor].is_passage() && !seen[index(neighbor)] {
                seen[index(neighbor)] = true;
                queue.push_back(neighbor);
            }
        }
    }
    count
}

/// Whether the passage cells form a tree: all reachable from `start` and no cycles.
pub fn is_perfect(grid: &Grid, start: (u16, u16)) -> bool {
    let open = open_cells(grid);
    open > 0 && reachable_from(grid, start) == open && passage_edges(grid) == open - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::{Cell, CellPatch};

    fn grid_from(rows: &[&str]) -> Grid {
        let mut grid = Grid::new(rows[0].len() as u16, rows.len() as u16, Cell::WALL);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == ' ' {
                    grid.set((x as u16, y as u16), CellPatch::new().wall(false));
                }
            }
        }
        grid
    }

    #[test]
    fn test_tree() {
        let grid = grid_from(&["#####", "#   #", "# ###", "#   #", "#####"]);
        assert_eq!(open_cells(&grid), 7);
        assert_eq!(passage_edges(&grid), 6);
        assert_eq!(reachable_from(&grid, (1, 1)), 7);
        assert!(is_perfect(&grid, (1, 1)));
    }

    #[test]
    fn test_cycle() {
        let grid = grid_from(&["#####", "#   #", "# # #", "#   #", "#####"]);
        assert_eq!(open_cells(&grid), 8);
        assert_eq!(passage_edges(&grid), 8);
        assert!(!is_perfect(&grid, (1, 1)));
    }

    #[test]
    fn test_disconnected() {
        let grid = grid_from(&["#####", "# # #", "#####"]);
        assert_eq!(reachable_from(&grid, (1, 1)), 1);
        assert_eq!(reachable_from(&grid, (0, 0)), 0);
        assert_eq!(reachable_from(&grid, (9, 9)), 0);
        assert!(!is_perfect(&grid, (1, 1)));
    }
}
