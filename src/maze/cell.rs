use crossterm::style::{Color, Stylize};

use std::fmt;

/// State of one grid position.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub is_wall: bool,
    /// Reached by the generator
    pub visited: bool,
    /// The cell the generator is working on. At most one per grid.
    pub is_current: bool,
    /// Marked as part of a finished path
    pub is_path: bool,
}

impl Cell {
    pub const WALL: Cell = Cell {
        is_wall: true,
        visited: false,
        is_current: false,
        is_path: false,
    };
    pub const OPEN: Cell = Cell {
        is_wall: false,
        visited: false,
        is_current: false,
        is_path: false,
    };
    /// The width of each cell when rendered, in character widths.
    pub const CELL_WIDTH: u16 = 2;

    /// Merge the fields set in `patch` into this cell.
    /// Returns whether anything changed.
    pub fn merge(&mut self, patch: CellPatch) -> bool {
        let old = *self;
        if let Some(is_wall) = patch.is_wall {
            self.is_wall = is_wall;
        }
        if let Some(visited) = patch.visited {
            self.visited = visited;
        }
        if let Some(is_current) = patch.is_current {
            self.is_current = is_current;
        }
        if let Some(is_path) = patch.is_path {
            self.is_path = is_path;
        }
        old != *self
    }

    pub fn is_passage(&self) -> bool {
        !self.is_wall
    }
}

/// A partial cell state. Fields left as `None` are kept when merged into a [`Cell`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CellPatch {
    pub is_wall: Option<bool>,
    pub visited: Option<bool>,
    pub is_current: Option<bool>,
    pub is_path: Option<bool>,
}

impl CellPatch {
    pub const fn new() -> Self {
        CellPatch {
            is_wall: None,
            visited: None,
            is_current: None,
            is_path: None,
        }
    }

    pub const fn wall(mut self, is_wall: bool) -> Self {
        self.is_wall = Some(is_wall);
        self
    }

    pub const fn visited(mut self, visited: bool) -> Self {
        self.visited = Some(visited);
        self
    }

    pub const fn current(mut self, is_current: bool) -> Self {
        self.is_current = Some(is_current);
        self
    }

    pub const fn path(mut self, is_path: bool) -> Self {
        self.is_path = Some(is_path);
        self
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Current wins over everything else so the generator head is always visible
        let styled_symbol = if self.is_current {
            "🟩".with(Color::Green)
        } else if self.is_path {
            "🟥".with(Color::Red)
        } else if self.is_wall {
            "⬜".with(Color::White)
        } else if self.visited {
            "  ".with(Color::Reset)
        } else {
            "· ".with(Color::DarkGrey)
        };

        #[cfg(debug_assertions)]
        {
            use unicode_width::UnicodeWidthStr;
            assert_eq!(
                styled_symbol.content().width(),
                Cell::CELL_WIDTH as usize,
                "Each cell must occupy exactly two character widths."
            );
        }

        write!(f, "{}", styled_symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut cell = Cell::WALL;
        assert!(cell.merge(CellPatch::new().visited(true)));
        assert!(cell.is_wall);
        assert!(cell.visited);

        assert!(cell.merge(CellPatch::new().wall(false).current(true)));
        assert_eq!(
            cell,
            Cell {
                is_wall: false,
                visited: true,
                is_current: true,
                is_path: false,
            }
        );
    }

    #[test]
    fn test_merge_reports_no_change() {
        let mut cell = Cell::OPEN;
        assert!(!cell.merge(CellPatch::new()));
        assert!(!cell.merge(CellPatch::new().wall(false)));
        assert!(cell.merge(CellPatch::new().path(true)));
    }

    #[test]
    fn test_display_width() {
        let cells = [
            Cell::WALL,
            Cell::OPEN,
            Cell {
                visited: true,
                ..Cell::OPEN
            },
            Cell {
                is_current: true,
                ..Cell::OPEN
            },
            Cell {
                is_path: true,
                ..Cell::OPEN
            },
        ];
        // Display asserts the width in debug builds
        for cell in cells {
            assert!(!cell.to_string().is_empty());
        }
    }
}
