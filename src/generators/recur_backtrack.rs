use rand::{Rng, rngs::StdRng};

use crate::{
    config::Config,
    error::MazeError,
    generators::{Generator, MazeAlgorithm, RunState, StepRecord},
    maze::{Cell, CellPatch, Grid, cell_between},
};

/// Randomized depth-first carving with an explicit backtrack stack.
///
/// Passage cells sit on odd coordinates; the cell strictly between two of them is the wall
/// that gets knocked down when the generator moves from one to the other. The result is a
/// perfect maze: every visited cell is reachable from the start through exactly one path.
pub struct RecursiveBacktracker {
    grid: Grid,
    rng: StdRng,
    start: (u16, u16),
    current: (u16, u16),
    /// Cells to come back to once the current one runs out of unvisited neighbors
    stack: Vec<(u16, u16)>,
    state: RunState,
    step_count: usize,
    visited: usize,
}

impl RecursiveBacktracker {
    /// Requires odd dimensions of at least 3 and an odd interior start cell.
    pub fn new(width: u16, height: u16, config: &Config, rng: StdRng) -> Result<Self, MazeError> {
        Generator::RecurBacktrack.validate_dimensions(width, height)?;

        let (x, y) = config.start;
        if x % 2 == 0 || y % 2 == 0 || x >= width - 1 || y >= height - 1 {
            return Err(MazeError::InvalidStart {
                x,
                y,
                width,
                height,
            });
        }

        Ok(RecursiveBacktracker {
            grid: Grid::new(width, height, Cell::WALL),
            rng,
            start: config.start,
            current: config.start,
            stack: Vec::new(),
            state: RunState::Uninitialized,
            step_count: 0,
            visited: 0,
        })
    }

    /// Cells two steps away that have not been carved into yet.
    fn unvisited_neighbors(&self) -> Vec<(u16, u16)> {
        self.grid
            .neighbors4(self.current, 2)
            .filter(|&c| !self.grid.is_boundary(c) && !self.grid[c].visited)
            .collect()
    }

    fn record(&self) -> StepRecord {
        let complete = self.state == RunState::Complete;
        StepRecord {
            complete,
            current: (!complete).then_some(self.current),
            step_count: self.step_count,
            stack_size: self.stack.len(),
        }
    }
}

impl MazeAlgorithm for RecursiveBacktracker {
    fn generator(&self) -> Generator {
        Generator::RecurBacktrack
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn initialize(&mut self) {
        self.grid.fill(Cell::WALL);
        self.stack.clear();
        self.step_count = 0;
        self.current = self.start;
        self.grid.set(
            self.start,
            CellPatch::new().wall(false).visited(true).current(true),
        );
        self.visited = 1;
        self.state = RunState::Stepping;
        tracing::debug!(start = ?self.start, "initialized recursive backtracking");
    }

    fn step(&mut self) -> StepRecord {
        match self.state {
            RunState::Uninitialized => self.initialize(),
            RunState::Complete => return self.record(),
            RunState::Stepping => {}
        }
        self.step_count += 1;

        let neighbors = self.unvisited_neighbors();
        if !neighbors.is_empty() {
            let neighbor = neighbors[self.rng.random_range(0..neighbors.len())];
            // Knock down the wall between the two cells, then move into the neighbor
            self.grid.set(
                cell_between(self.current, neighbor),
                CellPatch::new().wall(false).visited(true),
            );
            self.grid.set(self.current, CellPatch::new().current(false));
            self.grid.set(
                neighbor,
                CellPatch::new().wall(false).visited(true).current(true),
            );
            // Put the cell on the stack so we can look at its other neighbors later
            self.stack.push(self.current);
            self.current = neighbor;
            self.visited += 1;
        } else if let Some(previous) = self.stack.pop() {
            // Dead end, backtrack
            self.grid.set(self.current, CellPatch::new().current(false));
            self.grid.set(previous, CellPatch::new().current(true));
            self.current = previous;
        } else {
            self.grid
                .set(self.current, CellPatch::new().current(false).path(true));
            self.state = RunState::Complete;
            tracing::debug!(
                steps = self.step_count,
                visited = self.visited,
                "recursive backtracking complete"
            );
        }

        self.record()
    }

    fn is_complete(&self) -> bool {
        self.state == RunState::Complete
    }

    fn step_count(&self) -> usize {
        self.step_count
    }

    /// Approximation: one step per quarter of the grid. Real runs take about twice as many
    /// steps (carve plus backtrack), so progress can go past 100%.
    fn expected_steps(&self) -> usize {
        (self.grid.width() as usize * self.grid.height() as usize / 4).max(1)
    }

    fn cells_processed(&self) -> usize {
        self.visited
    }

    fn start(&self) -> (u16, u16) {
        self.start
    }
}
