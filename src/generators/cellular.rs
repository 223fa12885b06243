use rand::{Rng, rngs::StdRng};

use crate::{
    config::Config,
    error::MazeError,
    generators::{Generator, MazeAlgorithm, RunState, StepRecord},
    maze::{Cell, CellPatch, Grid},
};

/// Cave generator: random noise smoothed by a wall-count rule.
///
/// Each step rewrites one row. Every row of an iteration reads from the same snapshot of the
/// previous iteration, so the result does not depend on the order rows are processed in.
/// There is no connectivity guarantee; closed-off pockets are expected.
pub struct CellularAutomata {
    grid: Grid,
    rng: StdRng,
    initial_wall_probability: f64,
    iterations: usize,
    wall_threshold: u8,
    /// Wall flags of the previous iteration, row-major
    snapshot: Vec<bool>,
    iteration: usize,
    row: u16,
    start: (u16, u16),
    state: RunState,
    step_count: usize,
}

impl CellularAutomata {
    pub fn new(width: u16, height: u16, config: &Config, rng: StdRng) -> Result<Self, MazeError> {
        Generator::Cellular.validate_dimensions(width, height)?;
        if !(0.0..=1.0).contains(&config.initial_wall_probability) {
            return Err(MazeError::InvalidProbability {
                name: "initial wall probability",
                value: config.initial_wall_probability,
            });
        }
        if config.iterations > Config::MAX_ITERATIONS {
            return Err(MazeError::TooManyIterations {
                value: config.iterations,
                max: Config::MAX_ITERATIONS,
            });
        }
        if config.wall_threshold > 8 {
            return Err(MazeError::InvalidWallThreshold(config.wall_threshold));
        }

        let grid = Grid::new(width, height, Cell::WALL);
        // Caves have no carving start, fall back to the corner if the configured one is off-grid
        let start = if grid.is_valid_coordinate(config.start) {
            config.start
        } else {
            (0, 0)
        };

        Ok(CellularAutomata {
            grid,
            rng,
            initial_wall_probability: config.initial_wall_probability,
            iterations: config.iterations,
            wall_threshold: config.wall_threshold,
            snapshot: Vec::new(),
            iteration: 0,
            row: 0,
            start,
            state: RunState::Uninitialized,
            step_count: 0,
        })
    }

    fn take_snapshot(&mut self) {
        self.snapshot.clear();
        self.snapshot
            .extend(self.grid.cells().iter().map(|cell| cell.is_wall));
    }

    /// Walls among the in-bounds 8 neighbors of `coord` in the snapshot.
    fn wall_neighbors(&self, coord: (u16, u16)) -> u8 {
        let width = self.grid.width() as usize;
        self.grid
            .neighbors8(coord)
            .filter(|&(x, y)| self.snapshot[y as usize * width + x as usize])
            .count() as u8
    }

    fn remaining_rows(&self) -> usize {
        let rows = self.grid.height() as usize;
        (self.iterations - self.iteration)
            .saturating_mul(rows)
            .saturating_sub(self.row as usize)
    }

    fn record(&self) -> StepRecord {
        let complete = self.state == RunState::Complete;
        StepRecord {
            complete,
            current: (!complete).then_some((0, self.row)),
            step_count: self.step_count,
            stack_size: if complete { 0 } else { self.remaining_rows() },
        }
    }
}

impl MazeAlgorithm for CellularAutomata {
    fn generator(&self) -> Generator {
        Generator::Cellular
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn initialize(&mut self) {
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                let is_wall = self.rng.random_bool(self.initial_wall_probability);
                self.grid.set(
                    (x, y),
                    CellPatch::new()
                        .wall(is_wall)
                        .visited(false)
                        .current(false)
                        .path(false),
                );
            }
        }
        self.iteration = 0;
        self.row = 0;
        self.step_count = 0;
        self.take_snapshot();
        self.grid.set((0, 0), CellPatch::new().current(true));
        self.state = RunState::Stepping;
        tracing::debug!(
            iterations = self.iterations,
            wall_probability = self.initial_wall_probability,
            "initialized cellular automata"
        );
    }

    fn step(&mut self) -> StepRecord {
        match self.state {
            RunState::Uninitialized => self.initialize(),
            RunState::Complete => return self.record(),
            RunState::Stepping => {}
        }
        self.step_count += 1;

        if self.iteration >= self.iterations {
            self.grid.set((0, self.row), CellPatch::new().current(false));
            self.state = RunState::Complete;
            tracing::debug!(steps = self.step_count, "cellular automata complete");
            return self.record();
        }

        let y = self.row;
        for x in 0..self.grid.width() {
            let is_wall = self.wall_neighbors((x, y)) >= self.wall_threshold;
            self.grid
                .set((x, y), CellPatch::new().wall(is_wall).visited(true));
        }

        // Move the marker to the next row, wrapping into the next iteration
        self.grid.set((0, y), CellPatch::new().current(false));
        self.row += 1;
        if self.row == self.grid.height() {
            self.row = 0;
            self.iteration += 1;
            self.take_snapshot();
        }
        self.grid.set((0, self.row), CellPatch::new().current(true));

        self.record()
    }

    fn is_complete(&self) -> bool {
        self.state == RunState::Complete
    }

    fn step_count(&self) -> usize {
        self.step_count
    }

    fn expected_steps(&self) -> usize {
        self.iterations
            .saturating_mul(self.grid.height() as usize)
            .saturating_add(1)
    }

    fn cells_processed(&self) -> usize {
        self.grid.cells().len()
    }

    fn start(&self) -> (u16, u16) {
        self.start
    }
}
