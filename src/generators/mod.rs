use rand::{SeedableRng, rngs::StdRng};

mod cellular;
mod kruskal;
mod recur_backtrack;

pub use cellular::CellularAutomata;
pub use kruskal::RandomizedKruskal;
pub use recur_backtrack::RecursiveBacktracker;

use crate::{config::Config, error::MazeError, maze::Grid};

/// Smallest width and height any generator accepts.
pub const MIN_DIMENSION: u16 = 3;

/// Get a random number generator, optionally seeded for reproducibility.
pub fn get_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Generator {
    #[value(name = "backtrack")]
    RecurBacktrack,
    #[value(name = "kruskal")]
    Kruskal,
    #[value(name = "cellular")]
    Cellular,
}

impl std::fmt::Display for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Generator::RecurBacktrack => write!(f, "Recursive Backtracking"),
            Generator::Kruskal => write!(f, "Kruskal's Algorithm (with loops)"),
            Generator::Cellular => write!(f, "Cellular Automata (caves)"),
        }
    }
}

impl Generator {
    /// Available maze generators
    pub const ALL: [Generator; 3] = [
        Generator::RecurBacktrack,
        Generator::Kruskal,
        Generator::Cellular,
    ];

    /// Backtracking and Kruskal lay passages on odd coordinates and walls on even ones,
    /// which only lines up with the outer wall when both dimensions are odd.
    pub fn requires_odd_dimensions(self) -> bool {
        matches!(self, Generator::RecurBacktrack | Generator::Kruskal)
    }

    pub fn validate_dimensions(self, width: u16, height: u16) -> Result<(), MazeError> {
        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            return Err(MazeError::TooSmall {
                width,
                height,
                min: MIN_DIMENSION,
            });
        }
        if self.requires_odd_dimensions() && (width % 2 == 0 || height % 2 == 0) {
            return Err(MazeError::EvenDimensions {
                generator: self,
                width,
                height,
            });
        }
        Ok(())
    }

    /// Build a fresh, uninitialized run of this generator on a `width` x `height` grid.
    pub fn build(
        self,
        width: u16,
        height: u16,
        config: &Config,
        seed: Option<u64>,
    ) -> Result<Box<dyn MazeAlgorithm>, MazeError> {
        let rng = get_rng(seed);
        Ok(match self {
            Generator::RecurBacktrack => {
                Box::new(RecursiveBacktracker::new(width, height, config, rng)?)
            }
            Generator::Kruskal => Box::new(RandomizedKruskal::new(width, height, config, rng)?),
            Generator::Cellular => Box::new(CellularAutomata::new(width, height, config, rng)?),
        })
    }
}

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRecord {
    pub complete: bool,
    /// The cell marked current after the step. `None` once complete.
    pub current: Option<(u16, u16)>,
    pub step_count: usize,
    /// Backtrack stack depth for backtracking, remaining work items for the other generators
    pub stack_size: usize,
}

/// Lifecycle shared by all generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunState {
    Uninitialized,
    Stepping,
    Complete,
}

/// Step-wise contract every generator implements.
///
/// A run owns its grid. `step` never fails: once the run is complete it keeps returning the
/// terminal record and leaves the grid untouched. Calling `step` on an uninitialized run
/// initializes it first.
pub trait MazeAlgorithm {
    fn generator(&self) -> Generator;

    fn grid(&self) -> &Grid;

    /// Reset the grid and run state to the algorithm's starting point.
    fn initialize(&mut self);

    /// Perform one atomic transition.
    fn step(&mut self) -> StepRecord;

    fn is_complete(&self) -> bool;

    fn step_count(&self) -> usize;

    /// Rough number of steps a full run takes, used for progress percentages.
    fn expected_steps(&self) -> usize;

    /// Number of cells whose state the algorithm decided.
    fn cells_processed(&self) -> usize;

    /// Nominal start cell, used to measure reachability.
    fn start(&self) -> (u16, u16);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Step until complete, with a cap so a broken generator fails instead of hanging.
    pub(crate) fn run_to_completion(algorithm: &mut dyn MazeAlgorithm) -> StepRecord {
        let cap = 100 * algorithm.expected_steps().max(1) + 1000;
        let mut last = algorithm.step();
        while !last.complete {
            assert!(last.step_count < cap, "generator did not terminate");
            last = algorithm.step();
        }
        last
    }

    /// Number of cells currently marked current.
    pub(crate) fn current_cells(grid: &Grid) -> usize {
        grid.cells().iter().filter(|cell| cell.is_current).count()
    }

    #[test]
    fn test_validate_dimensions() {
        assert!(Generator::RecurBacktrack.validate_dimensions(5, 7).is_ok());
        assert!(matches!(
            Generator::Kruskal.validate_dimensions(6, 7),
            Err(MazeError::EvenDimensions { .. })
        ));
        assert!(Generator::Cellular.validate_dimensions(6, 8).is_ok());
        assert!(matches!(
            Generator::Cellular.validate_dimensions(2, 8),
            Err(MazeError::TooSmall { .. })
        ));
    }

    #[test]
    fn test_same_seed_same_maze() {
        let config = Config::default();
        for generator in Generator::ALL {
            let mut a = generator.build(21, 15, &config, Some(7)).unwrap();
            let mut b = generator.build(21, 15, &config, Some(7)).unwrap();
            let record_a = run_to_completion(a.as_mut());
            let record_b = run_to_completion(b.as_mut());
            assert_eq!(record_a, record_b, "{generator}");
            assert_eq!(a.grid(), b.grid(), "{generator}");
        }
    }

    #[test]
    fn test_single_current_cell_while_stepping() {
        let config = Config::default();
        for generator in Generator::ALL {
            let mut algorithm = generator.build(11, 9, &config, Some(3)).unwrap();
            algorithm.initialize();
            assert_eq!(current_cells(algorithm.grid()), 1, "{generator}");
            loop {
                let record = algorithm.step();
                if record.complete {
                    assert_eq!(record.current, None);
                    assert_eq!(current_cells(algorithm.grid()), 0, "{generator}");
                    break;
                }
                assert_eq!(current_cells(algorithm.grid()), 1, "{generator}");
                let current = record.current.unwrap();
                assert!(algorithm.grid()[current].is_current);
            }
        }
    }

    #[test]
    fn test_step_after_completion_is_idempotent() {
        let config = Config::default();
        for generator in Generator::ALL {
            let mut algorithm = generator.build(9, 9, &config, Some(11)).unwrap();
            let terminal = run_to_completion(algorithm.as_mut());
            let grid = algorithm.grid().clone();
            for _ in 0..3 {
                assert_eq!(algorithm.step(), terminal, "{generator}");
            }
            assert_eq!(algorithm.grid(), &grid);
            assert!(algorithm.is_complete());
            assert_eq!(algorithm.step_count(), terminal.step_count);
        }
    }

    #[test]
    fn test_step_initializes_lazily() {
        let config = Config::default();
        let mut algorithm = Generator::RecurBacktrack
            .build(7, 7, &config, Some(1))
            .unwrap();
        let record = algorithm.step();
        assert_eq!(record.step_count, 1);
        assert!(algorithm.grid()[(1, 1)].visited);
    }
}
