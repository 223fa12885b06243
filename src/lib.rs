pub mod app;
pub mod config;
pub mod driver;
pub mod error;
pub mod generators;
pub mod maze;

pub use config::{Config, Speed};
pub use driver::{Driver, DriverHandle, GenerationEvent, GenerationStats, RunOutcome};
pub use error::MazeError;
pub use generators::{Generator, MazeAlgorithm, StepRecord};
