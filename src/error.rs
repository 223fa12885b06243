use std::time::Duration;

use crate::generators::Generator;

/// Errors raised while validating a configuration or building a generation run.
/// Stepping itself never fails.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MazeError {
    #[error("grid dimensions {width}x{height} are too small, the minimum is {min}x{min}")]
    TooSmall { width: u16, height: u16, min: u16 },

    #[error("{generator} needs odd grid dimensions, got {width}x{height}")]
    EvenDimensions {
        generator: Generator,
        width: u16,
        height: u16,
    },

    #[error("start cell ({x}, {y}) must be an odd interior cell of a {width}x{height} grid")]
    InvalidStart {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    },

    #[error("{name} must be between 0 and 1, got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("at most {max} smoothing iterations are supported, got {value}")]
    TooManyIterations { value: usize, max: usize },

    #[error("wall threshold must be between 0 and 8, got {0}")]
    InvalidWallThreshold(u8),

    #[error("minimum step delay {min:?} is greater than maximum step delay {max:?}")]
    InvalidDelayRange { min: Duration, max: Duration },

    #[error("no generation run is active")]
    NoActiveRun,
}
