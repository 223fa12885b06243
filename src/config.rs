use std::time::Duration;

use crate::error::MazeError;

/// Immutable settings shared by every component. Built once at startup and passed by
/// reference into the constructors that need it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Delay between two animated steps at the fastest speed
    pub min_step_delay: Duration,
    /// Delay between two animated steps at the slowest speed
    pub max_step_delay: Duration,
    /// Cell the backtracking generator starts carving from. Must be odd on both axes.
    pub start: (u16, u16),
    /// Chance that the union-find generator removes a leftover wall after the spanning pass
    pub loop_probability: f64,
    /// Chance that a cell starts out as a wall in the cellular automaton
    pub initial_wall_probability: f64,
    /// Number of smoothing passes of the cellular automaton
    pub iterations: usize,
    /// A cell becomes a wall when at least this many of its 8 neighbors are walls
    pub wall_threshold: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_step_delay: Duration::from_millis(2),
            max_step_delay: Duration::from_millis(250),
            start: (1, 1),
            loop_probability: 0.1,
            initial_wall_probability: 0.45,
            iterations: 5,
            wall_threshold: 4,
        }
    }
}

impl Config {
    /// Upper bound for [`Config::iterations`]
    pub const MAX_ITERATIONS: usize = 100;

    /// Same settings, but without any delay between animated steps.
    pub fn without_delay(&self) -> Self {
        Self {
            min_step_delay: Duration::ZERO,
            max_step_delay: Duration::ZERO,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), MazeError> {
        if self.min_step_delay > self.max_step_delay {
            return Err(MazeError::InvalidDelayRange {
                min: self.min_step_delay,
                max: self.max_step_delay,
            });
        }
        for (name, value) in [
            ("loop probability", self.loop_probability),
            ("initial wall probability", self.initial_wall_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MazeError::InvalidProbability { name, value });
            }
        }
        if self.iterations > Self::MAX_ITERATIONS {
            return Err(MazeError::TooManyIterations {
                value: self.iterations,
                max: Self::MAX_ITERATIONS,
            });
        }
        if self.wall_threshold > 8 {
            return Err(MazeError::InvalidWallThreshold(self.wall_threshold));
        }
        Ok(())
    }

    /// Delay to wait before each animated step at the given speed.
    /// Speed 1 maps to `max_step_delay`, speed 10 to `min_step_delay`, linearly in between.
    pub fn step_delay(&self, speed: Speed) -> Duration {
        let span = self.max_step_delay.saturating_sub(self.min_step_delay);
        let notches = (speed.get() - Speed::MIN.get()) as u32;
        let range = (Speed::MAX.get() - Speed::MIN.get()) as u32;
        self.max_step_delay.saturating_sub(span * notches / range)
    }
}

/// Animation speed, from 1 (slowest) to 10 (fastest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Speed(u8);

impl Speed {
    pub const MIN: Speed = Speed(1);
    pub const MAX: Speed = Speed(10);

    /// Clamps `value` into the valid speed range.
    pub fn new(value: u8) -> Self {
        Speed(value.clamp(Self::MIN.0, Self::MAX.0))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn faster(self) -> Self {
        Speed::new(self.0.saturating_add(1))
    }

    pub fn slower(self) -> Self {
        Speed::new(self.0.saturating_sub(1))
    }

    /// Every speed, slowest first
    pub fn all() -> impl Iterator<Item = Speed> {
        (Self::MIN.0..=Self::MAX.0).map(Speed)
    }
}

impl Default for Speed {
    fn default() -> Self {
        Speed(5)
    }
}

impl std::fmt::Display for Speed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Speed::MIN => write!(f, "{} (slowest)", self.0),
            Speed::MAX => write!(f, "{} (fastest)", self.0),
            _ => write!(f, "{}", self.0),
        }
    }
}
