//! Runs one generator at a time, step by step, and tells subscribers about it.

pub mod events;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

pub use events::{EventBus, GenerationEvent, Subscription};

use crate::{
    config::{Config, Speed},
    error::MazeError,
    generators::{Generator, MazeAlgorithm, StepRecord},
    maze::{Grid, analysis},
};

/// Identity of one generation run. Later runs have larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(pub(crate) u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Summary of a finished run. Computed once, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationStats {
    pub generator: Generator,
    pub width: u16,
    pub height: u16,
    pub step_count: usize,
    pub elapsed: Duration,
    pub cells_processed: usize,
    pub open_cells: usize,
    /// Open cells connected to the generator's start cell
    pub reachable_cells: usize,
}

impl std::fmt::Display for GenerationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} on {}x{}: {} steps in {:.2?}, {} cells processed, {} open cells ({} reachable from start)",
            self.generator,
            self.width,
            self.height,
            self.step_count,
            self.elapsed,
            self.cells_processed,
            self.open_cells,
            self.reachable_cells
        )
    }
}

/// How [`Driver::generate`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(GenerationStats),
    /// The run was reset or replaced before it finished; its pending step was discarded
    Superseded { run: RunId, step_count: usize },
}

/// Thread-safe remote control for a [`Driver`]: resets runs and adjusts the animation speed.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    /// Id of the run allowed to apply steps
    active_run: Arc<AtomicU64>,
    speed: Arc<AtomicU8>,
}

impl DriverHandle {
    fn new(speed: Speed) -> Self {
        Self {
            active_run: Arc::new(AtomicU64::new(0)),
            speed: Arc::new(AtomicU8::new(speed.get())),
        }
    }

    /// Invalidate the active run. Its next step is discarded instead of applied.
    pub fn reset(&self) {
        let previous = self.active_run.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(run = previous, "reset requested");
    }

    /// Reserve the id of a new run, superseding any previous one.
    fn next_run(&self) -> RunId {
        RunId(self.active_run.fetch_add(1, Ordering::AcqRel) + 1)
    }

    fn is_active(&self, run: RunId) -> bool {
        self.active_run.load(Ordering::Acquire) == run.0
    }

    pub fn speed(&self) -> Speed {
        Speed::new(self.speed.load(Ordering::Relaxed))
    }

    pub fn set_speed(&self, speed: Speed) {
        self.speed.store(speed.get(), Ordering::Relaxed);
    }

    pub fn speed_up(&self) -> Speed {
        let speed = self.speed().faster();
        self.set_speed(speed);
        speed
    }

    pub fn slow_down(&self) -> Speed {
        let speed = self.speed().slower();
        self.set_speed(speed);
        speed
    }
}

struct Run {
    id: RunId,
    algorithm: Box<dyn MazeAlgorithm>,
    started_at: Instant,
    stats: Option<GenerationStats>,
}

/// Owns the active generation run and drives it.
///
/// Single-threaded: the run and its grid are only touched from the thread that owns the
/// driver. Other threads (or callbacks) talk to it through a [`DriverHandle`].
pub struct Driver {
    config: Config,
    run: Option<Run>,
    events: EventBus,
    handle: DriverHandle,
}

impl Driver {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            run: None,
            events: EventBus::default(),
            handle: DriverHandle::new(Speed::default()),
        }
    }

    pub fn handle(&self) -> DriverHandle {
        self.handle.clone()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(&GenerationEvent<'_>) + 'static,
    {
        self.events.subscribe(callback)
    }

    /// Id of the current run, if it has not been superseded.
    pub fn active_run(&self) -> Option<RunId> {
        self.run
            .as_ref()
            .map(|run| run.id)
            .filter(|&id| self.handle.is_active(id))
    }

    /// Live grid of the current run.
    pub fn grid(&self) -> Option<&Grid> {
        self.run.as_ref().map(|run| run.algorithm.grid())
    }

    /// Replace any previous run with a fresh, initialized run of `generator`.
    pub fn start(
        &mut self,
        generator: Generator,
        width: u16,
        height: u16,
        seed: Option<u64>,
    ) -> Result<RunId, MazeError> {
        let mut algorithm = generator.build(width, height, &self.config, seed)?;
        self.discard_run();

        algorithm.initialize();
        let id = self.handle.next_run();
        tracing::info!(run = %id, %generator, width, height, ?seed, "starting generation run");

        let run = self.run.insert(Run {
            id,
            algorithm,
            started_at: Instant::now(),
            stats: None,
        });
        self.events.emit(&GenerationEvent::Started {
            run: id,
            generator,
            grid: run.algorithm.grid(),
        });
        Ok(id)
    }

    /// Drop the current run, telling subscribers if it had not finished.
    pub fn reset(&mut self) {
        self.handle.reset();
        self.discard_run();
    }

    fn discard_run(&mut self) {
        if let Some(run) = self.run.take()
            && run.stats.is_none()
        {
            tracing::info!(
                run = %run.id,
                steps = run.algorithm.step_count(),
                "generation run discarded"
            );
            self.events.emit(&GenerationEvent::Reset { run: run.id });
        }
    }

    /// Re-initialize the current run from scratch.
    pub fn initialize(&mut self) -> Result<(), MazeError> {
        if self.active_run().is_none() {
            return Err(MazeError::NoActiveRun);
        }
        let Some(run) = self.run.as_mut() else {
            return Err(MazeError::NoActiveRun);
        };
        run.algorithm.initialize();
        run.started_at = Instant::now();
        run.stats = None;
        self.events.emit(&GenerationEvent::Started {
            run: run.id,
            generator: run.algorithm.generator(),
            grid: run.algorithm.grid(),
        });
        Ok(())
    }

    /// Apply one step of the current run.
    ///
    /// Returns `None` when there is no run, or when the run was superseded through a
    /// [`DriverHandle`]; a superseded run is dropped without applying the step.
    pub fn step(&mut self) -> Option<StepRecord> {
        let id = self.run.as_ref()?.id;
        if !self.handle.is_active(id) {
            tracing::debug!(run = %id, "discarding step of superseded run");
            self.discard_run();
            return None;
        }
        let run = self.run.as_mut()?;

        let was_complete = run.algorithm.is_complete();
        let record = run.algorithm.step();
        if was_complete {
            return Some(record);
        }

        let percentage = progress_percentage(record.step_count, run.algorithm.expected_steps());
        self.events.emit(&GenerationEvent::Progress {
            run: run.id,
            percentage,
            record,
            grid: run.algorithm.grid(),
        });

        if record.complete {
            let algorithm = &run.algorithm;
            let grid = algorithm.grid();
            let stats = run.stats.insert(GenerationStats {
                generator: algorithm.generator(),
                width: grid.width(),
                height: grid.height(),
                step_count: record.step_count,
                elapsed: run.started_at.elapsed(),
                cells_processed: algorithm.cells_processed(),
                open_cells: analysis::open_cells(grid),
                reachable_cells: analysis::reachable_from(grid, algorithm.start()),
            });
            tracing::info!(run = %run.id, %stats, "generation run complete");
            self.events.emit(&GenerationEvent::Completed {
                run: run.id,
                stats,
                grid,
            });
        }
        Some(record)
    }

    /// Statistics of the current run, once it is complete.
    pub fn stats(&self) -> Option<&GenerationStats> {
        self.run.as_ref()?.stats.as_ref()
    }

    /// Step the current run to completion, waiting between steps according to `speed`.
    ///
    /// `on_progress` receives the progress percentage, the step count and the step record
    /// after every step. The speed can be changed while the run is going through
    /// [`DriverHandle::set_speed`]; a [`DriverHandle::reset`] stops the run before its next step.
    pub fn generate<F>(
        &mut self,
        mut on_progress: F,
        speed: Speed,
    ) -> Result<RunOutcome, MazeError>
    where
        F: FnMut(f64, usize, &StepRecord),
    {
        let Some(id) = self.active_run() else {
            return Err(MazeError::NoActiveRun);
        };
        self.handle.set_speed(speed);
        if let Some(run) = self.run.as_mut() {
            run.started_at = Instant::now();
        }
        tracing::debug!(run = %id, %speed, "animating generation run");

        let mut step_count = 0;
        loop {
            if let Some(stats) = self.stats() {
                return Ok(RunOutcome::Completed(stats.clone()));
            }

            let delay = self.config.step_delay(self.handle.speed());
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            // The run may have been superseded while waiting
            let Some(record) = self.step() else {
                return Ok(RunOutcome::Superseded {
                    run: id,
                    step_count,
                });
            };
            step_count = record.step_count;

            let expected = self
                .run
                .as_ref()
                .map_or(1, |run| run.algorithm.expected_steps());
            on_progress(
                progress_percentage(record.step_count, expected),
                record.step_count,
                &record,
            );
        }
    }
}

/// `step_count / expected_steps * 100`. Not clamped: the expected step count of some
/// generators is only an estimate.
pub fn progress_percentage(step_count: usize, expected_steps: usize) -> f64 {
    step_count as f64 / expected_steps.max(1) as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    fn instant_driver() -> Driver {
        Driver::new(&Config::default().without_delay())
    }

    #[derive(Debug, PartialEq)]
    enum Seen {
        Started(RunId),
        Progress(RunId, usize),
        Completed(RunId, usize),
        Reset(RunId),
    }

    fn record_events(driver: &mut Driver) -> (Rc<RefCell<Vec<Seen>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = seen.clone();
        let subscription = driver.subscribe(move |event| {
            let entry = match *event {
                GenerationEvent::Started { run, .. } => Seen::Started(run),
                GenerationEvent::Progress { run, record, .. } => {
                    Seen::Progress(run, record.step_count)
                }
                GenerationEvent::Completed { run, stats, .. } => {
                    Seen::Completed(run, stats.step_count)
                }
                GenerationEvent::Reset { run } => Seen::Reset(run),
            };
            seen_in.borrow_mut().push(entry);
        });
        (seen, subscription)
    }

    #[test]
    fn test_generate_reports_in_order() {
        let mut driver = instant_driver();
        let (seen, _subscription) = record_events(&mut driver);
        let run = driver
            .start(Generator::RecurBacktrack, 5, 5, Some(1))
            .unwrap();

        let mut progress = Vec::new();
        let outcome = driver
            .generate(
                |percentage, steps, record| progress.push((percentage, steps, record.complete)),
                Speed::MAX,
            )
            .unwrap();

        let RunOutcome::Completed(stats) = outcome else {
            panic!("run did not complete: {outcome:?}");
        };
        assert_eq!(stats.step_count, 7);
        assert_eq!(stats.cells_processed, 4);
        assert_eq!(stats.open_cells, 7);
        assert_eq!(stats.reachable_cells, 7);

        // 25 / 4 = 6 expected steps, the last step overshoots
        let steps = progress.iter().map(|p| p.1).collect::<Vec<_>>();
        assert_eq!(steps, (1..=7).collect::<Vec<_>>());
        assert_eq!(progress[2].0, 50.0);
        assert!(progress[6].0 > 100.0);
        assert!(progress[6].2);

        let seen = seen.borrow();
        assert_eq!(seen.first(), Some(&Seen::Started(run)));
        assert_eq!(seen.last(), Some(&Seen::Completed(run, 7)));
        let progress_steps = seen
            .iter()
            .filter_map(|s| match s {
                Seen::Progress(_, steps) => Some(*steps),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(progress_steps, (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_generate_without_run() {
        let mut driver = instant_driver();
        assert_eq!(
            driver.generate(|_, _, _| {}, Speed::default()),
            Err(MazeError::NoActiveRun)
        );
        assert_eq!(driver.step(), None);
    }

    #[test]
    fn test_start_rejects_bad_dimensions() {
        let mut driver = instant_driver();
        assert!(matches!(
            driver.start(Generator::Kruskal, 10, 11, None),
            Err(MazeError::EvenDimensions { .. })
        ));
        assert_eq!(driver.active_run(), None);
    }

    #[test]
    fn test_reset_from_progress_supersedes_run() {
        let mut driver = instant_driver();
        let (seen, _subscription) = record_events(&mut driver);
        let run = driver.start(Generator::Kruskal, 21, 21, Some(5)).unwrap();

        let handle = driver.handle();
        let mut calls = 0;
        let outcome = driver
            .generate(
                |_, steps, _| {
                    calls += 1;
                    if steps == 3 {
                        handle.reset();
                    }
                },
                Speed::default(),
            )
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Superseded {
                run,
                step_count: 3
            }
        );
        // The step after the reset was discarded
        assert_eq!(calls, 3);
        assert_eq!(driver.active_run(), None);
        assert!(driver.grid().is_none());
        assert_eq!(seen.borrow().last(), Some(&Seen::Reset(run)));
    }

    #[test]
    fn test_new_run_replaces_old_one() {
        let mut driver = instant_driver();
        let (seen, _subscription) = record_events(&mut driver);
        let first = driver.start(Generator::Cellular, 10, 10, Some(1)).unwrap();
        driver.step();
        let second = driver.start(Generator::Cellular, 10, 10, Some(2)).unwrap();
        assert!(second > first);
        assert_eq!(driver.active_run(), Some(second));

        let seen = seen.borrow();
        assert_eq!(
            *seen,
            vec![
                Seen::Started(first),
                Seen::Progress(first, 1),
                Seen::Reset(first),
                Seen::Started(second),
            ]
        );
    }

    #[test]
    fn test_stale_handle_reset_discards_step() {
        let mut driver = instant_driver();
        driver.start(Generator::RecurBacktrack, 9, 9, Some(3)).unwrap();
        driver.step();
        let before = driver.grid().cloned();

        driver.handle().reset();
        assert_eq!(driver.active_run(), None);
        // The grid is left as it was, then dropped
        assert_eq!(driver.grid().cloned(), before);
        assert_eq!(driver.step(), None);
        assert!(driver.grid().is_none());
    }

    #[test]
    fn test_completed_once_and_step_idempotent() {
        let mut driver = instant_driver();
        let (seen, _subscription) = record_events(&mut driver);
        driver.start(Generator::Cellular, 6, 6, Some(4)).unwrap();
        let outcome = driver.generate(|_, _, _| {}, Speed::MAX).unwrap();
        assert!(matches!(outcome, RunOutcome::Completed(_)));

        let events = seen.borrow().len();
        let grid = driver.grid().cloned();
        let record = driver.step().unwrap();
        assert!(record.complete);
        assert_eq!(driver.grid().cloned(), grid);
        assert_eq!(seen.borrow().len(), events);

        // Generating a finished run returns the same stats right away
        let again = driver.generate(|_, _, _| panic!("no more steps"), Speed::MAX);
        assert_eq!(again, Ok(outcome));

        // Resetting a finished run does not announce a reset
        driver.reset();
        assert!(!matches!(seen.borrow().last(), Some(Seen::Reset(_))));
    }

    #[test]
    fn test_exact_generators_finish_at_full_progress() {
        for generator in [Generator::Kruskal, Generator::Cellular] {
            for seed in 0..5 {
                let mut driver = instant_driver();
                let last_event = Rc::new(RefCell::new(None));
                let last_event_in = last_event.clone();
                let _subscription = driver.subscribe(move |event| {
                    if let GenerationEvent::Progress { percentage, .. } = *event {
                        *last_event_in.borrow_mut() = Some(percentage);
                    }
                });
                driver.start(generator, 21, 21, Some(seed)).unwrap();

                let mut last = 0.0;
                driver
                    .generate(|percentage, _, _| last = percentage, Speed::MAX)
                    .unwrap();
                assert_eq!(last, 100.0, "{generator} seed {seed}");
                assert_eq!(*last_event.borrow(), Some(100.0), "{generator} seed {seed}");
            }
        }
    }

    #[test]
    fn test_initialize_restarts_run() {
        let mut driver = instant_driver();
        let run = driver.start(Generator::Kruskal, 7, 7, Some(8)).unwrap();
        driver.generate(|_, _, _| {}, Speed::MAX).unwrap();
        assert!(driver.stats().is_some());

        driver.initialize().unwrap();
        assert!(driver.stats().is_none());
        assert_eq!(driver.active_run(), Some(run));
        assert_eq!(driver.step().map(|r| r.step_count), Some(1));
    }

    #[test]
    fn test_speed_controls() {
        let driver = instant_driver();
        let handle = driver.handle();
        handle.set_speed(Speed::new(9));
        assert_eq!(handle.speed_up(), Speed::MAX);
        assert_eq!(handle.speed_up(), Speed::MAX);
        assert_eq!(handle.slow_down(), Speed::new(9));
        // Handles are shared
        assert_eq!(driver.handle().speed(), Speed::new(9));
    }

    #[test]
    fn test_handle_is_send() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DriverHandle>();
    }

    #[test]
    fn test_animated_delay_is_applied() {
        let config = Config {
            min_step_delay: Duration::from_millis(1),
            max_step_delay: Duration::from_millis(1),
            ..Config::default()
        };
        let mut driver = Driver::new(&config);
        driver.start(Generator::RecurBacktrack, 5, 5, Some(0)).unwrap();
        let started = Instant::now();
        driver.generate(|_, _, _| {}, Speed::MAX).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(7));
    }
}
