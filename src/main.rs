use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
};

use clap::Parser;
use mazestep::{
    Config, Generator, Speed,
    app::{self, DEFAULT_DIMENSIONS, Options},
};
use tracing_appender::non_blocking::WorkerGuard;

/// Step-by-step maze generation visualizer for the terminal.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Grid width in cells. Asked for interactively when omitted.
    #[arg(long, value_parser = clap::value_parser!(u16).range(3..=255))]
    width: Option<u16>,
    /// Grid height in cells. Asked for interactively when omitted.
    #[arg(long, value_parser = clap::value_parser!(u16).range(3..=255))]
    height: Option<u16>,
    /// Generation algorithm. Selected from a menu when omitted.
    #[arg(short, long, value_enum)]
    generator: Option<Generator>,
    /// Animation speed, 1 (slowest) to 10 (fastest).
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=10))]
    speed: Option<u8>,
    /// Seed for the random number generator, for reproducible mazes.
    #[arg(long)]
    seed: Option<u64>,
    /// Chance of opening each leftover wall after Kruskal's spanning tree is complete.
    #[arg(long, value_name = "PROBABILITY")]
    loop_probability: Option<f64>,
    /// Chance of each cell starting as a wall in the cellular automata.
    #[arg(long, value_name = "PROBABILITY")]
    wall_probability: Option<f64>,
    /// Number of smoothing passes of the cellular automata, at most 100.
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(0..=Config::MAX_ITERATIONS as u64)
    )]
    iterations: Option<u64>,
    /// Wall neighbors (out of 8) needed for a cell to become a wall.
    #[arg(long, value_name = "COUNT")]
    wall_threshold: Option<u8>,
    /// Generate without animation and print the maze as text.
    #[arg(long)]
    headless: bool,
    /// File the log is written to.
    #[arg(long, value_name = "PATH", default_value = "mazestep.log")]
    log_file: PathBuf,
    /// Most verbose level written to the log file.
    #[arg(long, value_name = "LEVEL", default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,
}

impl Args {
    fn config(&self) -> Config {
        let default = Config::default();
        Config {
            loop_probability: self.loop_probability.unwrap_or(default.loop_probability),
            initial_wall_probability: self
                .wall_probability
                .unwrap_or(default.initial_wall_probability),
            iterations: self
                .iterations
                .map_or(default.iterations, |iterations| iterations as usize),
            wall_threshold: self.wall_threshold.unwrap_or(default.wall_threshold),
            ..default
        }
    }

    fn options(&self) -> Options {
        Options {
            width: self.width,
            height: self.height,
            generator: self.generator,
            speed: self.speed.map(Speed::new),
            seed: self.seed,
        }
    }
}

/// Send logs to `path`. The terminal belongs to the renderer, so nothing is logged to it.
/// The returned guard flushes the log when dropped.
fn init_logging(path: &Path, level: tracing::Level) -> WorkerGuard {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map_or_else(|| "mazestep.log".into(), |name| name.to_owned());
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_max_level(level)
        .init();
    guard
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();
    let _guard = init_logging(&args.log_file, args.log_level);

    let config = args.config();
    config
        .validate()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let options = args.options();
    tracing::info!(?config, ?options, "[main] starting");

    let mut stdout = std::io::stdout();
    let interactive = !args.headless && stdout.is_terminal();
    if interactive {
        match app::setup_terminal(&mut stdout) {
            Ok(()) => {
                let result = app::run(&mut stdout, &config, &options);
                app::restore_terminal(&mut stdout)?;
                if let Err(e) = &result {
                    tracing::error!(error = %e, "[main] visualizer failed");
                }
                return result;
            }
            Err(e) => {
                // Best effort, the terminal may be half set up
                let _ = app::restore_terminal(&mut stdout);
                tracing::error!(error = %e, "[main] terminal setup failed, running headless");
            }
        }
    }

    let generator = options.generator.unwrap_or(Generator::RecurBacktrack);
    let width = options.width.unwrap_or(DEFAULT_DIMENSIONS.0);
    let height = options.height.unwrap_or(DEFAULT_DIMENSIONS.1);
    app::run_headless(&mut stdout, &config, generator, width, height, options.seed)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    Ok(())
}
