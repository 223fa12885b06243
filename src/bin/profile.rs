use std::time::Duration;

use mazestep::{Config, Generator, app};

/// Largest odd dimension, so every generator accepts it
const SIZE: u16 = 255;

fn main() -> Result<(), mazestep::MazeError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args();
    args.next(); // Skip executable name
    let num_iters = args
        .next()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10);

    let config = Config::default();
    for generator in Generator::ALL {
        let all_stats = app::profile(&config, generator, SIZE, SIZE, num_iters)?;
        let total = all_stats.iter().map(|s| s.elapsed).sum::<Duration>();
        let steps = all_stats.iter().map(|s| s.step_count).sum::<usize>();
        let runs = all_stats.len().max(1);
        let average = total / runs as u32;
        tracing::info!(
            %generator,
            runs,
            ?total,
            ?average,
            average_steps = steps / runs,
            "[profile] done"
        );
    }
    Ok(())
}
