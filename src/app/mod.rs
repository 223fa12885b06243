pub mod renderer;

use std::{
    cell::RefCell,
    io::{Stdout, Write},
    rc::Rc,
    time::Duration,
};

use crossterm::{
    ExecutableCommand, QueueableCommand, cursor,
    event::{self, KeyCode},
    queue,
    style::{self, Attribute, Color, Stylize},
    terminal::{self, ClearType},
};

use crate::{
    config::{Config, Speed},
    driver::{Driver, DriverHandle, GenerationStats, RunOutcome},
    error::MazeError,
    generators::{Generator, MIN_DIMENSION},
};
use renderer::Renderer;

/// Width and height used when none are given in headless mode
pub const DEFAULT_DIMENSIONS: (u16, u16) = (31, 21);

/// Values fixed on the command line. Anything missing is asked for interactively.
#[derive(Debug, Default, Clone)]
pub struct Options {
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub generator: Option<Generator>,
    pub speed: Option<Speed>,
    pub seed: Option<u64>,
}

/// What the user asked for while a run was animating
#[derive(Debug, Clone, Copy, PartialEq)]
enum Control {
    /// Throw the run away and start a new one
    Restart,
    /// Throw the run away and leave
    Quit,
}

/// Set a panic hook to restore terminal state on panic
/// This ensures that the terminal is not left in raw mode or alternate screen on panic
fn set_panic_hook() {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Ignore any errors as we are already failing
        let _ = restore_terminal(&mut std::io::stdout());
        hook(panic_info);
    }));
}

/// Setup terminal in raw mode and enter alternate screen
/// Also sets a panic hook to restore terminal on panic
pub fn setup_terminal(stdout: &mut Stdout) -> std::io::Result<()> {
    terminal::enable_raw_mode()?;
    set_panic_hook();
    queue!(
        stdout,
        terminal::EnterAlternateScreen,
        terminal::Clear(ClearType::All),
        cursor::Hide,
        cursor::MoveTo(0, 0)
    )?;
    stdout.flush()?;
    Ok(())
}

/// Restore terminal to original state
/// Leave alternate screen and disable raw mode
pub fn restore_terminal(stdout: &mut Stdout) -> std::io::Result<()> {
    queue!(stdout, terminal::LeaveAlternateScreen, cursor::Show)?;
    stdout.flush()?;
    terminal::disable_raw_mode()?;
    Ok(())
}

/// Entry point of the interactive visualizer
pub fn run(stdout: &mut Stdout, config: &Config, options: &Options) -> std::io::Result<()> {
    queue!(
        stdout,
        style::SetAttribute(Attribute::Reverse),
        style::PrintStyledContent("Maze Generation Visualizer\r\n".with(Color::Yellow)),
        style::SetAttribute(Attribute::NoReverse),
    )?;
    stdout.flush()?;

    // Ask user for maze generation algorithm
    let generator = match options.generator {
        Some(generator) => generator,
        None => match select_from_menu(
            stdout,
            "Select maze generation algorithm (use arrow keys and Enter, or Esc to exit):",
            &Generator::ALL,
        )? {
            Some(generator) => generator,
            None => return Ok(()),
        },
    };
    stdout.execute(style::PrintStyledContent(
        format!("Selected generator: {}\r\n", generator)
            .with(Color::Green)
            .attribute(Attribute::Bold),
    ))?;

    // Ask user for grid dimensions
    let (width, height) = match (options.width, options.height) {
        (Some(width), Some(height)) => (width, height),
        _ => match ask_grid_dimensions(stdout, generator)? {
            Some(dims) => dims,
            None => return Ok(()),
        },
    };

    // Ask user for animation speed
    let mut speed = match options.speed {
        Some(speed) => speed,
        None => {
            let speeds = Speed::all().collect::<Vec<_>>();
            match select_from_menu(
                stdout,
                "Select animation speed (use arrow keys and Enter, or Esc to exit):",
                &speeds,
            )? {
                Some(speed) => speed,
                None => return Ok(()),
            }
        }
    };

    queue!(
        stdout,
        style::PrintStyledContent(
            "Controls:\r\n"
                .with(Color::Yellow)
                .attribute(Attribute::Bold)
        ),
        style::PrintStyledContent("  ↑/↓: Speed up/slow down animation\r\n".with(Color::Cyan)),
        style::PrintStyledContent("  r: Reset and start a new maze\r\n".with(Color::Cyan)),
        style::PrintStyledContent("  Esc: Exit\r\n\r\n".with(Color::Cyan)),
        style::PrintStyledContent("Press Enter to start...\r\n".with(Color::Blue)),
    )?;
    stdout.flush()?;
    if wait_for_keypress(&[KeyCode::Enter, KeyCode::Esc])? == KeyCode::Esc {
        return Ok(());
    }

    let mut driver = Driver::new(config);
    let handle = driver.handle();
    let renderer = Rc::new(RefCell::new(Renderer::new()));

    let _subscription = {
        let renderer = renderer.clone();
        let handle = handle.clone();
        driver.subscribe(move |event| {
            let mut renderer = renderer.borrow_mut();
            if let Err(e) = renderer.handle_event(event, handle.speed()) {
                // Rendering is optional, the run goes on without it
                tracing::error!(error = %e, "terminal renderer failed, disabling it");
                renderer.disable();
            }
        })
    };

    loop {
        driver
            .start(generator, width, height, options.seed)
            .map_err(std::io::Error::other)?;

        let mut requested = None;
        let outcome = driver
            .generate(
                |_, _, _| {
                    if requested.is_some() {
                        return;
                    }
                    match poll_controls(&handle, &renderer) {
                        Ok(control) => requested = control,
                        Err(e) => tracing::warn!(error = %e, "could not read terminal input"),
                    }
                },
                speed,
            )
            .map_err(std::io::Error::other)?;
        // Keep speed changes made during the run for the next one
        speed = handle.speed();

        match outcome {
            RunOutcome::Superseded { run, step_count } => {
                tracing::info!(%run, step_count, ?requested, "run stopped by user");
                if requested == Some(Control::Quit) {
                    break;
                }
            }
            RunOutcome::Completed(_) => {
                renderer
                    .borrow_mut()
                    .prompt("Done! Press r to generate another maze, Esc to exit...")?;
                if wait_for_keypress(&[KeyCode::Char('r'), KeyCode::Esc])? == KeyCode::Esc {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Check for pending key presses without blocking. Speed keys are applied right away;
/// reset and exit keys supersede the active run.
fn poll_controls(
    handle: &DriverHandle,
    renderer: &RefCell<Renderer>,
) -> std::io::Result<Option<Control>> {
    while event::poll(Duration::ZERO)? {
        match event::read()? {
            event::Event::Key(key_event) if key_event.kind == event::KeyEventKind::Press => {
                match key_event.code {
                    KeyCode::Up => {
                        let speed = handle.speed_up();
                        tracing::debug!(%speed, "speed up");
                    }
                    KeyCode::Down => {
                        let speed = handle.slow_down();
                        tracing::debug!(%speed, "slow down");
                    }
                    KeyCode::Char('r') => {
                        handle.reset();
                        return Ok(Some(Control::Restart));
                    }
                    KeyCode::Esc => {
                        handle.reset();
                        return Ok(Some(Control::Quit));
                    }
                    _ => {} // Ignore other keys
                }
            }
            event::Event::Resize(_, _) => {
                renderer.borrow_mut().invalidate();
            }
            _ => {} // Ignore other events
        }
    }
    Ok(None)
}

/// Generate one maze without animation and print it as text, followed by its statistics.
pub fn run_headless<W: Write>(
    out: &mut W,
    config: &Config,
    generator: Generator,
    width: u16,
    height: u16,
    seed: Option<u64>,
) -> Result<GenerationStats, MazeError> {
    let mut driver = Driver::new(&config.without_delay());
    driver.start(generator, width, height, seed)?;
    let stats = match driver.generate(|_, _, _| {}, Speed::MAX)? {
        RunOutcome::Completed(stats) => stats,
        // Nothing else holds the handle, so the run cannot be superseded
        RunOutcome::Superseded { .. } => return Err(MazeError::NoActiveRun),
    };

    if let Some(grid) = driver.grid() {
        // Output errors (e.g. a closed pipe) are not generation errors
        if let Err(e) = write!(out, "{grid}").and_then(|_| writeln!(out, "{stats}")) {
            tracing::warn!(error = %e, "could not write maze output");
        }
    }
    Ok(stats)
}

/// Run a generator repeatedly without rendering or delays, e.g. under a profiler.
pub fn profile(
    config: &Config,
    generator: Generator,
    width: u16,
    height: u16,
    iterations: usize,
) -> Result<Vec<GenerationStats>, MazeError> {
    let mut driver = Driver::new(&config.without_delay());
    let mut all_stats = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        driver.start(generator, width, height, None)?;
        if let RunOutcome::Completed(stats) = driver.generate(|_, _, _| {}, Speed::MAX)? {
            all_stats.push(stats);
        }
    }
    Ok(all_stats)
}

/// Wait for the user to press one of `keys` and return it
/// This function blocks until one of them is pressed
fn wait_for_keypress(keys: &[KeyCode]) -> std::io::Result<KeyCode> {
    loop {
        if let event::Event::Key(event::KeyEvent { code, kind, .. }) = event::read()?
            && kind == event::KeyEventKind::Press
            && keys.contains(&code)
        {
            return Ok(code);
        }
    }
}

/// Get user input with real-time validation and feedback
/// Returns None if user cancels input with Esc
/// Returns Some(T) if user inputs a valid input and presses Enter, where T is the validated type
fn prompt_with_validation<F, T>(
    stdout: &mut Stdout,
    prompt: &str,
    validate: F,
) -> std::io::Result<Option<T>>
where
    F: Fn(&str) -> Result<T, String>,
{
    // Save cursor position so we can restore / redraw
    queue!(stdout, cursor::Hide, cursor::SavePosition)?;
    stdout.flush()?;

    let mut input = String::new();

    let value = loop {
        // Re-render prompt line
        queue!(
            stdout,
            cursor::RestorePosition,
            terminal::Clear(ClearType::FromCursorDown)
        )?;

        stdout.queue(style::PrintStyledContent(
            prompt.with(Color::Cyan).attribute(Attribute::Bold),
        ))?;

        // Decide color based on validity
        let validation_result = validate(input.trim());
        let color = if validation_result.is_ok() {
            Color::Green
        } else {
            Color::Red
        };
        queue!(
            stdout,
            style::SetForegroundColor(color),
            style::Print(&input),
            style::ResetColor,
            style::Print(" \r\n")
        )?;

        // Error message line (if any)
        if let Err(msg) = validation_result {
            stdout.queue(style::PrintStyledContent(
                msg.with(Color::DarkGrey).attribute(Attribute::Dim),
            ))?;
        }

        stdout.flush()?;

        // Wait for key event
        if let event::Event::Key(event::KeyEvent { code, kind, .. }) = event::read()? {
            if kind != event::KeyEventKind::Press {
                continue;
            }
            match code {
                KeyCode::Enter => match validate(input.trim()) {
                    Ok(n) => break Some(n),
                    Err(_) => continue,
                },
                KeyCode::Char(c) if !c.is_whitespace() && !c.is_control() => input.push(c),
                KeyCode::Backspace => {
                    input.pop();
                }
                // User cancelled input
                KeyCode::Esc => break None,
                _ => {}
            }
        }
    };
    // Cleanup
    queue!(
        stdout,
        cursor::RestorePosition,
        terminal::Clear(ClearType::FromCursorDown),
        cursor::Show
    )?;
    stdout.flush()?;

    Ok(value)
}

/// Largest dimension offered by the interactive prompts
const MAX_DIMENSION: u16 = 255;

/// Largest grid dimension that fits `term_size` terminal cells, within
/// [`MIN_DIMENSION`]..=[`MAX_DIMENSION`]. Rounded down to an odd number when `odd` is set.
fn max_grid_size(term_size: u16, cell_size: u16, odd: bool) -> u16 {
    let size = (term_size / cell_size.max(1)).min(MAX_DIMENSION);
    let size = if odd && size % 2 == 0 && size > 0 {
        size - 1
    } else {
        size
    };
    size.max(MIN_DIMENSION)
}

/// Check a typed dimension. An empty input picks `max`.
fn validate_dimension(s: &str, max: u16, odd: bool) -> Result<u16, String> {
    if s.is_empty() {
        return Ok(max);
    }
    let error_msg = if odd {
        format!("Please enter an odd number between {} and {}.", MIN_DIMENSION, max)
    } else {
        format!("Please enter a number between {} and {}.", MIN_DIMENSION, max)
    };
    s.parse::<u16>()
        .ok()
        .filter(|n| (MIN_DIMENSION..=max).contains(n))
        .filter(|n| !odd || n % 2 == 1)
        .ok_or(error_msg)
}

/// Ask user for grid dimensions
/// Returns None if user cancels input with Esc
fn ask_grid_dimensions(
    stdout: &mut Stdout,
    generator: Generator,
) -> std::io::Result<Option<(u16, u16)>> {
    let odd = generator.requires_odd_dimensions();
    stdout.execute(style::PrintStyledContent(
        format!(
            "Enter grid dimensions{}, or press Esc to exit. Leave empty for the largest size \
that fits the current terminal.\r\n",
            if odd { " (odd numbers)" } else { "" }
        )
        .with(Color::Blue),
    ))?;

    let (max_width, max_height) = match terminal::size() {
        Ok((term_width, term_height)) => (
            max_grid_size(term_width, crate::maze::Cell::CELL_WIDTH, odd),
            // Reserve rows for the status lines
            max_grid_size(term_height.saturating_sub(Renderer::NUM_LOG_ROWS), 1, odd),
        ),
        // Fallback to a sane default if terminal size cannot be determined
        Err(_) => DEFAULT_DIMENSIONS,
    };

    let width = match prompt_with_validation(stdout, "Width: ", |s| {
        validate_dimension(s, max_width, odd)
    })? {
        Some(w) => w,
        None => return Ok(None),
    };
    stdout.execute(style::PrintStyledContent(
        format!("Width set to {}\r\n", width)
            .with(Color::Green)
            .attribute(Attribute::Bold),
    ))?;

    let height = match prompt_with_validation(stdout, "Height: ", |s| {
        validate_dimension(s, max_height, odd)
    })? {
        Some(h) => h,
        None => return Ok(None),
    };
    stdout.execute(style::PrintStyledContent(
        format!("Height set to {}\r\n", height)
            .with(Color::Green)
            .attribute(Attribute::Bold),
    ))?;

    Ok(Some((width, height)))
}

/// Present a menu of options to the user and let them select one using arrow keys
/// Returns None if user cancels input with Esc
/// Returns Some(T) if user selects an option and presses Enter, where T is the option type
fn select_from_menu<T: std::fmt::Display + Copy>(
    stdout: &mut Stdout,
    prompt: &str,
    options: &[T],
) -> std::io::Result<Option<T>> {
    if options.is_empty() {
        return Ok(None);
    }

    // Save cursor position so we can restore / redraw
    queue!(stdout, cursor::Hide, cursor::SavePosition)?;

    let mut selected = 0;

    let selected_option = loop {
        // Re-render prompt line
        queue!(
            stdout,
            cursor::RestorePosition,
            terminal::Clear(ClearType::FromCursorDown)
        )?;

        stdout.queue(style::PrintStyledContent(prompt.with(Color::Yellow)))?;

        for (i, option) in options.iter().enumerate() {
            if i == selected {
                stdout.queue(style::SetAttribute(Attribute::Reverse))?;
            }
            stdout.queue(style::Print(format!("\r\n{}", option)))?;
            if i == selected {
                stdout.queue(style::SetAttribute(Attribute::NoReverse))?;
            }
        }
        stdout.queue(style::Print("\r\n"))?;

        stdout.flush()?;

        // Wait for key event
        if let event::Event::Key(event::KeyEvent { code, kind, .. }) = event::read()? {
            if kind != event::KeyEventKind::Press {
                // Only handle key press events
                continue;
            }
            match code {
                KeyCode::Up => {
                    selected = match selected {
                        0 => options.len() - 1,
                        _ => selected - 1,
                    };
                }
                KeyCode::Down => {
                    selected = if selected >= options.len() - 1 {
                        0
                    } else {
                        selected + 1
                    };
                }
                KeyCode::Enter => {
                    break Some(options[selected]);
                }
                KeyCode::Esc => {
                    // User cancelled input
                    break None;
                }
                _ => {}
            }
        }
    };
    // Cleanup
    queue!(
        stdout,
        cursor::RestorePosition,
        terminal::Clear(ClearType::FromCursorDown),
        cursor::Show
    )?;
    stdout.flush()?;

    Ok(selected_option)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_grid_size() {
        assert_eq!(max_grid_size(80, 2, true), 39);
        assert_eq!(max_grid_size(80, 2, false), 40);
        assert_eq!(max_grid_size(24, 1, true), 23);
        assert_eq!(max_grid_size(2, 2, true), MIN_DIMENSION);
        assert_eq!(max_grid_size(600, 2, false), MAX_DIMENSION);
    }

    #[test]
    fn test_validate_dimension() {
        assert_eq!(validate_dimension("", 41, true), Ok(41));
        assert_eq!(validate_dimension("15", 41, true), Ok(15));
        assert!(validate_dimension("16", 41, true).is_err());
        assert_eq!(validate_dimension("16", 41, false), Ok(16));
        assert!(validate_dimension("43", 41, true).is_err());
        assert!(validate_dimension("1", 41, false).is_err());
        assert!(validate_dimension("abc", 41, false).is_err());
    }

    #[test]
    fn test_run_headless_prints_grid_and_stats() {
        let mut out = Vec::new();
        let stats = run_headless(
            &mut out,
            &Config::default(),
            Generator::RecurBacktrack,
            11,
            7,
            Some(42),
        )
        .unwrap();
        assert_eq!(stats.generator, Generator::RecurBacktrack);
        assert_eq!(stats.reachable_cells, stats.open_cells);

        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 7 + 1);
        assert!(lines[..7].iter().all(|line| line.chars().count() == 11));
        assert_eq!(lines[0], "###########");
        assert_eq!(lines[7], stats.to_string());
    }

    #[test]
    fn test_run_headless_rejects_even_grid() {
        let mut out = Vec::new();
        let result = run_headless(
            &mut out,
            &Config::default(),
            Generator::Kruskal,
            10,
            7,
            None,
        );
        assert!(matches!(result, Err(MazeError::EvenDimensions { .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn test_profile() {
        let stats = profile(&Config::default(), Generator::Cellular, 20, 10, 3).unwrap();
        assert_eq!(stats.len(), 3);
        assert!(stats.iter().all(|s| s.step_count == 5 * 10 + 1));
    }
}
