use std::io::{Stdout, Write};

use crossterm::{
    QueueableCommand, cursor, queue,
    style::{self, Attribute, Color, Stylize},
    terminal::{self, ClearType},
};
use unicode_truncate::UnicodeTruncateStr;

use crate::{
    config::Speed,
    driver::{GenerationEvent, RunId},
    generators::Generator,
    maze::{Cell, Grid},
};

/// Draws a generation run on the terminal, one character pair per cell.
///
/// Only cells that changed since the last frame are redrawn. If the terminal is too small for
/// the grid, the renderer goes quiet until the next run instead of drawing garbage; the
/// generation itself is not affected.
pub struct Renderer {
    /// Standard output handle to write to the terminal
    stdout: Stdout,
    /// Cells as they are currently on screen
    frame: Vec<Cell>,
    /// Current grid dimensions (width, height)
    grid_dims: Option<(u16, u16)>,
    generator: Option<Generator>,
    run: Option<RunId>,
    /// Nothing is drawn while set
    inert: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Rows below the grid used for the status and prompt lines
    pub const NUM_LOG_ROWS: u16 = 2;

    pub fn new() -> Self {
        Self {
            stdout: std::io::stdout(),
            frame: Vec::new(),
            grid_dims: None,
            generator: None,
            run: None,
            inert: false,
        }
    }

    /// Stop drawing until the next run starts.
    pub fn disable(&mut self) {
        self.inert = true;
    }

    /// Forget what is on screen, so the next frame redraws every cell.
    pub fn invalidate(&mut self) {
        self.frame.clear();
    }

    pub fn handle_event(
        &mut self,
        event: &GenerationEvent<'_>,
        speed: Speed,
    ) -> std::io::Result<()> {
        match *event {
            GenerationEvent::Started {
                run,
                generator,
                grid,
            } => {
                self.run = Some(run);
                self.generator = Some(generator);
                self.grid_dims = Some((grid.width(), grid.height()));
                self.inert = false;
                self.frame.clear();
                queue!(self.stdout, terminal::Clear(ClearType::All))?;
                if !self.check_size(grid.width(), grid.height())? {
                    return Ok(());
                }
                self.draw_grid(grid)?;
                self.status(&format!("{generator} | run {run} | starting | speed {speed}"))?;
            }
            GenerationEvent::Progress {
                run,
                percentage,
                record,
                grid,
            } => {
                if self.inert || self.run != Some(run) {
                    return Ok(());
                }
                self.draw_grid(grid)?;
                let generator = self.generator.map(|g| g.to_string()).unwrap_or_default();
                self.status(&format!(
                    "{generator} | run {run} | step {} | {percentage:.0}% | pending {} | speed {speed}",
                    record.step_count, record.stack_size
                ))?;
            }
            GenerationEvent::Completed { run, stats, grid } => {
                if self.inert || self.run != Some(run) {
                    return Ok(());
                }
                self.draw_grid(grid)?;
                self.status(&stats.to_string())?;
            }
            GenerationEvent::Reset { run } => {
                if self.inert || self.run != Some(run) {
                    return Ok(());
                }
                self.status(&format!("run {run} reset"))?;
            }
        }
        self.stdout.flush()
    }

    /// Print a message on the line below the status line.
    pub fn prompt(&mut self, msg: &str) -> std::io::Result<()> {
        let row = self.grid_dims.map_or(0, |(_, height)| height) + 1;
        let (term_width, _) = terminal::size()?;
        let (msg, _) = msg.unicode_truncate(term_width as usize);
        queue!(
            self.stdout,
            cursor::MoveTo(0, row),
            terminal::Clear(ClearType::CurrentLine),
            style::PrintStyledContent(msg.with(Color::Blue).attribute(Attribute::Bold)),
        )?;
        self.stdout.flush()
    }

    /// Check if terminal size is sufficient for the given grid dimensions.
    /// If not, display a message and stop drawing until the next run.
    fn check_size(&mut self, width: u16, height: u16) -> std::io::Result<bool> {
        let (term_width, term_height) = terminal::size()?;
        let needed_width = width.saturating_mul(Cell::CELL_WIDTH);
        let needed_height = height.saturating_add(Renderer::NUM_LOG_ROWS);
        if term_width < needed_width || term_height < needed_height {
            tracing::warn!(
                term_width,
                term_height,
                width,
                height,
                "terminal too small to draw the grid"
            );
            let msg = format!(
                "Terminal size is too small ({}x{}) for the grid dimensions ({}x{}) to display. \
The maze is still being generated. Press Esc to exit.\r\n",
                term_width, term_height, width, height
            );
            queue!(
                self.stdout,
                cursor::MoveTo(0, 0),
                style::PrintStyledContent(msg.with(Color::Yellow).attribute(Attribute::Bold)),
            )?;
            self.stdout.flush()?;
            self.inert = true;
            return Ok(false);
        }
        Ok(true)
    }

    /// Draw every cell that differs from the last frame.
    fn draw_grid(&mut self, grid: &Grid) -> std::io::Result<()> {
        let width = grid.width() as usize;
        let full_redraw = self.frame.len() != grid.cells().len();
        for (idx, cell) in grid.cells().iter().enumerate() {
            if !full_redraw && self.frame[idx] == *cell {
                continue;
            }
            let (x, y) = ((idx % width) as u16, (idx / width) as u16);
            queue!(
                self.stdout,
                cursor::MoveTo(x * Cell::CELL_WIDTH, y),
                style::Print(cell)
            )?;
        }
        self.frame.clear();
        self.frame.extend_from_slice(grid.cells());
        Ok(())
    }

    /// Replace the status line below the grid, cut to the terminal width.
    fn status(&mut self, msg: &str) -> std::io::Result<()> {
        let row = self.grid_dims.map_or(0, |(_, height)| height);
        let (term_width, _) = terminal::size()?;
        let (msg, _) = msg.unicode_truncate(term_width as usize);
        self.stdout.queue(cursor::MoveTo(0, row))?;
        queue!(
            self.stdout,
            terminal::Clear(ClearType::CurrentLine),
            style::PrintStyledContent(msg.with(Color::Cyan)),
        )?;
        Ok(())
    }
}
