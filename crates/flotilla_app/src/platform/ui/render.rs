use std::io::Write;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{cursor, queue};
use flotilla_engine::{ProgressView, RenderError, Renderer, RowStatus, UserInput};
use flotilla_logging::flotilla_warn;

use super::constants::{
    BAR_EMPTY_COLOR, FAILURE_COLOR, LIVE_CONTENT_LINES, SUCCESS_COLOR, UNKNOWN_COLOR,
};
use super::layout::{gradient, layout, plain_text, Line, Paint};

/// Redraws the rows in place below the cursor, in raw mode so keys can be read.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    drawn_lines: u16,
    raw: bool,
    last: Option<ProgressView>,
    interrupted: bool,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            drawn_lines: 0,
            raw: false,
            last: None,
            interrupted: false,
        }
    }

    fn rewind(&mut self) -> Result<(), RenderError> {
        if self.drawn_lines > 0 {
            queue!(self.out, cursor::MoveToPreviousLine(self.drawn_lines))?;
        } else {
            queue!(self.out, cursor::MoveToColumn(0))?;
        }
        queue!(self.out, Clear(ClearType::FromCursorDown))?;
        Ok(())
    }

    /// Replaces the live region with every row and all of its content, so
    /// nothing below the fold is lost once the display is gone.
    fn print_final(&mut self, view: &ProgressView) -> Result<(), RenderError> {
        let (columns, _) = terminal::size().unwrap_or((80, 24));
        self.rewind()?;
        for line in layout(view, None) {
            self.paint_line(&line, columns as usize)?;
        }
        self.out.flush()?;
        self.drawn_lines = 0;
        Ok(())
    }

    fn enter(&mut self) -> Result<(), RenderError> {
        // Without raw mode the display still works; only key handling is lost.
        match terminal::enable_raw_mode() {
            Ok(()) => self.raw = true,
            Err(err) => flotilla_warn!("raw mode unavailable, keys will not be read: {}", err),
        }
        queue!(self.out, cursor::Hide)?;
        self.out.flush()?;
        Ok(())
    }

    fn leave(&mut self) -> Result<(), RenderError> {
        queue!(self.out, ResetColor, cursor::Show)?;
        self.out.flush()?;
        if self.raw {
            self.raw = false;
            terminal::disable_raw_mode()?;
        }
        Ok(())
    }

    fn paint_line(&mut self, line: &Line, width: usize) -> Result<(), RenderError> {
        let mut remaining = width;
        for span in line {
            if remaining == 0 {
                break;
            }
            let text: String = span.text.chars().take(remaining).collect();
            remaining -= text.chars().count();

            match span.paint {
                Paint::Title => queue!(self.out, SetAttribute(Attribute::Bold))?,
                Paint::Subtitle | Paint::Content => {
                    queue!(self.out, SetAttribute(Attribute::Dim))?
                }
                Paint::Filled { position } => {
                    let (r, g, b) = gradient(position);
                    queue!(self.out, SetForegroundColor(Color::Rgb { r, g, b }))?
                }
                Paint::Empty => queue!(self.out, SetForegroundColor(BAR_EMPTY_COLOR))?,
                Paint::Status(status) => {
                    queue!(self.out, SetForegroundColor(status_color(status)))?
                }
                Paint::Plain => {}
            }
            queue!(
                self.out,
                Print(text),
                SetAttribute(Attribute::Reset),
                ResetColor
            )?;
        }
        queue!(self.out, Print("\r\n"))?;
        Ok(())
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn start(&mut self) -> Result<(), RenderError> {
        self.enter()
    }

    fn draw(&mut self, view: &ProgressView) -> Result<(), RenderError> {
        let (columns, rows) = terminal::size().unwrap_or((80, 24));
        let lines = layout(view, Some(LIVE_CONTENT_LINES));
        let lines = &lines[..lines.len().min(rows.saturating_sub(1) as usize)];

        self.rewind()?;
        for line in lines {
            self.paint_line(line, columns as usize)?;
        }
        self.out.flush()?;
        self.drawn_lines = lines.len() as u16;
        self.last = Some(view.clone());
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), RenderError> {
        self.leave()?;
        stop_process();
        self.drawn_lines = 0;
        self.enter()
    }

    fn poll_input(&mut self) -> Option<UserInput> {
        while event::poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            if key.kind != KeyEventKind::Press || !key.modifiers.contains(KeyModifiers::CONTROL) {
                continue;
            }
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('C') => {
                    self.interrupted = true;
                    return Some(UserInput::Interrupt);
                }
                KeyCode::Char('z') | KeyCode::Char('Z') => return Some(UserInput::Suspend),
                _ => {}
            }
        }
        None
    }

    fn stop(&mut self) -> Result<(), RenderError> {
        if let Some(view) = self.last.take() {
            if !self.interrupted {
                self.print_final(&view)?;
            }
        }
        self.leave()
    }
}

impl<W: Write + Send> Drop for TerminalRenderer<W> {
    fn drop(&mut self) {
        if self.raw {
            let _ = self.leave();
        }
    }
}

fn status_color(status: RowStatus) -> Color {
    match status {
        RowStatus::Success => SUCCESS_COLOR,
        RowStatus::Failure => FAILURE_COLOR,
        RowStatus::Unknown => UNKNOWN_COLOR,
    }
}

#[cfg(unix)]
fn stop_process() {
    // SAFETY: raise has no memory-safety preconditions; it returns once SIGCONT arrives.
    unsafe {
        libc::raise(libc::SIGTSTP);
    }
}

#[cfg(not(unix))]
fn stop_process() {}

/// For output that is not a terminal: prints the final frame once, without styling.
pub struct PlainRenderer<W: Write + Send> {
    out: W,
    last: Option<ProgressView>,
}

impl<W: Write + Send> PlainRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }
}

impl<W: Write + Send> Renderer for PlainRenderer<W> {
    fn draw(&mut self, view: &ProgressView) -> Result<(), RenderError> {
        self.last = Some(view.clone());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RenderError> {
        if let Some(view) = self.last.take() {
            for line in layout(&view, None) {
                writeln!(self.out, "{}", plain_text(&line).trim_end())?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}
