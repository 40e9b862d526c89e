use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use flotilla_core::{
    clamp_percentage, update, Effect, Msg, ProgressState, ProgressView, RowId, RowStatus,
};
use flotilla_logging::{flotilla_error, flotilla_info, flotilla_warn};
use tokio_util::sync::CancellationToken;

use crate::RenderError;

/// Requests coming from the person at the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInput {
    Interrupt,
    Suspend,
}

/// Draws frames. Only ever called from the display thread.
pub trait Renderer: Send {
    fn start(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn draw(&mut self, view: &ProgressView) -> Result<(), RenderError>;

    /// Hand the terminal back and suspend; returns once the process is resumed.
    fn suspend(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Non-blocking check for pending user input.
    fn poll_input(&mut self) -> Option<UserInput> {
        None
    }

    fn stop(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Fire-and-forget updates for one row, usable from any thread.
///
/// Sends after the display has exited are silently dropped.
#[derive(Debug, Clone)]
pub struct RowHandle {
    row: RowId,
    tx: mpsc::Sender<Msg>,
}

impl RowHandle {
    pub fn id(&self) -> RowId {
        self.row
    }

    pub fn set_percentage(&self, percentage: f64) {
        self.send(Msg::SetPercentage {
            row: self.row,
            percentage: clamp_percentage(percentage),
        });
    }

    pub fn set_status(&self, status: RowStatus) {
        self.send(Msg::SetStatus {
            row: self.row,
            status,
        });
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.send(Msg::SetText {
            row: self.row,
            text: text.into(),
        });
    }

    pub fn set_content(&self, content: impl Into<String>) {
        self.send(Msg::SetContent {
            row: self.row,
            content: content.into(),
        });
    }

    fn send(&self, msg: Msg) {
        let _ = self.tx.send(msg);
    }
}

/// Display under construction: rows are added here, before anything runs.
pub struct ProgressEngine {
    state: ProgressState,
    refresh_interval: Duration,
    tx: mpsc::Sender<Msg>,
    rx: mpsc::Receiver<Msg>,
}

impl ProgressEngine {
    pub fn new(refresh_interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state: ProgressState::new(refresh_interval),
            refresh_interval,
            tx,
            rx,
        }
    }

    pub fn add_row(&mut self, title: impl Into<String>, subtitle: impl Into<String>) -> RowHandle {
        let row = self.state.add_row(title, subtitle);
        RowHandle {
            row,
            tx: self.tx.clone(),
        }
    }

    /// Starts the renderer and moves the state onto the display thread.
    ///
    /// A renderer that cannot start is reported here, before any work begins.
    pub fn run(self, mut renderer: Box<dyn Renderer>) -> Result<RunningDisplay, RenderError> {
        renderer.start()?;

        let interrupted = CancellationToken::new();
        let mut display = DisplayLoop {
            state: self.state,
            renderer,
            error: None,
            interrupted: interrupted.clone(),
        };
        let rx = self.rx;
        let refresh_interval = self.refresh_interval;
        let thread = thread::Builder::new()
            .name("flotilla-display".to_string())
            .spawn(move || display.run(rx, refresh_interval))
            .map_err(|err| RenderError::Start(err.to_string()))?;

        Ok(RunningDisplay {
            tx: self.tx,
            interrupted,
            thread,
        })
    }
}

/// How the display loop ended.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayReport {
    pub interrupted: bool,
    /// First render failure, if any; drawing stopped after it.
    pub error: Option<RenderError>,
    pub final_view: ProgressView,
}

pub struct RunningDisplay {
    tx: mpsc::Sender<Msg>,
    interrupted: CancellationToken,
    thread: thread::JoinHandle<DisplayReport>,
}

impl RunningDisplay {
    /// Cancelled when the user interrupts the display.
    pub fn interrupted(&self) -> CancellationToken {
        self.interrupted.clone()
    }

    /// No further updates will arrive; the loop exits once every bar settles.
    pub fn finish(&self) {
        let _ = self.tx.send(Msg::Finish);
    }

    pub fn wait_blocking(self) -> DisplayReport {
        let RunningDisplay { tx, thread, .. } = self;
        drop(tx);
        thread.join().unwrap_or_else(|_| DisplayReport {
            interrupted: false,
            error: Some(RenderError::Panicked),
            final_view: ProgressView::default(),
        })
    }

    pub async fn wait(self) -> DisplayReport {
        match tokio::task::spawn_blocking(move || self.wait_blocking()).await {
            Ok(report) => report,
            Err(_) => DisplayReport {
                interrupted: false,
                error: Some(RenderError::Panicked),
                final_view: ProgressView::default(),
            },
        }
    }
}

struct DisplayLoop {
    state: ProgressState,
    renderer: Box<dyn Renderer>,
    error: Option<RenderError>,
    interrupted: CancellationToken,
}

impl DisplayLoop {
    fn run(&mut self, rx: mpsc::Receiver<Msg>, refresh_interval: Duration) -> DisplayReport {
        let mut next_tick = Instant::now();
        let mut senders_gone = false;

        loop {
            if let Some(input) = self.renderer.poll_input() {
                let msg = match input {
                    UserInput::Interrupt => Msg::Interrupt,
                    UserInput::Suspend => Msg::Suspend,
                };
                if let Some(report) = self.dispatch_msg(msg) {
                    return report;
                }
            }

            let now = Instant::now();
            let msg = if now >= next_tick {
                next_tick = now + refresh_interval;
                Msg::Tick
            } else if senders_gone {
                thread::sleep(next_tick - now);
                continue;
            } else {
                match rx.recv_timeout(next_tick - now) {
                    Ok(msg) => msg,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => {
                        senders_gone = true;
                        Msg::Finish
                    }
                }
            };

            if let Some(report) = self.dispatch_msg(msg) {
                return report;
            }
        }
    }

    /// Applies one message; returns the report once the loop must stop.
    fn dispatch_msg(&mut self, msg: Msg) -> Option<DisplayReport> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;

        for effect in effects {
            match effect {
                Effect::Render => self.draw(),
                Effect::Suspend => {
                    if let Err(err) = self.renderer.suspend() {
                        self.record(err);
                    }
                    let state = std::mem::take(&mut self.state);
                    self.state = update(state, Msg::Resumed).0;
                }
                Effect::Quit => {
                    self.draw();
                    self.stop();
                    flotilla_info!("display finished with {} row(s)", self.state.row_count());
                    return Some(self.report(false));
                }
                Effect::Interrupt => {
                    self.interrupted.cancel();
                    self.stop();
                    flotilla_warn!("display interrupted by user");
                    return Some(self.report(true));
                }
            }
        }
        None
    }

    fn draw(&mut self) {
        if self.error.is_some() || self.state.is_quitting() {
            return;
        }
        let view = self.state.view();
        if let Err(err) = self.renderer.draw(&view) {
            self.record(err);
        }
    }

    fn stop(&mut self) {
        if let Err(err) = self.renderer.stop() {
            self.record(err);
        }
    }

    fn record(&mut self, err: RenderError) {
        flotilla_error!("display error: {}", err);
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn report(&self, interrupted: bool) -> DisplayReport {
        DisplayReport {
            interrupted,
            error: self.error.clone(),
            final_view: self.state.view(),
        }
    }
}
