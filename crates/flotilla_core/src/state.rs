use std::time::Duration;

use crate::animation::{BarAnimation, Spring, DEFAULT_SPRING_FREQUENCY};
use crate::view_model::{ProgressView, RowView};

/// Index of a row in creation order.
pub type RowId = usize;

/// Refresh cadence used when the caller does not configure one.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowStatus {
    #[default]
    Unknown,
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Running,
    /// `Finish` received; waiting for the next tick to check the bars.
    Completed,
    /// `Finish` received but at least one bar is still easing.
    Draining,
    /// Terminal: nothing more is rendered.
    Exited,
}

/// Clamps a progress fraction to `[0, 1]`; NaN counts as no progress.
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Row {
    title: String,
    subtitle: String,
    bar: BarAnimation,
    status: RowStatus,
    text: String,
    content: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    rows: Vec<Row>,
    spring: Spring,
    phase: Phase,
    completed: bool,
    quitting: bool,
    dirty: bool,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}

impl ProgressState {
    /// Creates an empty state whose bars ease in steps of `refresh_interval`.
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            rows: Vec::new(),
            spring: Spring::new(refresh_interval, DEFAULT_SPRING_FREQUENCY),
            phase: Phase::Running,
            completed: false,
            quitting: false,
            dirty: true,
        }
    }

    /// Appends a row and returns its id. Ids follow creation order.
    pub fn add_row(&mut self, title: impl Into<String>, subtitle: impl Into<String>) -> RowId {
        self.rows.push(Row {
            title: title.into(),
            subtitle: subtitle.into(),
            bar: BarAnimation::default(),
            status: RowStatus::Unknown,
            text: String::new(),
            content: None,
        });
        self.dirty = true;
        self.rows.len() - 1
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_animating(&self) -> bool {
        self.rows.iter().any(|row| row.bar.is_animating())
    }

    pub fn view(&self) -> ProgressView {
        ProgressView {
            phase: self.phase,
            rows: self
                .rows
                .iter()
                .map(|row| RowView {
                    title: row.title.clone(),
                    subtitle: row.subtitle.clone(),
                    percentage: row.bar.shown(),
                    target_percentage: row.bar.target(),
                    status: row.status,
                    text: row.text.clone(),
                    content: row.content.clone(),
                })
                .collect(),
        }
    }

    pub(crate) fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns false when `row` does not exist.
    pub(crate) fn set_percentage(&mut self, row: RowId, percentage: f64) -> bool {
        let completed = self.completed;
        let Some(row) = self.rows.get_mut(row) else {
            return false;
        };
        let percentage = clamp_percentage(percentage);
        // Late updates may only push a bar forward.
        if completed && percentage < row.bar.target() {
            return true;
        }
        row.bar.set_target(percentage);
        true
    }

    pub(crate) fn set_status(&mut self, row: RowId, status: RowStatus) -> bool {
        self.with_row(row, |row| row.status = status)
    }

    pub(crate) fn set_text(&mut self, row: RowId, text: String) -> bool {
        self.with_row(row, |row| row.text = text)
    }

    pub(crate) fn set_content(&mut self, row: RowId, content: String) -> bool {
        self.with_row(row, |row| {
            row.content = if content.is_empty() {
                None
            } else {
                Some(content)
            }
        })
    }

    /// Steps every bar once. Returns whether any bar is still moving.
    pub(crate) fn advance_animations(&mut self) -> bool {
        let spring = self.spring;
        let mut animating = false;
        for row in &mut self.rows {
            animating |= row.bar.advance(&spring);
        }
        animating
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
        if self.phase == Phase::Running {
            self.phase = Phase::Completed;
        }
    }

    pub(crate) fn mark_draining(&mut self) {
        self.phase = Phase::Draining;
    }

    pub(crate) fn exit(&mut self) {
        self.phase = Phase::Exited;
    }

    pub(crate) fn begin_quit(&mut self) {
        self.quitting = true;
        self.phase = Phase::Exited;
    }

    fn with_row(&mut self, row: RowId, apply: impl FnOnce(&mut Row)) -> bool {
        match self.rows.get_mut(row) {
            Some(row) => {
                apply(row);
                self.dirty = true;
                true
            }
            None => false,
        }
    }
}
