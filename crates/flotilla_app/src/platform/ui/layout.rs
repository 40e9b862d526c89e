use flotilla_engine::{ProgressView, RowStatus, RowView};

use super::constants::{
    BAR_EMPTY, BAR_FILLED, BAR_WIDTH, CONTENT_INDENT, GRADIENT_END, GRADIENT_START, ROW_INDENT,
};

/// How a span should be painted. Plain output ignores it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Title,
    Subtitle,
    /// Filled bar cell at `position` (0..=1) along the gradient.
    Filled { position: f64 },
    Empty,
    Status(RowStatus),
    Content,
    Plain,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub paint: Paint,
}

impl Span {
    fn new(text: impl Into<String>, paint: Paint) -> Self {
        Self {
            text: text.into(),
            paint,
        }
    }
}

pub type Line = Vec<Span>;

/// Lays out every row in creation order.
///
/// `content_limit` caps the content lines kept per row; `None` keeps all.
pub fn layout(view: &ProgressView, content_limit: Option<usize>) -> Vec<Line> {
    view.rows
        .iter()
        .flat_map(|row| layout_row(row, content_limit))
        .collect()
}

fn layout_row(row: &RowView, content_limit: Option<usize>) -> Vec<Line> {
    let mut header = vec![Span::new(row.title.clone(), Paint::Title)];
    if !row.subtitle.is_empty() {
        header.push(Span::new(" ", Paint::Plain));
        header.push(Span::new(row.subtitle.clone(), Paint::Subtitle));
    }

    let mut progress = vec![Span::new(ROW_INDENT, Paint::Plain)];
    progress.extend(bar(row.percentage));
    progress.push(Span::new(
        format!(" {:>3}%", percent_label(row.percentage)),
        Paint::Plain,
    ));
    if !row.text.is_empty() {
        progress.push(Span::new("  ", Paint::Plain));
        progress.push(Span::new(row.text.clone(), Paint::Status(row.status)));
    }

    let mut lines = vec![header, progress];
    if let Some(content) = &row.content {
        lines.extend(content_lines(content, content_limit));
    }
    lines
}

fn bar(percentage: f64) -> Vec<Span> {
    let filled = filled_cells(percentage, BAR_WIDTH);
    let mut spans: Vec<Span> = (0..filled)
        .map(|cell| {
            let position = if BAR_WIDTH > 1 {
                cell as f64 / (BAR_WIDTH - 1) as f64
            } else {
                0.0
            };
            Span::new(BAR_FILLED, Paint::Filled { position })
        })
        .collect();
    if filled < BAR_WIDTH {
        spans.push(Span::new(
            BAR_EMPTY.to_string().repeat(BAR_WIDTH - filled),
            Paint::Empty,
        ));
    }
    spans
}

fn content_lines(content: &str, limit: Option<usize>) -> Vec<Line> {
    let all: Vec<&str> = content.lines().collect();
    let keep = limit.unwrap_or(all.len()).min(all.len());

    let mut lines: Vec<Line> = all[..keep]
        .iter()
        .map(|line| {
            vec![
                Span::new(CONTENT_INDENT, Paint::Plain),
                Span::new(*line, Paint::Content),
            ]
        })
        .collect();
    let hidden = all.len() - keep;
    if hidden > 0 {
        lines.push(vec![
            Span::new(CONTENT_INDENT, Paint::Plain),
            Span::new(format!("… {hidden} more line(s)"), Paint::Subtitle),
        ]);
    }
    lines
}

pub fn filled_cells(percentage: f64, width: usize) -> usize {
    let clamped = if percentage.is_nan() {
        0.0
    } else {
        percentage.clamp(0.0, 1.0)
    };
    ((clamped * width as f64).round() as usize).min(width)
}

pub fn percent_label(percentage: f64) -> u32 {
    filled_cells(percentage, 100) as u32
}

/// Linear blend between the gradient endpoints.
pub fn gradient(position: f64) -> (u8, u8, u8) {
    let t = position.clamp(0.0, 1.0);
    let mix = |from: u8, to: u8| (from as f64 + (to as f64 - from as f64) * t).round() as u8;
    (
        mix(GRADIENT_START.0, GRADIENT_END.0),
        mix(GRADIENT_START.1, GRADIENT_END.1),
        mix(GRADIENT_START.2, GRADIENT_END.2),
    )
}

/// Unstyled text of one line.
pub fn plain_text(line: &Line) -> String {
    line.iter().map(|span| span.text.as_str()).collect()
}
