use crate::{RowId, RowStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Worker progress for a row as a fraction of the body received.
    SetPercentage { row: RowId, percentage: f64 },
    /// Worker classified the response (or failure) for a row.
    SetStatus { row: RowId, status: RowStatus },
    /// Short status text shown next to the bar.
    SetText { row: RowId, text: String },
    /// Free-text block rendered under the bar.
    SetContent { row: RowId, content: String },
    /// No further worker updates will arrive.
    Finish,
    /// Fixed-rate render tick.
    Tick,
    /// User pressed Ctrl+C.
    Interrupt,
    /// User pressed Ctrl+Z.
    Suspend,
    /// Process came back from a suspend; the screen needs a full repaint.
    Resumed,
}
