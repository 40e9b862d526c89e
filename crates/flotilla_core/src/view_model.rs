use crate::{Phase, RowStatus};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressView {
    pub phase: Phase,
    pub rows: Vec<RowView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub title: String,
    pub subtitle: String,
    /// Value currently drawn; eases toward `target_percentage`.
    pub percentage: f64,
    pub target_percentage: f64,
    pub status: RowStatus,
    pub text: String,
    pub content: Option<String>,
}
