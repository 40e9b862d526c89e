//! Flotilla core: pure progress state machine and view-model helpers.
mod animation;
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use animation::{BarAnimation, Spring, DEFAULT_SPRING_FREQUENCY};
pub use effect::Effect;
pub use msg::Msg;
pub use state::{clamp_percentage, Phase, ProgressState, RowId, RowStatus, DEFAULT_REFRESH_INTERVAL};
pub use update::update;
pub use view_model::{ProgressView, RowView};
