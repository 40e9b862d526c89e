pub(crate) mod constants;
pub(crate) mod layout;
pub(crate) mod render;

pub(crate) use render::{PlainRenderer, TerminalRenderer};
