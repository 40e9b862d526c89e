use crossterm::style::Color;

pub const BAR_WIDTH: usize = 40;
pub const BAR_FILLED: char = '█';
pub const BAR_EMPTY: char = '░';

pub const ROW_INDENT: &str = "  ";
pub const CONTENT_INDENT: &str = "    ";

/// Content lines shown per row in the live display; the rest are summarised.
pub const LIVE_CONTENT_LINES: usize = 6;

pub const GRADIENT_START: (u8, u8, u8) = (0x5A, 0x56, 0xE0);
pub const GRADIENT_END: (u8, u8, u8) = (0xEE, 0x6F, 0xF8);
pub const BAR_EMPTY_COLOR: Color = Color::DarkGrey;

pub const SUCCESS_COLOR: Color = Color::Green;
pub const FAILURE_COLOR: Color = Color::Red;
pub const UNKNOWN_COLOR: Color = Color::Yellow;
