use ratatui::style::Color;

// Keep the palette small; add roles here rather than inline colors.
pub const FG: Color = Color::Rgb(229, 231, 235);
pub const MUTED: Color = Color::Rgb(156, 163, 175);
pub const DIM: Color = Color::Rgb(107, 114, 128);
pub const BAR_BG: Color = Color::Rgb(14, 18, 24);

pub const ACCENT: Color = Color::Rgb(255, 159, 26);

pub const SUCCESS: Color = Color::Rgb(134, 239, 172); // outcomes, live-session dot
pub const ERROR: Color = Color::Rgb(248, 113, 113);
pub const INFO: Color = Color::Rgb(147, 197, 253);
