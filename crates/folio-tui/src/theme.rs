//! Dark/light palettes.
//!
//! The active palette is selected per frame from the navigation state's
//! dark-mode flag; theme changes are just state changes.

use ratatui::style::Color;

/// Resolved colors for one theme.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub fg: Color,
    pub dim: Color,
    pub accent: Color,
    pub border: Color,
    pub selection_fg: Color,
    pub selection_bg: Color,
    pub failure: Color,
    pub skeleton: Color,
    pub code: Color,
}

const DARK: Palette = Palette {
    fg: Color::Gray,
    dim: Color::DarkGray,
    accent: Color::Cyan,
    border: Color::DarkGray,
    selection_fg: Color::Black,
    selection_bg: Color::Cyan,
    failure: Color::Red,
    skeleton: Color::DarkGray,
    code: Color::Green,
};

const LIGHT: Palette = Palette {
    fg: Color::Black,
    dim: Color::Gray,
    accent: Color::Blue,
    border: Color::Gray,
    selection_fg: Color::White,
    selection_bg: Color::Blue,
    failure: Color::LightRed,
    skeleton: Color::Gray,
    code: Color::Green,
};

/// Palette for the given dark-mode flag.
pub fn palette(dark: bool) -> Palette {
    if dark { DARK } else { LIGHT }
}
