use crossterm::style::Color;
use gramgrid_core::SumStatus;

/// Color theme for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    /// Background color
    pub bg: Color,
    /// Default text color
    pub fg: Color,
    /// Grid border color
    pub border: Color,
    /// Player-entered letter color
    pub filled: Color,
    /// Empty cell placeholder
    pub placeholder: Color,
    /// Selected cell background
    pub selected_bg: Color,
    /// Sum with no letters yet
    pub pending: Color,
    /// Sum equal to its target, valid corner
    pub matched: Color,
    /// Sum off target, invalid corner
    pub mismatched: Color,
    /// Word chip background
    pub chip_bg: Color,
    /// Timer/info text color
    pub info: Color,
    /// Key binding text color
    pub key: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb { r: 20, g: 22, b: 30 },
            fg: Color::Rgb { r: 230, g: 230, b: 240 },
            border: Color::Rgb { r: 110, g: 118, b: 145 },
            filled: Color::Rgb { r: 80, g: 180, b: 255 },
            placeholder: Color::Rgb { r: 70, g: 75, b: 90 },
            selected_bg: Color::Rgb { r: 70, g: 90, b: 140 },
            pending: Color::Rgb { r: 140, g: 150, b: 180 },
            matched: Color::Rgb { r: 90, g: 255, b: 130 },
            mismatched: Color::Rgb { r: 255, g: 90, b: 90 },
            chip_bg: Color::Rgb { r: 35, g: 40, b: 55 },
            info: Color::Rgb { r: 160, g: 165, b: 185 },
            key: Color::Rgb { r: 255, g: 210, b: 100 },
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color::Rgb { r: 248, g: 248, b: 252 },
            fg: Color::Rgb { r: 30, g: 30, b: 40 },
            border: Color::Rgb { r: 120, g: 120, b: 140 },
            filled: Color::Rgb { r: 30, g: 100, b: 200 },
            placeholder: Color::Rgb { r: 190, g: 190, b: 205 },
            selected_bg: Color::Rgb { r: 180, g: 200, b: 255 },
            pending: Color::Rgb { r: 130, g: 130, b: 150 },
            matched: Color::Rgb { r: 40, g: 160, b: 60 },
            mismatched: Color::Rgb { r: 220, g: 50, b: 50 },
            chip_bg: Color::Rgb { r: 230, g: 232, b: 242 },
            info: Color::Rgb { r: 90, g: 90, b: 110 },
            key: Color::Rgb { r: 200, g: 120, b: 20 },
        }
    }

    /// Color for a row or column total
    pub fn sum_color(&self, status: SumStatus) -> Color {
        match status {
            SumStatus::Pending => self.pending,
            SumStatus::Matched => self.matched,
            SumStatus::Mismatched => self.mismatched,
        }
    }

    /// Color for a corner marker
    pub fn corner_color(&self, valid: bool) -> Color {
        if valid {
            self.matched
        } else {
            self.pending
        }
    }

    /// The other built-in theme
    pub fn toggled(&self) -> Self {
        if self.bg == Self::dark().bg {
            Self::light()
        } else {
            Self::dark()
        }
    }
}
