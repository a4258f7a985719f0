use banter_core::Preferences;
use ratatui::style::Color;

/// Colour palette for one rendering mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub surface: Color,
    pub border: Color,
    pub border_focus: Color,
    pub text: Color,
    pub text_dim: Color,
    pub user: Color,
    pub assistant: Color,
    pub system: Color,
    pub thought: Color,
    pub accent: Color,
    pub error: Color,
}

/// Target the eye-comfort blend pulls every colour toward.
const WARM_TINT: (u8, u8, u8) = (255, 179, 102);
/// Blend factor at full intensity. Kept well below 1.0 so text stays legible.
const WARM_CEILING: f32 = 0.35;

impl Theme {
    pub fn dark() -> Self {
        Self {
            background: Color::Rgb(17, 18, 24),
            surface: Color::Rgb(29, 31, 40),
            border: Color::Rgb(58, 61, 76),
            border_focus: Color::Rgb(122, 162, 247),
            text: Color::Rgb(218, 220, 228),
            text_dim: Color::Rgb(125, 128, 145),
            user: Color::Rgb(122, 162, 247),
            assistant: Color::Rgb(152, 195, 121),
            system: Color::Rgb(229, 192, 123),
            thought: Color::Rgb(140, 142, 160),
            accent: Color::Rgb(198, 120, 221),
            error: Color::Rgb(224, 108, 117),
        }
    }

    pub fn light() -> Self {
        Self {
            background: Color::Rgb(246, 246, 244),
            surface: Color::Rgb(233, 233, 229),
            border: Color::Rgb(196, 196, 190),
            border_focus: Color::Rgb(46, 89, 168),
            text: Color::Rgb(40, 42, 48),
            text_dim: Color::Rgb(130, 132, 140),
            user: Color::Rgb(46, 89, 168),
            assistant: Color::Rgb(62, 123, 57),
            system: Color::Rgb(150, 108, 30),
            thought: Color::Rgb(110, 112, 125),
            accent: Color::Rgb(125, 62, 160),
            error: Color::Rgb(178, 52, 62),
        }
    }

    /// The palette configured by `preferences`: mode selection plus the
    /// eye-comfort blend.
    pub fn from_preferences(preferences: &Preferences) -> Self {
        let base = if preferences.dark_mode {
            Self::dark()
        } else {
            Self::light()
        };
        if preferences.eye_comfort {
            base.warmed(preferences.eye_comfort_intensity)
        } else {
            base
        }
    }

    /// Pull every colour toward [`WARM_TINT`], scaled by `intensity` in 0..=1.
    fn warmed(self, intensity: f32) -> Self {
        let t = intensity.clamp(0.0, 1.0) * WARM_CEILING;
        Self {
            background: warm(self.background, t),
            surface: warm(self.surface, t),
            border: warm(self.border, t),
            border_focus: warm(self.border_focus, t),
            text: warm(self.text, t),
            text_dim: warm(self.text_dim, t),
            user: warm(self.user, t),
            assistant: warm(self.assistant, t),
            system: warm(self.system, t),
            thought: warm(self.thought, t),
            accent: warm(self.accent, t),
            error: warm(self.error, t),
        }
    }
}

/// Extra blank lines between transcript turns. The terminal cannot scale
/// glyphs, so larger configured font sizes map to looser spacing instead.
pub fn turn_spacing(font_size: f32) -> u16 {
    if font_size >= 18.0 { 2 } else { 1 }
}

fn warm(color: Color, t: f32) -> Color {
    let Color::Rgb(r, g, b) = color else {
        return color;
    };
    let mix = |from: u8, to: u8| (from as f32 + (to as f32 - from as f32) * t).round() as u8;
    Color::Rgb(
        mix(r, WARM_TINT.0),
        mix(g, WARM_TINT.1),
        mix(b, WARM_TINT.2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_intensity_leaves_palette_unchanged() {
        assert_eq!(Theme::dark().warmed(0.0), Theme::dark());
    }

    #[test]
    fn test_warming_moves_channels_toward_tint() {
        let warmed = Theme::dark().warmed(1.0);
        let Color::Rgb(r, g, b) = warmed.background else {
            panic!("background must stay rgb");
        };
        let Color::Rgb(r0, g0, b0) = Theme::dark().background else {
            panic!("background must stay rgb");
        };
        assert!(r > r0);
        assert!(g > g0);
        assert!(b > b0); // tint blue is above the dark background blue
        assert!(b < 102); // but never reaches the tint itself
    }

    #[test]
    fn test_intensity_is_clamped() {
        assert_eq!(Theme::dark().warmed(7.5), Theme::dark().warmed(1.0));
        assert_eq!(Theme::light().warmed(-1.0), Theme::light());
    }

    #[test]
    fn test_preferences_select_mode_and_blend() {
        let mut preferences = Preferences {
            dark_mode: false,
            ..Preferences::default()
        };
        assert_eq!(Theme::from_preferences(&preferences), Theme::light());

        preferences.eye_comfort = true;
        preferences.eye_comfort_intensity = 0.5;
        assert_eq!(
            Theme::from_preferences(&preferences),
            Theme::light().warmed(0.5)
        );
    }

    #[test]
    fn test_non_rgb_colors_pass_through() {
        assert_eq!(warm(Color::Reset, 0.3), Color::Reset);
    }

    #[test]
    fn test_turn_spacing_widens_with_font_size() {
        assert_eq!(turn_spacing(14.0), 1);
        assert_eq!(turn_spacing(18.0), 2);
        assert_eq!(turn_spacing(32.0), 2);
    }
}
