use serde::{Deserialize, Serialize};

/// User-facing display and request preferences, persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub dark_mode: bool,
    pub font_size: f32,
    pub eye_comfort: bool,
    /// Strength of the eye-comfort warm tint, 0.0 to 1.0.
    pub eye_comfort_intensity: f32,
    pub fast_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dark_mode: true,
            font_size: 14.0,
            eye_comfort: false,
            eye_comfort_intensity: 0.5,
            fast_mode: false,
        }
    }
}

impl Preferences {
    /// Clamp values that may have been hand-edited into nonsense.
    pub fn sanitized(mut self) -> Self {
        self.font_size = self.font_size.clamp(8.0, 32.0);
        self.eye_comfort_intensity = self.eye_comfort_intensity.clamp(0.0, 1.0);
        self
    }
}
