//! Effect presets and tunables.
//!
//! Every field has a default, so a config file only needs the values it
//! changes.

use std::path::Path;
use std::time::Duration;

use glam::Vec4;
use lumenrain_platform::GlowStroke;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Bounds accepted for `rain.column_width_px`.
pub const MIN_COLUMN_WIDTH_PX: f32 = 1.0;
pub const MAX_COLUMN_WIDTH_PX: f32 = 4096.0;
/// Upper bound in seconds for both rain start delay and scroll duration.
pub const MAX_RAIN_TIMING_S: f32 = 3600.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    /// Viewports narrower than this are constrained.
    pub narrow_viewport_px: f32,
    /// Lowercase user-agent fragments that mark a handheld device.
    pub mobile_signatures: Vec<String>,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            narrow_viewport_px: 768.0,
            mobile_signatures: [
                "android",
                "webos",
                "iphone",
                "ipad",
                "ipod",
                "blackberry",
                "iemobile",
                "opera mini",
                "mobile",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainConfig {
    pub column_width_px: f32,
    /// Glyphs per column are drawn from `min_glyphs..max_glyphs`.
    pub min_glyphs: usize,
    pub max_glyphs: usize,
    pub max_start_delay_s: f32,
    pub scroll_duration_s: f32,
    pub opacity: f32,
    pub reduced_opacity: f32,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            column_width_px: 20.0,
            min_glyphs: 50,
            max_glyphs: 100,
            max_start_delay_s: 5.0,
            scroll_duration_s: 25.0,
            opacity: 0.6,
            reduced_opacity: 0.25,
        }
    }
}

impl RainConfig {
    /// Falls back to the default duration when the configured value is not a
    /// representable non-negative duration.
    pub fn scroll_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.scroll_duration_s)
            .unwrap_or_else(|_| Duration::from_secs_f32(RainConfig::default().scroll_duration_s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MotionMode {
    /// Constant per-particle fall with vertical wrap.
    Falling,
    /// Evenly phased particles circling the canvas center.
    Orbiting {
        angular_step: f32,
        radius_fraction: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Overlay {
    /// A single glyph centered on the canvas; font size is
    /// `font_fraction * min(width, height)`.
    Glyph { text: String, font_fraction: f32 },
    /// The built-in logo path, spanning `scale_fraction * min(width, height)`.
    LogoPath { scale_fraction: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticlePreset {
    pub name: String,
    pub particle_count: usize,
    pub motion: MotionMode,
    pub overlay: Overlay,
    /// RGB of the particles; alpha is scaled by each particle's brightness.
    pub particle_color: Vec4,
    pub overlay_fill: Vec4,
    pub glow: GlowStroke,
}

impl ParticlePreset {
    pub fn falling_logo() -> Self {
        Self {
            name: "falling-logo".into(),
            particle_count: 60,
            motion: MotionMode::Falling,
            overlay: Overlay::Glyph {
                text: "\u{2726}".into(),
                font_fraction: 0.5,
            },
            particle_color: Vec4::new(1.0, 0.84, 0.35, 1.0),
            overlay_fill: Vec4::new(1.0, 0.95, 0.8, 1.0),
            glow: GlowStroke::default(),
        }
    }

    pub fn orbit_logo() -> Self {
        Self {
            name: "orbit-logo".into(),
            particle_count: 5,
            motion: MotionMode::Orbiting {
                angular_step: crate::particles::ORBIT_ANGULAR_STEP,
                radius_fraction: 0.35,
            },
            overlay: Overlay::LogoPath {
                scale_fraction: 0.6,
            },
            particle_color: Vec4::new(0.55, 0.85, 1.0, 1.0),
            overlay_fill: Vec4::new(1.0, 1.0, 1.0, 1.0),
            glow: GlowStroke {
                color: Vec4::new(0.55, 0.85, 1.0, 1.0),
                ..GlowStroke::default()
            },
        }
    }
}

impl Default for ParticlePreset {
    fn default() -> Self {
        Self::falling_logo()
    }
}

/// How far motion advances per frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickTiming {
    /// One fixed step per callback; speed follows the display refresh rate.
    #[default]
    PerFrame,
    /// Step scaled by elapsed time relative to `reference_fps`.
    Elapsed { reference_fps: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub capability: CapabilityConfig,
    pub rain: RainConfig,
    pub resize_debounce_ms: u64,
    pub timing: TickTiming,
    pub falling_logo: ParticlePreset,
    pub orbit_logo: ParticlePreset,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            capability: CapabilityConfig::default(),
            rain: RainConfig::default(),
            resize_debounce_ms: 250,
            timing: TickTiming::default(),
            falling_logo: ParticlePreset::falling_logo(),
            orbit_logo: ParticlePreset::orbit_logo(),
        }
    }
}

impl EffectsConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let rain = &self.rain;
        if !(MIN_COLUMN_WIDTH_PX..=MAX_COLUMN_WIDTH_PX).contains(&rain.column_width_px) {
            return Err(invalid(format!(
                "rain.column_width_px must be within {MIN_COLUMN_WIDTH_PX}..={MAX_COLUMN_WIDTH_PX}"
            )));
        }
        if rain.min_glyphs == 0 || rain.min_glyphs >= rain.max_glyphs {
            return Err(invalid("rain glyph range must be non-empty and start above zero"));
        }
        if !(0.0..=MAX_RAIN_TIMING_S).contains(&rain.max_start_delay_s) {
            return Err(invalid(format!(
                "rain.max_start_delay_s must be within 0..={MAX_RAIN_TIMING_S}"
            )));
        }
        if !(rain.scroll_duration_s > 0.0 && rain.scroll_duration_s <= MAX_RAIN_TIMING_S) {
            return Err(invalid(format!(
                "rain.scroll_duration_s must be positive and at most {MAX_RAIN_TIMING_S}"
            )));
        }
        if self.resize_debounce_ms == 0 {
            return Err(invalid("resize_debounce_ms must be at least 1"));
        }
        if let TickTiming::Elapsed { reference_fps } = self.timing {
            if !(reference_fps > 0.0) {
                return Err(invalid("timing.reference_fps must be positive"));
            }
        }
        for preset in [&self.falling_logo, &self.orbit_logo] {
            if let MotionMode::Orbiting { radius_fraction, .. } = preset.motion {
                if !(0.0..=0.5).contains(&radius_fraction) {
                    return Err(invalid(format!(
                        "{}: orbit radius_fraction must be within 0..=0.5",
                        preset.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidConfig(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = EffectsConfig::default();
        assert_eq!(config.rain.column_width_px, 20.0);
        assert_eq!((config.rain.min_glyphs, config.rain.max_glyphs), (50, 100));
        assert_eq!(config.rain.scroll_duration(), Duration::from_secs(25));
        assert_eq!(config.resize_debounce(), Duration::from_millis(250));
        assert_eq!(config.capability.narrow_viewport_px, 768.0);
        assert_eq!(config.orbit_logo.particle_count, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EffectsConfig::from_toml_str(
            r#"
            resize_debounce_ms = 100

            [rain]
            opacity = 0.4

            [timing]
            kind = "elapsed"
            reference_fps = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(config.resize_debounce_ms, 100);
        assert_eq!(config.rain.opacity, 0.4);
        assert_eq!(config.rain.column_width_px, 20.0);
        assert_eq!(config.timing, TickTiming::Elapsed { reference_fps: 60.0 });
        assert_eq!(config.falling_logo, ParticlePreset::falling_logo());
    }

    #[test]
    fn json_config_round_trips_presets() {
        let json = serde_json::to_string(&EffectsConfig::default()).unwrap();
        let parsed = EffectsConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, EffectsConfig::default());
    }

    #[test]
    fn rejects_zero_column_width() {
        let err = EffectsConfig::from_toml_str("[rain]\ncolumn_width_px = 0.0").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_overflowing_scroll_duration_from_json() {
        let err = EffectsConfig::from_json_str(r#"{"rain":{"scroll_duration_s":1e300}}"#)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_infinite_start_delay_from_toml() {
        let err = EffectsConfig::from_toml_str("[rain]\nmax_start_delay_s = inf").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
        let err = EffectsConfig::from_toml_str("[rain]\nmax_start_delay_s = nan").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_vanishing_column_width() {
        let err = EffectsConfig::from_toml_str("[rain]\ncolumn_width_px = 1e-30").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn accepts_timings_at_the_bounds() {
        let config = EffectsConfig::from_toml_str(
            "[rain]\nmax_start_delay_s = 0.0\nscroll_duration_s = 3600.0\ncolumn_width_px = 1.0",
        )
        .unwrap();
        assert_eq!(config.rain.scroll_duration(), Duration::from_secs(3600));
    }

    #[test]
    fn rejects_zero_debounce() {
        let config = EffectsConfig {
            resize_debounce_ms: 0,
            ..EffectsConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
