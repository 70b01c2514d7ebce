//! Intro configuration
//!
//! Every timing and visual parameter of the intro, with the defaults the site
//! ships with. Loaded from TOML; any omitted field keeps its default.
//!
//! ```toml
//! [overlay]
//! hold_duration_ms = 600
//! fade_duration_ms = 500
//!
//! [reveal]
//! base_delay_ms = 35.0
//! jitter_ms = 25.0
//!
//! [background]
//! stroke_color = "#00e5ff"
//! ```

use crate::contour::ContourGroup;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating an [`IntroConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("Invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be written back out
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Complete intro configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IntroConfig {
    pub overlay: OverlayConfig,
    pub reveal: RevealConfig,
    pub background: BackgroundConfig,
}

impl IntroConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: IntroConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that would break the timing or drawing contracts
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reveal.validate()?;
        self.background.validate()
    }
}

// =============================================================================
// Overlay
// =============================================================================

/// Loading overlay timing
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// How long the overlay stays opaque before fading
    pub hold_duration_ms: u64,
    /// Duration of the fade to transparent
    pub fade_duration_ms: u64,
    /// Delay between a navigated page's load event and the fade
    pub navigation_reshow_buffer_ms: u64,
}

impl OverlayConfig {
    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_duration_ms)
    }

    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }

    pub fn navigation_reshow_buffer(&self) -> Duration {
        Duration::from_millis(self.navigation_reshow_buffer_ms)
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            hold_duration_ms: 600,
            fade_duration_ms: 500,
            navigation_reshow_buffer_ms: 300,
        }
    }
}

// =============================================================================
// Reveal
// =============================================================================

/// Text reveal timing
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Shortest delay between two characters
    pub base_delay_ms: f64,
    /// Width of the random range added to the base delay
    pub jitter_ms: f64,
    /// Start the reveal after this long if the overlay never signals
    pub fallback_trigger_ms: u64,
    /// Session storage key of the "already played" flag
    pub session_key: String,
}

impl RevealConfig {
    /// Delay before the next character for a uniform draw `unit` in `[0, 1)`
    ///
    /// The result lies in `[base, base + jitter)`. It is truncated to whole
    /// microseconds so the upper bound stays exclusive. Without jitter every
    /// step takes exactly `base`.
    pub fn step_delay(&self, unit: f64) -> Duration {
        let base_micros = (self.base_delay_ms.max(0.0) * 1000.0).floor() as u64;
        if self.jitter_ms.is_nan() || self.jitter_ms <= 0.0 {
            return Duration::from_micros(base_micros);
        }

        let unit = unit.clamp(0.0, 1.0);
        let ms = self.base_delay_ms + self.jitter_ms * unit;
        let micros = (ms * 1000.0).floor() as u64;
        let max_micros = ((self.base_delay_ms + self.jitter_ms) * 1000.0).ceil() as u64;
        Duration::from_micros(micros.min(max_micros.saturating_sub(1)).max(base_micros))
    }

    pub fn fallback_trigger(&self) -> Duration {
        Duration::from_millis(self.fallback_trigger_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_delay_ms.is_finite() || self.base_delay_ms < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "reveal.base_delay_ms must be a non-negative number, got {}",
                self.base_delay_ms
            )));
        }
        if !self.jitter_ms.is_finite() || self.jitter_ms <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "reveal.jitter_ms must be positive, got {}",
                self.jitter_ms
            )));
        }
        if self.session_key.is_empty() {
            return Err(ConfigError::Invalid(
                "reveal.session_key must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 35.0,
            jitter_ms: 25.0,
            fallback_trigger_ms: 1500,
            session_key: "heroNameTyped".to_string(),
        }
    }
}

// =============================================================================
// Background
// =============================================================================

/// Procedural background parameters
///
/// These shape the visuals only; none of them affect timing or the
/// reduced-motion contract.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Phase advance per frame, in radians
    pub phase_increment: f32,
    /// Centre value of the oscillating noise frequency
    pub base_frequency: f32,
    /// Oscillation amplitude around `base_frequency`
    pub oscillation_amplitude: f32,
    /// Rate of the vertical axis relative to the horizontal one
    pub secondary_rate: f32,
    /// Vertical translation per pixel scrolled
    pub scroll_parallax: f32,
    /// Maximum pointer-driven translation in pixels
    pub pointer_parallax: f32,
    /// Displacement scale in view-box units
    pub displacement_scale: f32,
    pub noise_octaves: u32,
    pub noise_seed: u64,
    pub stroke_color: String,
    pub stroke_opacity: f32,
    pub stroke_width: f32,
    /// Points sampled per contour ring
    pub ring_segments: usize,
    #[serde(rename = "contour")]
    pub contours: Vec<ContourGroup>,
}

impl BackgroundConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("phase_increment", self.phase_increment),
            ("base_frequency", self.base_frequency),
            ("oscillation_amplitude", self.oscillation_amplitude),
            ("secondary_rate", self.secondary_rate),
            ("scroll_parallax", self.scroll_parallax),
            ("pointer_parallax", self.pointer_parallax),
            ("displacement_scale", self.displacement_scale),
            ("stroke_width", self.stroke_width),
        ];
        for (name, value) in finite {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "background.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.stroke_opacity) {
            return Err(ConfigError::Invalid(format!(
                "background.stroke_opacity must be within [0, 1], got {}",
                self.stroke_opacity
            )));
        }
        if !(1..=8).contains(&self.noise_octaves) {
            return Err(ConfigError::Invalid(format!(
                "background.noise_octaves must be within 1..=8, got {}",
                self.noise_octaves
            )));
        }
        if self.ring_segments < 3 {
            return Err(ConfigError::Invalid(format!(
                "background.ring_segments must be at least 3, got {}",
                self.ring_segments
            )));
        }
        Ok(())
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            phase_increment: 0.0006,
            base_frequency: 0.004,
            oscillation_amplitude: 0.0015,
            secondary_rate: 0.73,
            scroll_parallax: 0.05,
            pointer_parallax: 8.0,
            displacement_scale: 50.0,
            noise_octaves: 2,
            noise_seed: 1,
            stroke_color: "#00e5ff".to_string(),
            stroke_opacity: 0.12,
            stroke_width: 0.8,
            ring_segments: 64,
            contours: ContourGroup::defaults(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = IntroConfig::default();
        assert_eq!(config.overlay.hold_duration(), Duration::from_millis(600));
        assert_eq!(config.overlay.fade_duration(), Duration::from_millis(500));
        assert_eq!(
            config.overlay.navigation_reshow_buffer(),
            Duration::from_millis(300)
        );
        assert_eq!(config.reveal.base_delay_ms, 35.0);
        assert_eq!(config.reveal.jitter_ms, 25.0);
        assert_eq!(config.reveal.fallback_trigger(), Duration::from_millis(1500));
        assert_eq!(config.background.contours.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = IntroConfig::from_toml_str(
            r#"
            [overlay]
            hold_duration_ms = 800

            [reveal]
            session_key = "introPlayed"
            "#,
        )
        .unwrap();

        assert_eq!(config.overlay.hold_duration_ms, 800);
        assert_eq!(config.overlay.fade_duration_ms, 500);
        assert_eq!(config.reveal.session_key, "introPlayed");
        assert_eq!(config.reveal.jitter_ms, 25.0);
        assert_eq!(config.background, BackgroundConfig::default());
    }

    #[test]
    fn test_serialized_defaults_parse_back() {
        let text = IntroConfig::default().to_toml_string().unwrap();
        let parsed = IntroConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, IntroConfig::default());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let zero_jitter = IntroConfig::from_toml_str("[reveal]\njitter_ms = 0.0\n");
        assert!(matches!(zero_jitter, Err(ConfigError::Invalid(_))));

        let opacity = IntroConfig::from_toml_str("[background]\nstroke_opacity = 1.5\n");
        assert!(matches!(opacity, Err(ConfigError::Invalid(_))));

        let syntax = IntroConfig::from_toml_str("[overlay\n");
        assert!(matches!(syntax, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_step_delay_bounds() {
        let reveal = RevealConfig::default();
        assert_eq!(reveal.step_delay(0.0), Duration::from_millis(35));
        assert!(reveal.step_delay(0.5) >= Duration::from_millis(35));
        assert!(reveal.step_delay(0.999_999_999) < Duration::from_millis(60));
        assert!(reveal.step_delay(1.0) < Duration::from_millis(60));
    }

    #[test]
    fn test_step_delay_without_jitter_is_base() {
        let reveal = RevealConfig {
            jitter_ms: 0.0,
            ..Default::default()
        };
        assert_eq!(reveal.step_delay(0.0), Duration::from_millis(35));
        assert_eq!(reveal.step_delay(0.7), Duration::from_millis(35));

        let tiny = RevealConfig {
            jitter_ms: 0.0001,
            ..Default::default()
        };
        assert!(tiny.step_delay(0.0) >= Duration::from_millis(35));
        assert!(tiny.step_delay(1.0) >= Duration::from_millis(35));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = IntroConfig::load(Path::new("/nonexistent/overture.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
