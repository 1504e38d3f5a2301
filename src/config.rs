//! Process-wide stamping parameters
//!
//! The footer opacity and the diagonal watermark angle are read once when the
//! process starts and then passed explicitly into every stamping call.

use std::env;
use crate::error::{Error, Result};

/// Environment variable holding the footer opacity
pub const FOOTER_OPACITY_VAR: &str = "FOOTER_OPACITY";

/// Environment variable holding the diagonal angle in degrees
pub const DIAGONAL_ANGLE_VAR: &str = "DIAGONAL_ANGLE";

/// Default opacity for footer text and separator
pub const DEFAULT_FOOTER_OPACITY: f32 = 0.6;

/// Default watermark angle, counter-clockwise from horizontal
pub const DEFAULT_DIAGONAL_ANGLE: f32 = 35.0;

/// Tunables shared by every stamping call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampConfig {
    /// Opacity of footer text and separator, in (0, 1]
    pub footer_opacity: f32,
    /// Rotation of the diagonal watermark in degrees
    pub diagonal_angle_degrees: f32,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            footer_opacity: DEFAULT_FOOTER_OPACITY,
            diagonal_angle_degrees: DEFAULT_DIAGONAL_ANGLE,
        }
    }
}

impl StampConfig {
    /// Read the tunables from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the tunables through an arbitrary key lookup
    ///
    /// Unset or empty values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = non_empty(lookup(FOOTER_OPACITY_VAR)) {
            let opacity = parse_number(FOOTER_OPACITY_VAR, &raw)?;
            config = config.with_opacity(opacity)?;
        }

        if let Some(raw) = non_empty(lookup(DIAGONAL_ANGLE_VAR)) {
            let angle = parse_number(DIAGONAL_ANGLE_VAR, &raw)?;
            config = config.with_angle(angle)?;
        }

        Ok(config)
    }

    /// Override the footer opacity
    pub fn with_opacity(mut self, opacity: f32) -> Result<Self> {
        if !(opacity > 0.0 && opacity <= 1.0) {
            return Err(Error::Config(format!(
                "footer opacity must be in (0, 1], got {}",
                opacity
            )));
        }
        self.footer_opacity = opacity;
        Ok(self)
    }

    /// Override the diagonal angle
    pub fn with_angle(mut self, degrees: f32) -> Result<Self> {
        if !degrees.is_finite() {
            return Err(Error::Config(format!(
                "diagonal angle must be a finite number of degrees, got {}",
                degrees
            )));
        }
        self.diagonal_angle_degrees = degrees;
        Ok(self)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number(key: &str, raw: &str) -> Result<f32> {
    raw.parse::<f32>()
        .map_err(|_| Error::Config(format!("{} is not a number: {:?}", key, raw)))
}
