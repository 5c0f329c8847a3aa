//! Composer configuration.

use cadence_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Largest accepted `frame_interval_secs`: one year
pub const MAX_FRAME_INTERVAL_SECS: i64 = 365 * 24 * 60 * 60;

/// Tunables for [`crate::ScheduleComposer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Above this many signal windows an unspecified strategy resolves to `sla-aware`
    pub sla_window_threshold: usize,
    /// Above this load a new plan starts `active` instead of `ready`
    pub active_load_threshold: usize,
    /// Seconds between timeline frames, at most [`MAX_FRAME_INTERVAL_SECS`]
    pub frame_interval_secs: i64,
    /// Fewest frames a timeline may have
    pub min_frames: usize,
    /// Frame limit used when the caller does not give one
    pub default_frame_limit: usize,
    /// Starting pressure of every node
    pub pressure_baseline: f64,
    /// Pressure at or above which a node is reported hot
    pub hot_pressure_threshold: f64,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            sla_window_threshold: 24,
            active_load_threshold: 6,
            frame_interval_secs: 60,
            min_frames: 6,
            default_frame_limit: 20,
            pressure_baseline: crate::pressure::DEFAULT_BASELINE,
            hot_pressure_threshold: 2.0,
        }
    }
}

impl ComposerConfig {
    /// Parse from JSON; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or the values are invalid
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns the first invalid field
    pub fn validate(&self) -> CoreResult<()> {
        if self.frame_interval_secs <= 0 {
            return Err(CoreError::validation(
                "frame_interval_secs",
                "must be positive",
            ));
        }
        if self.frame_interval_secs > MAX_FRAME_INTERVAL_SECS {
            return Err(CoreError::validation(
                "frame_interval_secs",
                format!("must be at most {}", MAX_FRAME_INTERVAL_SECS),
            ));
        }
        if self.min_frames == 0 {
            return Err(CoreError::validation("min_frames", "must be at least 1"));
        }
        if !self.pressure_baseline.is_finite() {
            return Err(CoreError::validation(
                "pressure_baseline",
                "must be a finite number",
            ));
        }
        if !self.hot_pressure_threshold.is_finite() {
            return Err(CoreError::validation(
                "hot_pressure_threshold",
                "must be a finite number",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ComposerConfig::default();
        assert_eq!(config.sla_window_threshold, 24);
        assert_eq!(config.active_load_threshold, 6);
        assert_eq!(config.frame_interval_secs, 60);
        assert_eq!(config.min_frames, 6);
        assert_eq!(config.default_frame_limit, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ComposerConfig::from_json_str(r#"{"min_frames": 3}"#).unwrap();
        assert_eq!(config.min_frames, 3);
        assert_eq!(config.default_frame_limit, 20);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ComposerConfig::from_json_str(r#"{"frame_interval_secs": 0}"#).unwrap_err();
        assert!(err.to_string().contains("frame_interval_secs"));
        assert!(ComposerConfig::from_json_str(r#"{"min_frames": 0}"#).is_err());
        assert!(matches!(
            ComposerConfig::from_json_str("[").unwrap_err(),
            CoreError::InvalidEncoding { .. }
        ));
    }

    #[test]
    fn test_oversized_interval_rejected() {
        let err = ComposerConfig::from_json_str(r#"{"frame_interval_secs": 10000000000000000}"#)
            .unwrap_err();
        assert!(err.to_string().contains("frame_interval_secs"));

        let at_cap = format!(r#"{{"frame_interval_secs": {}}}"#, MAX_FRAME_INTERVAL_SECS);
        assert!(ComposerConfig::from_json_str(&at_cap).is_ok());
    }
}
