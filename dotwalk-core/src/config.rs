//! Walker configuration, partial reconfiguration and validation.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::constants::{
    DEFAULT_BOUNDARY_MARGIN, DEFAULT_DOT_SIZE, DEFAULT_MAX_LEG_DISTANCE, DEFAULT_MIN_LEG_DISTANCE,
    DEFAULT_PAUSE_MS, DEFAULT_REDIRECT_STEP, DEFAULT_STEP_SIZE, MAX_PAUSE_MS,
    VIEWPORT_MAX_LEG_RATIO, VIEWPORT_MIN_LEG_RATIO,
};
use crate::geometry::SafeRegion;
use crate::numbers::{i64_to_f64, i64_to_pause_ms, u64_to_f64};

/// What the walker does when a step carries it outside the safe region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// Abandon the leg and head back toward the origin.
    #[default]
    Redirect,
    /// Snap back onto the edge and wait for a fresh random leg.
    Halt,
}

/// How leg lengths are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegScaling {
    /// Use `min_leg_distance..=max_leg_distance` as configured.
    #[default]
    Fixed,
    /// Cap the configured range by fractions of the drawable diagonal.
    Viewport,
}

/// Errors raised when walker configuration invariants are violated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a finite value greater than zero (got {value:.2})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be a finite value of zero or more (got {value:.2})")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("leg minimum {min:.2} exceeds maximum {max:.2}")]
    LegRangeInverted { min: f64, max: f64 },
    #[error("safe region needs positive half extents (got {half_width:.2} x {half_height:.2})")]
    InvalidRegion { half_width: f64, half_height: f64 },
    #[error("invalid walker config: {0}")]
    Parse(String),
}

/// Motion parameters read by the walker on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkerConfig {
    #[serde(default = "WalkerConfig::default_step_size")]
    pub step_size: f64,
    #[serde(default = "WalkerConfig::default_pause_ms")]
    pub pause_ms: u64,
    #[serde(default = "WalkerConfig::default_min_leg_distance")]
    pub min_leg_distance: f64,
    #[serde(default = "WalkerConfig::default_max_leg_distance")]
    pub max_leg_distance: f64,
    #[serde(default = "WalkerConfig::default_boundary_margin")]
    pub boundary_margin: f64,
    #[serde(default = "WalkerConfig::default_redirect_step_distance")]
    pub redirect_step_distance: f64,
    /// Rendering hint for hosts; motion never reads it.
    #[serde(default = "WalkerConfig::default_dot_size")]
    pub dot_size: f64,
    #[serde(default)]
    pub edge_policy: EdgePolicy,
    #[serde(default)]
    pub leg_scaling: LegScaling,
}

impl WalkerConfig {
    const fn default_step_size() -> f64 {
        DEFAULT_STEP_SIZE
    }

    const fn default_pause_ms() -> u64 {
        DEFAULT_PAUSE_MS
    }

    const fn default_min_leg_distance() -> f64 {
        DEFAULT_MIN_LEG_DISTANCE
    }

    const fn default_max_leg_distance() -> f64 {
        DEFAULT_MAX_LEG_DISTANCE
    }

    const fn default_boundary_margin() -> f64 {
        DEFAULT_BOUNDARY_MARGIN
    }

    const fn default_redirect_step_distance() -> f64 {
        DEFAULT_REDIRECT_STEP
    }

    const fn default_dot_size() -> f64 {
        DEFAULT_DOT_SIZE
    }

    /// Parse a JSON document (missing fields take their defaults) and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and the matching
    /// validation error when a field violates its bounds.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("step_size", self.step_size)?;
        check_pause(self.pause_ms)?;
        check_positive("min_leg_distance", self.min_leg_distance)?;
        check_positive("max_leg_distance", self.max_leg_distance)?;
        check_leg_order(self.min_leg_distance, self.max_leg_distance)?;
        check_non_negative("boundary_margin", self.boundary_margin)?;
        check_positive("redirect_step_distance", self.redirect_step_distance)?;
        check_positive("dot_size", self.dot_size)?;
        Ok(())
    }
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            step_size: Self::default_step_size(),
            pause_ms: Self::default_pause_ms(),
            min_leg_distance: Self::default_min_leg_distance(),
            max_leg_distance: Self::default_max_leg_distance(),
            boundary_margin: Self::default_boundary_margin(),
            redirect_step_distance: Self::default_redirect_step_distance(),
            dot_size: Self::default_dot_size(),
            edge_policy: EdgePolicy::default(),
            leg_scaling: LegScaling::default(),
        }
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn check_pause(value: u64) -> Result<(), ConfigError> {
    if value <= MAX_PAUSE_MS {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field: "pause_ms",
            min: 0.0,
            max: u64_to_f64(MAX_PAUSE_MS),
            value: u64_to_f64(value),
        })
    }
}

fn check_leg_order(min: f64, max: f64) -> Result<(), ConfigError> {
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::LegRangeInverted { min, max })
    }
}

/// Partial configuration coming from a host control; absent fields are left alone.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConfigPatch {
    pub step_size: Option<f64>,
    /// Signed so a negative slider value is rejected instead of wrapping.
    pub pause_ms: Option<i64>,
    pub min_leg_distance: Option<f64>,
    pub max_leg_distance: Option<f64>,
    pub boundary_margin: Option<f64>,
    pub redirect_step_distance: Option<f64>,
    pub dot_size: Option<f64>,
    pub edge_policy: Option<EdgePolicy>,
    pub leg_scaling: Option<LegScaling>,
}

/// Names of the fields touched by one `reconfigure` call.
pub type FieldList = SmallVec<[&'static str; 4]>;

/// Result of merging a `ConfigPatch` into the current configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconfigureReport {
    /// Configuration after the merge; always valid.
    pub config: WalkerConfig,
    pub applied: FieldList,
    pub rejected: SmallVec<[ConfigError; 2]>,
}

impl ReconfigureReport {
    /// True when every field of the patch was accepted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    #[must_use]
    pub fn was_applied(&self, field: &str) -> bool {
        self.applied.iter().any(|f| *f == field)
    }

    fn accept_f64(
        &mut self,
        field: &'static str,
        candidate: Option<f64>,
        check: fn(&'static str, f64) -> Result<(), ConfigError>,
    ) -> Option<f64> {
        let value = candidate?;
        match check(field, value) {
            Ok(()) => Some(value),
            Err(err) => {
                self.rejected.push(err);
                None
            }
        }
    }
}

impl ConfigPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.step_size.is_none()
            && self.pause_ms.is_none()
            && self.min_leg_distance.is_none()
            && self.max_leg_distance.is_none()
            && self.boundary_margin.is_none()
            && self.redirect_step_distance.is_none()
            && self.dot_size.is_none()
            && self.edge_policy.is_none()
            && self.leg_scaling.is_none()
    }

    /// Merge this patch into `current`. Invalid fields keep their current value
    /// and are reported; valid fields are applied regardless.
    #[must_use]
    pub fn apply_to(&self, current: &WalkerConfig) -> ReconfigureReport {
        let mut report = ReconfigureReport {
            config: current.clone(),
            applied: FieldList::new(),
            rejected: SmallVec::new(),
        };

        if let Some(v) = report.accept_f64("step_size", self.step_size, check_positive) {
            report.config.step_size = v;
            report.applied.push("step_size");
        }

        if let Some(raw) = self.pause_ms {
            match i64_to_pause_ms(raw).filter(|ms| check_pause(*ms).is_ok()) {
                Some(ms) => {
                    report.config.pause_ms = ms;
                    report.applied.push("pause_ms");
                }
                None => report.rejected.push(ConfigError::OutOfRange {
                    field: "pause_ms",
                    min: 0.0,
                    max: u64_to_f64(MAX_PAUSE_MS),
                    value: i64_to_f64(raw),
                }),
            }
        }

        self.merge_leg_range(&mut report);

        if let Some(v) = report.accept_f64("boundary_margin", self.boundary_margin, check_non_negative)
        {
            report.config.boundary_margin = v;
            report.applied.push("boundary_margin");
        }

        if let Some(v) = report.accept_f64(
            "redirect_step_distance",
            self.redirect_step_distance,
            check_positive,
        ) {
            report.config.redirect_step_distance = v;
            report.applied.push("redirect_step_distance");
        }

        if let Some(v) = report.accept_f64("dot_size", self.dot_size, check_positive) {
            report.config.dot_size = v;
            report.applied.push("dot_size");
        }

        if let Some(policy) = self.edge_policy {
            report.config.edge_policy = policy;
            report.applied.push("edge_policy");
        }

        if let Some(scaling) = self.leg_scaling {
            report.config.leg_scaling = scaling;
            report.applied.push("leg_scaling");
        }

        report
    }

    fn merge_leg_range(&self, report: &mut ReconfigureReport) {
        let min = report.accept_f64("min_leg_distance", self.min_leg_distance, check_positive);
        let max = report.accept_f64("max_leg_distance", self.max_leg_distance, check_positive);
        if min.is_none() && max.is_none() {
            return;
        }

        let merged_min = min.unwrap_or(report.config.min_leg_distance);
        let merged_max = max.unwrap_or(report.config.max_leg_distance);
        if let Err(err) = check_leg_order(merged_min, merged_max) {
            report.rejected.push(err);
            return;
        }

        if min.is_some() {
            report.config.min_leg_distance = merged_min;
            report.applied.push("min_leg_distance");
        }
        if max.is_some() {
            report.config.max_leg_distance = merged_max;
            report.applied.push("max_leg_distance");
        }
    }
}

/// Effective leg length range for the current configuration and region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegRange {
    pub min: f64,
    pub max: f64,
}

impl LegRange {
    #[must_use]
    pub fn for_region(config: &WalkerConfig, region: &SafeRegion) -> Self {
        match config.leg_scaling {
            LegScaling::Fixed => Self {
                min: config.min_leg_distance,
                max: config.max_leg_distance,
            },
            LegScaling::Viewport => {
                let diagonal = region.drawable_diagonal(config.boundary_margin);
                let min = config.min_leg_distance.min(diagonal * VIEWPORT_MIN_LEG_RATIO);
                let max = config.max_leg_distance.min(diagonal * VIEWPORT_MAX_LEG_RATIO);
                Self {
                    min,
                    max: max.max(min),
                }
            }
        }
    }

    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_desktop_host() {
        let cfg = WalkerConfig::default();
        assert!((cfg.step_size - 3.0).abs() < f64::EPSILON);
        assert_eq!(cfg.pause_ms, 350);
        assert!((cfg.redirect_step_distance - 150.0).abs() < f64::EPSILON);
        assert_eq!(cfg.edge_policy, EdgePolicy::Redirect);
        cfg.validate().unwrap();
    }

    #[test]
    fn from_json_fills_defaults_and_validates() {
        let cfg = WalkerConfig::from_json(r#"{"step_size": 5.5, "edge_policy": "halt"}"#).unwrap();
        assert!((cfg.step_size - 5.5).abs() < f64::EPSILON);
        assert_eq!(cfg.edge_policy, EdgePolicy::Halt);
        assert!((cfg.min_leg_distance - 100.0).abs() < f64::EPSILON);

        let err = WalkerConfig::from_json(r#"{"min_leg_distance": 700}"#).unwrap_err();
        assert!(matches!(err, ConfigError::LegRangeInverted { .. }));

        let err = WalkerConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn patch_applies_valid_fields_and_keeps_last_valid_for_bad_ones() {
        let current = WalkerConfig::default();
        let patch = ConfigPatch {
            step_size: Some(-2.0),
            pause_ms: Some(120),
            dot_size: Some(40.0),
            ..ConfigPatch::default()
        };
        let report = patch.apply_to(&current);
        assert!(!report.is_clean());
        assert!((report.config.step_size - 3.0).abs() < f64::EPSILON);
        assert_eq!(report.config.pause_ms, 120);
        assert!(report.was_applied("dot_size"));
        assert!(!report.was_applied("step_size"));
        report.config.validate().unwrap();
    }

    #[test]
    fn negative_pause_is_rejected() {
        let report = ConfigPatch {
            pause_ms: Some(-50),
            ..ConfigPatch::default()
        }
        .apply_to(&WalkerConfig::default());
        assert_eq!(report.config.pause_ms, 350);
        assert!(matches!(
            report.rejected.first(),
            Some(ConfigError::OutOfRange {
                field: "pause_ms",
                ..
            })
        ));
    }

    #[test]
    fn inverted_leg_patch_rejects_both_leg_fields() {
        let report = ConfigPatch {
            min_leg_distance: Some(500.0),
            max_leg_distance: Some(200.0),
            ..ConfigPatch::default()
        }
        .apply_to(&WalkerConfig::default());
        assert!((report.config.min_leg_distance - 100.0).abs() < f64::EPSILON);
        assert!((report.config.max_leg_distance - 600.0).abs() < f64::EPSILON);
        assert_eq!(
            report.rejected.as_slice(),
            &[ConfigError::LegRangeInverted {
                min: 500.0,
                max: 200.0
            }]
        );
    }

    #[test]
    fn leg_patch_checks_against_current_bound() {
        let report = ConfigPatch {
            min_leg_distance: Some(600.0),
            ..ConfigPatch::default()
        }
        .apply_to(&WalkerConfig::default());
        assert!(report.is_clean());
        assert!((report.config.min_leg_distance - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let patch = ConfigPatch::default();
        assert!(patch.is_empty());
        let report = patch.apply_to(&WalkerConfig::default());
        assert!(report.applied.is_empty());
        assert_eq!(report.config, WalkerConfig::default());
    }

    #[test]
    fn viewport_scaling_caps_leg_range() {
        let cfg = WalkerConfig {
            leg_scaling: LegScaling::Viewport,
            boundary_margin: 0.0,
            ..WalkerConfig::default()
        };
        // 600 x 800 drawable area, diagonal 1000
        let region = SafeRegion::new(300.0, 400.0).unwrap();
        let range = LegRange::for_region(&cfg, &region);
        assert!((range.min - 100.0).abs() < 1e-9);
        assert!((range.max - 600.0).abs() < 1e-9);

        let small = SafeRegion::new(30.0, 40.0).unwrap();
        let range = LegRange::for_region(&cfg, &small);
        assert!((range.min - 10.0).abs() < 1e-9);
        assert!((range.max - 60.0).abs() < 1e-9);
    }
}
