//! Bounded random walker.
//!
//! A `Walker` owns one dot. Every leg of travel is a random heading paired
//! with a random length; each new leg starts with a settle pause. When a step
//! carries the dot outside the safe region the leg is abandoned and, under the
//! default edge policy, replaced by a recovery leg aimed at the origin.
//!
//! Boundary detection happens after the move, so the dot may sit outside the
//! region by up to one step on the tick that triggers the redirect.
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::{
    ConfigError, ConfigPatch, EdgePolicy, LegRange, ReconfigureReport, WalkerConfig,
};
use crate::constants::{CENTER_EPSILON, LEG_COMPLETE_EPSILON};
use crate::geometry::{Point, SafeRegion, Viewport};
use crate::numbers::{normalize_radians, radians_to_degrees};
use crate::rng::{RngDraws, WalkerRng};

/// One segment of travel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// Radians, counter-clockwise from `+x`.
    pub heading: f64,
    pub distance: f64,
}

impl Leg {
    #[must_use]
    pub const fn new(heading: f64, distance: f64) -> Self {
        Self { heading, distance }
    }
}

/// What a single `tick` did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickOutcome {
    /// The walker is stopped.
    Idle,
    /// Inside a settle pause.
    Paused,
    /// No active leg; a new one was chosen and its pause started.
    LegPicked,
    /// Moved `step` along the active leg and stayed inside the region.
    Advanced { step: f64 },
    /// Moved `step`, left the region, and started a recovery leg.
    Redirected { step: f64 },
    /// Moved `step`, left the region, and was snapped back onto the edge.
    Halted { step: f64 },
}

impl TickOutcome {
    /// Whether the position changed during this tick.
    #[must_use]
    pub const fn moved(self) -> bool {
        matches!(
            self,
            Self::Advanced { .. } | Self::Redirected { .. } | Self::Halted { .. }
        )
    }

    /// Distance travelled during this tick before any edge handling.
    #[must_use]
    pub const fn step(self) -> f64 {
        match self {
            Self::Advanced { step } | Self::Redirected { step } | Self::Halted { step } => step,
            Self::Idle | Self::Paused | Self::LegPicked => 0.0,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Paused => "paused",
            Self::LegPicked => "leg_picked",
            Self::Advanced { .. } => "advanced",
            Self::Redirected { .. } => "redirected",
            Self::Halted { .. } => "halted",
        }
    }
}

/// Everything a host needs to redraw the dot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkerSnapshot {
    pub position: Point,
    pub heading_degrees: Option<f64>,
    pub remaining: f64,
    pub paused_until_ms: u64,
    pub redirecting: bool,
    pub running: bool,
    pub dot_size: f64,
}

#[derive(Debug, Clone)]
pub struct Walker {
    config: WalkerConfig,
    region: SafeRegion,
    /// Set when the region was derived from a viewport, so margin changes can re-derive it.
    viewport: Option<Viewport>,
    rng: WalkerRng,
    position: Point,
    heading: Option<f64>,
    remaining: f64,
    paused_until_ms: u64,
    redirecting: bool,
    running: bool,
}

impl Walker {
    /// Create a stopped walker at the origin with no active leg.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the configuration is invalid or the region
    /// has a non-positive extent.
    pub fn new(config: WalkerConfig, region: SafeRegion, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let region = SafeRegion::new(region.half_width, region.half_height)?;
        Ok(Self {
            config,
            region,
            viewport: None,
            rng: WalkerRng::from_user_seed(seed),
            position: Point::ORIGIN,
            heading: None,
            remaining: 0.0,
            paused_until_ms: 0,
            redirecting: false,
            running: false,
        })
    }

    /// Create a walker whose region is derived from a viewport and the configured margin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the configuration is invalid or the viewport
    /// leaves no room inside the margin.
    pub fn with_viewport(
        config: WalkerConfig,
        viewport: Viewport,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        let region = SafeRegion::new(
            viewport.width / 2.0 - config.boundary_margin,
            viewport.height / 2.0 - config.boundary_margin,
        )?;
        let mut walker = Self::new(config, region, seed)?;
        walker.viewport = Some(viewport);
        Ok(walker)
    }

    /// Advance the simulation by one tick at host time `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }
        if now_ms < self.paused_until_ms {
            return TickOutcome::Paused;
        }
        let Some(heading) = self.heading.filter(|_| self.remaining > 0.0) else {
            self.pick_new_leg(now_ms);
            return TickOutcome::LegPicked;
        };

        let step = self.config.step_size.min(self.remaining);
        self.position = self.position.advanced(heading, step);
        self.remaining -= step;
        if self.remaining <= LEG_COMPLETE_EPSILON {
            self.remaining = 0.0;
        }

        if self.region.contains(self.position) {
            return TickOutcome::Advanced { step };
        }

        match self.config.edge_policy {
            EdgePolicy::Redirect => {
                self.redirect_to_center(self.config.redirect_step_distance, now_ms);
                TickOutcome::Redirected { step }
            }
            EdgePolicy::Halt => {
                self.halt_at_edge(now_ms);
                TickOutcome::Halted { step }
            }
        }
    }

    /// Choose a random heading and leg length, then start the settle pause.
    pub fn pick_new_leg(&mut self, now_ms: u64) {
        let range = LegRange::for_region(&self.config, &self.region);
        let leg = Leg {
            heading: self.rng.heading(),
            distance: self.rng.leg_distance(range),
        };
        debug!(
            "leg picked: heading {:.1}deg distance {:.1} at {now_ms}ms",
            radians_to_degrees(leg.heading),
            leg.distance
        );
        self.begin_leg(leg, now_ms, false);
    }

    /// Abandon the active leg and head back toward the origin for `push_distance`.
    ///
    /// A dot already within one unit of the origin on both axes gets a fresh
    /// random leg instead of a degenerate aim at its own position.
    pub fn redirect_to_center(&mut self, push_distance: f64, now_ms: u64) {
        if self.position.x.abs() < CENTER_EPSILON && self.position.y.abs() < CENTER_EPSILON {
            self.pick_new_leg(now_ms);
            return;
        }
        let heading = self.position.heading_to_origin();
        debug!(
            "redirecting from ({:.1}, {:.1}) toward origin for {push_distance:.1}",
            self.position.x, self.position.y
        );
        self.begin_leg(Leg::new(heading, push_distance), now_ms, true);
    }

    /// Start an explicit leg with a fresh settle pause.
    pub fn begin_leg(&mut self, leg: Leg, now_ms: u64, redirecting: bool) {
        self.heading = Some(normalize_radians(leg.heading));
        self.remaining = if leg.distance.is_finite() {
            leg.distance.max(0.0)
        } else {
            0.0
        };
        self.paused_until_ms = now_ms.saturating_add(self.config.pause_ms);
        self.redirecting = redirecting;
    }

    fn halt_at_edge(&mut self, now_ms: u64) {
        self.position = self.region.clamp(self.position);
        self.remaining = 0.0;
        self.redirecting = false;
        self.paused_until_ms = now_ms.saturating_add(self.config.pause_ms);
        debug!(
            "halted at edge ({:.1}, {:.1})",
            self.position.x, self.position.y
        );
    }

    /// Resume motion. Picks a leg right away when none is active.
    pub fn start(&mut self, now_ms: u64) {
        if self.running {
            return;
        }
        self.running = true;
        if self.heading.is_none() || self.remaining <= 0.0 {
            self.pick_new_leg(now_ms);
        }
    }

    /// Suspend motion, keeping the active leg for a later `start`.
    pub const fn stop(&mut self) {
        self.running = false;
    }

    /// Return to the origin and forget the active leg. Leaves `running` alone.
    pub const fn reset(&mut self) {
        self.position = Point::ORIGIN;
        self.heading = None;
        self.remaining = 0.0;
        self.paused_until_ms = 0;
        self.redirecting = false;
    }

    /// Replace the safe region and clamp the dot into it.
    pub fn update_bounds(&mut self, half_width: f64, half_height: f64) {
        let region = SafeRegion::floored(half_width, half_height);
        if region.half_width != half_width || region.half_height != half_height {
            warn!(
                "safe region {half_width:.1} x {half_height:.1} floored to {:.1} x {:.1}",
                region.half_width, region.half_height
            );
        }
        self.viewport = None;
        self.apply_region(region);
    }

    /// Derive the safe region from the host's drawable area and the configured margin.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.apply_region(SafeRegion::from_viewport(
            viewport,
            self.config.boundary_margin,
        ));
    }

    fn apply_region(&mut self, region: SafeRegion) {
        self.region = region;
        let clamped = region.clamp(self.position);
        if clamped != self.position {
            debug!(
                "clamped ({:.1}, {:.1}) into resized region",
                self.position.x, self.position.y
            );
            self.position = clamped;
            if self.redirecting {
                self.reaim_redirect();
            }
        }
    }

    /// Keep a recovery leg pointed at the origin after the dot was moved under it.
    fn reaim_redirect(&mut self) {
        if self.position.x.abs() < CENTER_EPSILON && self.position.y.abs() < CENTER_EPSILON {
            // nothing to aim at; the next unpaused tick picks a random leg
            self.remaining = 0.0;
            self.redirecting = false;
            return;
        }
        self.heading = Some(normalize_radians(self.position.heading_to_origin()));
    }

    /// Place the dot, clamped into the safe region.
    pub fn set_position(&mut self, point: Point) {
        self.position = self.region.clamp(point);
    }

    /// Apply a partial configuration. Rejected fields keep their last valid value.
    pub fn reconfigure(&mut self, patch: &ConfigPatch) -> ReconfigureReport {
        let report = patch.apply_to(&self.config);
        for err in &report.rejected {
            warn!("rejected walker config change: {err}");
        }
        self.config = report.config.clone();
        if report.was_applied("boundary_margin")
            && let Some(viewport) = self.viewport
        {
            self.apply_region(SafeRegion::from_viewport(
                viewport,
                self.config.boundary_margin,
            ));
        }
        report
    }

    /// Replace the random streams; the current leg is kept.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = WalkerRng::from_user_seed(seed);
    }

    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Active heading in radians, `None` before the first leg or after a reset.
    #[must_use]
    pub const fn heading(&self) -> Option<f64> {
        self.heading
    }

    #[must_use]
    pub fn heading_degrees(&self) -> Option<f64> {
        self.heading.map(radians_to_degrees)
    }

    #[must_use]
    pub const fn remaining(&self) -> f64 {
        self.remaining
    }

    #[must_use]
    pub const fn paused_until_ms(&self) -> u64 {
        self.paused_until_ms
    }

    #[must_use]
    pub const fn is_paused(&self, now_ms: u64) -> bool {
        now_ms < self.paused_until_ms
    }

    #[must_use]
    pub const fn is_redirecting(&self) -> bool {
        self.redirecting
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn config(&self) -> &WalkerConfig {
        &self.config
    }

    #[must_use]
    pub const fn region(&self) -> SafeRegion {
        self.region
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }

    #[must_use]
    pub const fn rng_draws(&self) -> RngDraws {
        self.rng.draws()
    }

    #[must_use]
    pub fn snapshot(&self) -> WalkerSnapshot {
        WalkerSnapshot {
            position: self.position,
            heading_degrees: self.heading_degrees(),
            remaining: self.remaining,
            paused_until_ms: self.paused_until_ms,
            redirecting: self.redirecting,
            running: self.running,
            dot_size: self.config.dot_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn walker() -> Walker {
        let config = WalkerConfig {
            pause_ms: 100,
            ..WalkerConfig::default()
        };
        Walker::new(config, SafeRegion::new(400.0, 300.0).unwrap(), 99).unwrap()
    }

    #[test]
    fn new_walker_is_idle_at_origin() {
        let mut w = walker();
        assert_eq!(w.position(), Point::ORIGIN);
        assert!(w.heading().is_none());
        assert!(w.remaining().abs() < f64::EPSILON);
        assert!(!w.is_running());
        assert_eq!(w.tick(0), TickOutcome::Idle);
    }

    #[test]
    fn construction_rejects_bad_region_and_config() {
        let err = Walker::new(
            WalkerConfig::default(),
            SafeRegion {
                half_width: 0.0,
                half_height: 10.0,
            },
            1,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegion { .. }));

        let bad = WalkerConfig {
            step_size: 0.0,
            ..WalkerConfig::default()
        };
        assert!(Walker::new(bad, SafeRegion::new(10.0, 10.0).unwrap(), 1).is_err());

        let cramped = Walker::with_viewport(WalkerConfig::default(), Viewport::new(20.0, 400.0), 1);
        assert!(matches!(cramped, Err(ConfigError::InvalidRegion { .. })));
    }

    #[test]
    fn start_picks_leg_and_pauses() {
        let mut w = walker();
        w.start(1_000);
        assert!(w.is_running());
        assert!(w.heading().is_some());
        assert!(w.remaining() >= 100.0 && w.remaining() <= 600.0);
        assert_eq!(w.paused_until_ms(), 1_100);
        assert_eq!(w.tick(1_050), TickOutcome::Paused);
        assert!(matches!(w.tick(1_100), TickOutcome::Advanced { .. }));
    }

    #[test]
    fn start_while_running_keeps_leg() {
        let mut w = walker();
        w.start(0);
        let heading = w.heading();
        let remaining = w.remaining();
        w.start(50);
        assert_eq!(w.heading(), heading);
        assert!((w.remaining() - remaining).abs() < f64::EPSILON);
        assert_eq!(w.paused_until_ms(), 100);
    }

    #[test]
    fn stop_then_start_resumes_same_leg() {
        let mut w = walker();
        w.begin_leg(Leg::new(0.0, 50.0), 0, false);
        w.start(0);
        w.tick(100);
        w.stop();
        let heading = w.heading();
        assert_eq!(w.tick(200), TickOutcome::Idle);
        w.start(300);
        assert_eq!(w.heading(), heading);
        assert!((w.remaining() - 47.0).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_leg_but_not_running() {
        let mut w = walker();
        w.start(0);
        w.tick(100);
        w.tick(116);
        w.reset();
        assert!(w.is_running());
        assert_eq!(w.position(), Point::ORIGIN);
        assert!(w.heading().is_none());
        assert_eq!(w.paused_until_ms(), 0);
        assert!(!w.is_redirecting());
        assert_eq!(w.tick(120), TickOutcome::LegPicked);
    }

    #[test]
    fn begin_leg_normalises_heading_and_distance() {
        let mut w = walker();
        w.begin_leg(Leg::new(-PI / 2.0, f64::NAN), 10, true);
        assert!((w.heading().unwrap() - 1.5 * PI).abs() < 1e-12);
        assert!(w.remaining().abs() < f64::EPSILON);
        assert!(w.is_redirecting());
        assert_eq!(w.paused_until_ms(), 110);
    }

    #[test]
    fn halt_policy_clamps_and_waits_for_new_leg() {
        let config = WalkerConfig {
            edge_policy: EdgePolicy::Halt,
            pause_ms: 10,
            ..WalkerConfig::default()
        };
        let mut w = Walker::new(config, SafeRegion::new(100.0, 100.0).unwrap(), 3).unwrap();
        w.set_position(Point::new(99.0, 0.0));
        w.begin_leg(Leg::new(0.0, 50.0), 0, false);
        w.start(0);
        let outcome = w.tick(10);
        assert_eq!(outcome, TickOutcome::Halted { step: 3.0 });
        assert_eq!(w.position(), Point::new(100.0, 0.0));
        assert!(w.remaining().abs() < f64::EPSILON);
        assert_eq!(w.paused_until_ms(), 20);
        assert_eq!(w.tick(20), TickOutcome::LegPicked);
    }

    #[test]
    fn update_bounds_clamps_without_redirect() {
        let mut w = walker();
        w.set_position(Point::new(350.0, -250.0));
        w.begin_leg(Leg::new(0.0, 100.0), 0, false);
        w.update_bounds(200.0, 100.0);
        assert_eq!(w.position(), Point::new(200.0, -100.0));
        assert!(!w.is_redirecting());
        assert!((w.remaining() - 100.0).abs() < f64::EPSILON);

        w.update_bounds(-5.0, f64::NAN);
        assert_eq!(w.region(), SafeRegion::floored(0.0, 0.0));
        assert_eq!(w.position(), Point::ORIGIN);
    }

    #[test]
    fn margin_change_rederives_viewport_region() {
        let mut w =
            Walker::with_viewport(WalkerConfig::default(), Viewport::new(830.0, 630.0), 5).unwrap();
        assert!((w.region().half_width - 400.0).abs() < f64::EPSILON);
        let report = w.reconfigure(&ConfigPatch {
            boundary_margin: Some(115.0),
            ..ConfigPatch::default()
        });
        assert!(report.is_clean());
        assert!((w.region().half_width - 300.0).abs() < f64::EPSILON);
        assert!((w.region().half_height - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reconfigure_keeps_running_on_bad_input() {
        let mut w = walker();
        w.start(0);
        let report = w.reconfigure(&ConfigPatch {
            step_size: Some(f64::NAN),
            ..ConfigPatch::default()
        });
        assert!(!report.is_clean());
        assert!(w.is_running());
        assert!((w.config().step_size - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_reports_degrees() {
        let mut w = walker();
        w.begin_leg(Leg::new(PI, 10.0), 0, true);
        let snap = w.snapshot();
        assert!((snap.heading_degrees.unwrap() - 180.0).abs() < 1e-9);
        assert!(snap.redirecting);
        assert!(!snap.running);
    }
}
