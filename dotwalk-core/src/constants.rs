//! Centralized tuning constants for the Dotwalk motion engine.
//!
//! Defaults mirror the values the desktop and web hosts ship with. Hosts may
//! override any of them through `WalkerConfig`; the constants here only seed
//! the defaults and the validation ranges.

// Motion defaults ----------------------------------------------------------
pub(crate) const DEFAULT_STEP_SIZE: f64 = 3.0;
pub(crate) const DEFAULT_PAUSE_MS: u64 = 350;
pub(crate) const DEFAULT_MIN_LEG_DISTANCE: f64 = 100.0;
pub(crate) const DEFAULT_MAX_LEG_DISTANCE: f64 = 600.0;
pub(crate) const DEFAULT_BOUNDARY_MARGIN: f64 = 15.0;
pub(crate) const DEFAULT_REDIRECT_STEP: f64 = 150.0;
pub(crate) const DEFAULT_DOT_SIZE: f64 = 24.0;

// Validation ranges --------------------------------------------------------
pub(crate) const MAX_PAUSE_MS: u64 = 60_000;

// Geometry -----------------------------------------------------------------
/// Both axes must be strictly inside this distance for the dot to count as centred.
pub(crate) const CENTER_EPSILON: f64 = 1.0;
/// Remaining leg distance at or below this is treated as a finished leg.
pub(crate) const LEG_COMPLETE_EPSILON: f64 = 1e-9;

// Viewport leg scaling -----------------------------------------------------
pub(crate) const VIEWPORT_MIN_LEG_RATIO: f64 = 0.1;
pub(crate) const VIEWPORT_MAX_LEG_RATIO: f64 = 0.6;

// Host cadence -------------------------------------------------------------
/// Frame interval the hosts schedule `tick` at (~60 Hz).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

// RNG stream domains -------------------------------------------------------
pub(crate) const RNG_DOMAIN_HEADING: &[u8] = b"heading";
pub(crate) const RNG_DOMAIN_DISTANCE: &[u8] = b"distance";
