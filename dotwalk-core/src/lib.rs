//! Dotwalk Motion Engine
//!
//! Platform-agnostic core for the Dotwalk animation: a single dot performing a
//! randomized walk inside a rectangular safe region. This crate owns no
//! window, timer or drawing surface; hosts call `Walker::tick` from their own
//! frame scheduler and read `Walker::snapshot` to redraw.

pub mod config;
pub mod constants;
pub mod geometry;
pub mod numbers;
pub mod rng;
pub mod seed;
pub mod walker;

// Re-export commonly used types
pub use config::{
    ConfigError, ConfigPatch, EdgePolicy, LegRange, LegScaling, ReconfigureReport, WalkerConfig,
};
pub use constants::DEFAULT_FRAME_INTERVAL_MS;
pub use geometry::{Point, SafeRegion, Viewport};
pub use rng::{RngDraws, WalkerRng};
pub use seed::{code_from_entropy, decode_code, encode_code, parse_replay_code};
pub use walker::{Leg, TickOutcome, Walker, WalkerSnapshot};
