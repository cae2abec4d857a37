//! Seeded random streams feeding leg selection.
//!
//! Headings and leg lengths come from independent streams derived from one
//! user-visible seed, so changing how often one is drawn never shifts the other.
use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::f64::consts::TAU;

use crate::config::LegRange;
use crate::constants::{RNG_DOMAIN_DISTANCE, RNG_DOMAIN_HEADING};
use crate::numbers::normalize_radians;

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Per-stream draw counters, exposed for determinism checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RngDraws {
    pub heading: u64,
    pub distance: u64,
}

/// The pair of streams owned by one walker.
#[derive(Debug, Clone)]
pub struct WalkerRng {
    seed: u64,
    heading: CountingRng<SmallRng>,
    distance: CountingRng<SmallRng>,
}

impl WalkerRng {
    /// Construct both streams from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            heading: CountingRng::new(derive_stream_seed(seed, RNG_DOMAIN_HEADING)),
            distance: CountingRng::new(derive_stream_seed(seed, RNG_DOMAIN_DISTANCE)),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform heading over the full turn, in radians.
    pub fn heading(&mut self) -> f64 {
        normalize_radians(self.heading.gen_range(0.0..TAU))
    }

    /// Uniform leg length within `range` (the minimum when the range is empty).
    pub fn leg_distance(&mut self, range: LegRange) -> f64 {
        if range.is_degenerate() {
            return range.min;
        }
        self.distance.gen_range(range.min..=range.max)
    }

    #[must_use]
    pub const fn draws(&self) -> RngDraws {
        RngDraws {
            heading: self.heading.draws(),
            distance: self.distance.draws(),
        }
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(b"dotwalk/");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
