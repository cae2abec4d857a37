//! Fixed-interval frame loop standing in for a host UI timer.
use log::info;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use twox_hash::XxHash64;

use dotwalk_core::{ConfigPatch, Point, TickOutcome, Viewport, Walker};

/// Host-side control delivered to the walker before a frame's tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Start,
    Stop,
    Reset,
    Resize(Viewport),
    Bounds { half_width: f64, half_height: f64 },
    Reconfigure(ConfigPatch),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedEvent {
    pub frame: u64,
    pub event: ControlEvent,
}

impl ScriptedEvent {
    #[must_use]
    pub const fn new(frame: u64, event: ControlEvent) -> Self {
        Self { frame, event }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    pub frame: u64,
    pub time_ms: u64,
    pub position: Point,
    pub outcome: TickOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub frames: u64,
    pub legs_picked: u64,
    pub redirects: u64,
    pub halts: u64,
    pub paused_ticks: u64,
    pub idle_ticks: u64,
    pub advancing_ticks: u64,
    pub distance: f64,
    pub max_step: f64,
    /// Largest per-axis distance beyond the region on any tick.
    pub worst_overshoot: f64,
    /// Largest per-axis distance beyond the region while no redirect was pending.
    pub worst_escape: f64,
    pub rejected_fields: u64,
}

impl RunStats {
    fn record(&mut self, outcome: TickOutcome) {
        self.frames += 1;
        match outcome {
            TickOutcome::Idle => self.idle_ticks += 1,
            TickOutcome::Paused => self.paused_ticks += 1,
            TickOutcome::LegPicked => self.legs_picked += 1,
            TickOutcome::Advanced { .. } => self.advancing_ticks += 1,
            TickOutcome::Redirected { .. } => self.redirects += 1,
            TickOutcome::Halted { .. } => self.halts += 1,
        }
        let step = outcome.step();
        self.distance += step;
        self.max_step = self.max_step.max(step);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTrace {
    pub samples: Vec<FrameSample>,
    pub stats: RunStats,
}

impl RunTrace {
    /// xxHash64 over every sample; equal traces hash equal.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        for sample in &self.samples {
            hasher.write_u64(sample.frame);
            hasher.write_u64(sample.time_ms);
            hasher.write_u64(sample.position.x.to_bits());
            hasher.write_u64(sample.position.y.to_bits());
            hasher.write(sample.outcome.label().as_bytes());
            hasher.write_u64(sample.outcome.step().to_bits());
        }
        hasher.finish()
    }
}

/// Owns a walker and a simulated clock that starts at zero.
#[derive(Debug, Clone)]
pub struct FrameDriver {
    walker: Walker,
    clock_ms: u64,
    frame_ms: u64,
    /// Set while the walker may legitimately sit outside the region after a redirect.
    redirect_pending: bool,
}

impl FrameDriver {
    #[must_use]
    pub fn new(walker: Walker, frame_ms: u64) -> Self {
        Self {
            walker,
            clock_ms: 0,
            frame_ms: frame_ms.max(1),
            redirect_pending: false,
        }
    }

    #[must_use]
    pub const fn walker(&self) -> &Walker {
        &self.walker
    }

    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.clock_ms
    }

    #[must_use]
    pub const fn frame_ms(&self) -> u64 {
        self.frame_ms
    }

    /// Run `frames` ticks, firing each scripted event before the tick of its frame.
    ///
    /// Frame numbers restart at zero for every call; the clock keeps running.
    pub fn run(&mut self, frames: u64, script: &[ScriptedEvent]) -> RunTrace {
        let mut trace = RunTrace {
            samples: Vec::with_capacity(usize::try_from(frames).unwrap_or(0)),
            stats: RunStats::default(),
        };

        for frame in 0..frames {
            let now = self.clock_ms;
            for scripted in script.iter().filter(|s| s.frame == frame) {
                self.apply(&scripted.event, now, &mut trace.stats);
            }

            let outcome = self.walker.tick(now);
            trace.stats.record(outcome);
            if outcome.moved() {
                self.redirect_pending = matches!(outcome, TickOutcome::Redirected { .. });
            }

            let position = self.walker.position();
            let overshoot = self.walker.region().overshoot(position);
            trace.stats.worst_overshoot = trace.stats.worst_overshoot.max(overshoot);
            if !self.redirect_pending {
                trace.stats.worst_escape = trace.stats.worst_escape.max(overshoot);
            }

            trace.samples.push(FrameSample {
                frame,
                time_ms: now,
                position,
                outcome,
            });
            self.clock_ms = self.clock_ms.saturating_add(self.frame_ms);
        }

        info!(
            "driver ran {frames} frames to {}ms: {} legs, {} redirects, {} halts, distance {:.1}",
            self.now_ms(),
            trace.stats.legs_picked,
            trace.stats.redirects,
            trace.stats.halts,
            trace.stats.distance
        );
        trace
    }

    fn apply(&mut self, event: &ControlEvent, now_ms: u64, stats: &mut RunStats) {
        match event {
            ControlEvent::Start => self.walker.start(now_ms),
            ControlEvent::Stop => self.walker.stop(),
            ControlEvent::Reset => {
                self.walker.reset();
                self.redirect_pending = false;
            }
            ControlEvent::Resize(viewport) => self.walker.resize(*viewport),
            ControlEvent::Bounds {
                half_width,
                half_height,
            } => self.walker.update_bounds(*half_width, *half_height),
            ControlEvent::Reconfigure(patch) => {
                let report = self.walker.reconfigure(patch);
                stats.rejected_fields += u64::try_from(report.rejected.len()).unwrap_or(u64::MAX);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotwalk_core::{DEFAULT_FRAME_INTERVAL_MS, SafeRegion, WalkerConfig};

    fn driver(seed: u64) -> FrameDriver {
        let walker =
            Walker::new(WalkerConfig::default(), SafeRegion::new(400.0, 300.0).unwrap(), seed)
                .unwrap();
        FrameDriver::new(walker, DEFAULT_FRAME_INTERVAL_MS)
    }

    #[test]
    fn stopped_walker_only_idles() {
        let mut d = driver(1);
        let trace = d.run(10, &[]);
        assert_eq!(trace.stats.idle_ticks, 10);
        assert_eq!(d.now_ms(), 160);
        assert!(trace.samples.iter().all(|s| s.position == Point::ORIGIN));
    }

    #[test]
    fn events_fire_before_their_frame_tick() {
        let mut d = driver(1);
        let trace = d.run(
            5,
            &[
                ScriptedEvent::new(2, ControlEvent::Start),
                ScriptedEvent::new(4, ControlEvent::Stop),
            ],
        );
        let labels: Vec<_> = trace.samples.iter().map(|s| s.outcome.label()).collect();
        assert_eq!(labels, ["idle", "idle", "paused", "paused", "idle"]);
        assert_eq!(trace.samples[2].time_ms, 32);
    }

    #[test]
    fn same_seed_same_fingerprint() {
        let script = [ScriptedEvent::new(0, ControlEvent::Start)];
        let a = driver(9).run(1_000, &script);
        let b = driver(9).run(1_000, &script);
        let c = driver(10).run(1_000, &script);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn rejected_patch_fields_are_counted() {
        let mut d = driver(1);
        let patch = ConfigPatch {
            step_size: Some(0.0),
            pause_ms: Some(-1),
            dot_size: Some(30.0),
            ..ConfigPatch::default()
        };
        let trace = d.run(1, &[ScriptedEvent::new(0, ControlEvent::Reconfigure(patch))]);
        assert_eq!(trace.stats.rejected_fields, 2);
        assert!((d.walker().config().dot_size - 30.0).abs() < f64::EPSILON);
    }
}
