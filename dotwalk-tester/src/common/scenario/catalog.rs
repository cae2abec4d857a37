use anyhow::{Result, ensure};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::{PI, TAU};

use crate::common::scenario::TestScenario;
use crate::logic::driver::FrameSample;
use crate::logic::{ControlEvent, FrameDriver, ScriptedEvent, SimulationPlan, SimulationSummary};
use dotwalk_core::numbers::{ceil_f64_to_u64, normalize_radians};
use dotwalk_core::{
    ConfigPatch, EdgePolicy, Leg, LegRange, LegScaling, Point, SafeRegion, TickOutcome, Viewport,
    Walker,
};

const EPS: f64 = 1e-9;

const STOP_FRAME: u64 = 240;
const RESET_FRAME: u64 = 300;
const SHRINK_FRAME: u64 = 400;
const RESTORE_FRAME: u64 = 800;
const BAD_PATCH_FRAME: u64 = 100;
const GOOD_PATCH_FRAME: u64 = 200;
const SHRUNK_HALF_WIDTH: f64 = 120.0;
const SHRUNK_HALF_HEIGHT: f64 = 90.0;
const RESTORED_VIEWPORT: Viewport = Viewport::new(640.0, 480.0);
const FUZZ_SALT: u64 = 0xF022_D07_u64;

pub fn catalog_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::new(
            "smoke",
            "Smoke Run",
            "Start a walker and confirm it moves inside the region",
            SimulationPlan::new()
                .with_min_frames(120)
                .with_expectation(smoke_expectation),
        ),
        TestScenario::new(
            "containment",
            "Containment",
            "Position stays inside the region apart from one-step overshoots before a redirect",
            SimulationPlan::new()
                .with_patch(ConfigPatch {
                    pause_ms: Some(16),
                    edge_policy: Some(EdgePolicy::Redirect),
                    ..ConfigPatch::default()
                })
                .with_min_frames(12_000)
                .with_expectation(containment_expectation),
        ),
        TestScenario::new(
            "leg-completion",
            "Leg Completion",
            "Legs finish after ceil(distance / step) advancing ticks",
            SimulationPlan::new()
                .with_patch(ConfigPatch {
                    step_size: Some(3.0),
                    min_leg_distance: Some(120.0),
                    max_leg_distance: Some(120.0),
                    redirect_step_distance: Some(150.0),
                    edge_policy: Some(EdgePolicy::Redirect),
                    leg_scaling: Some(LegScaling::Fixed),
                    ..ConfigPatch::default()
                })
                .with_min_frames(3_000)
                .with_expectation(leg_completion_expectation),
        ),
        TestScenario::new(
            "pause-gating",
            "Pause Gating",
            "No movement while a settle pause is running",
            SimulationPlan::new()
                .with_patch(ConfigPatch {
                    pause_ms: Some(200),
                    ..ConfigPatch::default()
                })
                .with_min_frames(2_000)
                .with_expectation(pause_gating_expectation),
        ),
        TestScenario::new(
            "stop-idempotent",
            "Idempotent Stop",
            "Repeated stops freeze the walker exactly like a single stop",
            SimulationPlan::new()
                .with_min_frames(STOP_FRAME * 2)
                .with_event(STOP_FRAME, ControlEvent::Stop)
                .with_event(STOP_FRAME + 1, ControlEvent::Stop)
                .with_expectation(stop_expectation),
        ),
        TestScenario::new(
            "reset",
            "Reset",
            "Reset returns to the origin and the next tick picks a fresh leg",
            SimulationPlan::new()
                .with_min_frames(RESET_FRAME * 2)
                .with_event(RESET_FRAME, ControlEvent::Reset)
                .with_expectation(reset_expectation),
        ),
        TestScenario::new(
            "center-degeneracy",
            "Center Degeneracy",
            "Redirects within one unit of the origin fall back to a random leg",
            SimulationPlan::new().with_expectation(center_degeneracy_expectation),
        ),
        TestScenario::new(
            "overshoot-redirect",
            "Overshoot Redirect",
            "Crossing the edge overshoots by one step, then heads for the origin",
            SimulationPlan::new()
                .with_patch(ConfigPatch {
                    step_size: Some(3.0),
                    edge_policy: Some(EdgePolicy::Redirect),
                    ..ConfigPatch::default()
                })
                .with_setup(edge_approach_setup)
                .with_expectation(overshoot_redirect_expectation),
        ),
        TestScenario::new(
            "resize-clamp",
            "Resize Clamp",
            "Shrinking the region clamps the dot without starting a redirect",
            SimulationPlan::new()
                .with_min_frames(RESTORE_FRAME + 400)
                .with_event(
                    SHRINK_FRAME,
                    ControlEvent::Bounds {
                        half_width: SHRUNK_HALF_WIDTH,
                        half_height: SHRUNK_HALF_HEIGHT,
                    },
                )
                .with_event(RESTORE_FRAME, ControlEvent::Resize(RESTORED_VIEWPORT))
                .with_expectation(resize_clamp_expectation),
        ),
        TestScenario::new(
            "reconfigure-coercion",
            "Reconfigure Coercion",
            "Invalid settings are rejected while valid ones apply on the next tick",
            SimulationPlan::new()
                .with_min_frames(GOOD_PATCH_FRAME * 2)
                .with_event(BAD_PATCH_FRAME, ControlEvent::Reconfigure(invalid_patch()))
                .with_event(
                    GOOD_PATCH_FRAME,
                    ControlEvent::Reconfigure(ConfigPatch {
                        step_size: Some(6.0),
                        ..ConfigPatch::default()
                    }),
                )
                .with_expectation(reconfigure_coercion_expectation),
        ),
        TestScenario::new(
            "halt-policy",
            "Halt Policy",
            "The halting edge policy never leaves the region",
            SimulationPlan::new()
                .with_patch(ConfigPatch {
                    step_size: Some(9.0),
                    pause_ms: Some(16),
                    edge_policy: Some(EdgePolicy::Halt),
                    ..ConfigPatch::default()
                })
                .with_min_frames(8_000)
                .with_expectation(halt_policy_expectation),
        ),
        TestScenario::new(
            "determinism",
            "Determinism",
            "The same seed and script replay to the same trace",
            SimulationPlan::new()
                .with_min_frames(1_200)
                .with_event(600, ControlEvent::Reset)
                .with_expectation(determinism_expectation),
        ),
        TestScenario::new(
            "reconfigure-fuzz",
            "Reconfigure Fuzz",
            "Random control traffic never breaks containment or configuration validity",
            SimulationPlan::new()
                .with_min_frames(6_000)
                .with_script_builder(fuzz_script)
                .with_expectation(fuzz_expectation),
        ),
    ]
}

fn ensure_contained(summary: &SimulationSummary) -> Result<()> {
    let stats = &summary.trace.stats;
    ensure!(
        stats.worst_escape <= EPS,
        "left the safe region by {:.3} with no redirect pending",
        stats.worst_escape
    );
    ensure!(
        stats.worst_overshoot <= stats.max_step + EPS,
        "overshoot {:.3} exceeds the largest step {:.3}",
        stats.worst_overshoot,
        stats.max_step
    );
    Ok(())
}

fn moved_samples(summary: &SimulationSummary) -> impl Iterator<Item = &FrameSample> {
    summary.trace.samples.iter().filter(|s| s.outcome.moved())
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    let stats = &summary.trace.stats;
    let config = summary.walker.config();
    ensure!(summary.walker.is_running(), "walker should still be running");
    ensure!(stats.idle_ticks == 0, "running walker reported idle ticks");
    let elapsed = summary.frames.saturating_mul(summary.frame_ms);
    if elapsed > config.pause_ms.saturating_add(summary.frame_ms) {
        ensure!(stats.advancing_ticks > 0, "walker never advanced in {elapsed}ms");
    }
    let snapshot = summary.walker.snapshot();
    ensure!(
        (snapshot.dot_size - config.dot_size).abs() < EPS,
        "snapshot dot size drifted from config"
    );
    ensure_contained(summary)
}

fn containment_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure_contained(summary)?;
    let region = summary.walker.region();
    for sample in &summary.trace.samples {
        if matches!(sample.outcome, TickOutcome::Advanced { .. }) {
            ensure!(
                region.contains(sample.position),
                "frame {} advanced to ({:.2}, {:.2}) outside the region",
                sample.frame,
                sample.position.x,
                sample.position.y
            );
        }
    }
    Ok(())
}

fn leg_completion_expectation(summary: &SimulationSummary) -> Result<()> {
    let config = summary.walker.config();
    let mut active_leg = Some(config.min_leg_distance);
    let mut advancing = 0_u64;
    let mut completed = 0_u64;

    for sample in &summary.trace.samples {
        match sample.outcome {
            TickOutcome::Advanced { .. } => advancing += 1,
            TickOutcome::Redirected { .. } => {
                active_leg = Some(config.redirect_step_distance);
                advancing = 0;
            }
            TickOutcome::Halted { .. } => {
                active_leg = None;
                advancing = 0;
            }
            TickOutcome::LegPicked => {
                if let Some(distance) = active_leg {
                    let expected = ceil_f64_to_u64(distance / config.step_size);
                    ensure!(
                        advancing == expected,
                        "leg of {distance:.1} ending at frame {} took {advancing} advancing ticks, expected {expected}",
                        sample.frame
                    );
                    completed += 1;
                }
                active_leg = Some(config.min_leg_distance);
                advancing = 0;
            }
            TickOutcome::Idle | TickOutcome::Paused => {}
        }
    }

    ensure!(
        completed > 0,
        "no leg completed within {} frames",
        summary.frames
    );
    Ok(())
}

fn pause_gating_expectation(summary: &SimulationSummary) -> Result<()> {
    let pause_ms = summary.walker.config().pause_ms;
    let mut previous: Option<&FrameSample> = None;
    let mut window_end: Option<u64> = None;

    for sample in &summary.trace.samples {
        if let Some(end) = window_end
            && sample.time_ms < end
        {
            ensure!(
                sample.outcome == TickOutcome::Paused,
                "frame {} at {}ms {} inside a pause ending at {end}ms",
                sample.frame,
                sample.time_ms,
                sample.outcome.label()
            );
        }
        if sample.outcome == TickOutcome::Paused
            && let Some(prev) = previous
        {
            ensure!(
                prev.position == sample.position,
                "frame {} moved while paused",
                sample.frame
            );
        }
        if matches!(
            sample.outcome,
            TickOutcome::LegPicked | TickOutcome::Redirected { .. } | TickOutcome::Halted { .. }
        ) {
            window_end = Some(sample.time_ms.saturating_add(pause_ms));
        }
        previous = Some(sample);
    }

    let mut twin = summary.walker.clone();
    let now = summary.frames.saturating_mul(summary.frame_ms);
    twin.pick_new_leg(now);
    let before = twin.position();
    if pause_ms > 0 {
        ensure!(
            twin.tick(now.saturating_add(pause_ms) - 1) == TickOutcome::Paused,
            "tick one millisecond before the pause ends should be paused"
        );
        ensure!(twin.position() == before, "paused twin moved");
    }
    ensure!(
        twin.tick(now.saturating_add(pause_ms)).moved(),
        "twin did not move once the pause expired"
    );
    Ok(())
}

fn stop_expectation(summary: &SimulationSummary) -> Result<()> {
    let frozen = summary
        .sample(STOP_FRAME - 1)
        .map(|s| s.position)
        .ok_or_else(|| anyhow::anyhow!("run ended before frame {STOP_FRAME}"))?;
    for sample in summary.trace.samples.iter().skip_while(|s| s.frame < STOP_FRAME) {
        ensure!(
            sample.outcome == TickOutcome::Idle,
            "frame {} was {} after stop",
            sample.frame,
            sample.outcome.label()
        );
        ensure!(
            sample.position == frozen,
            "frame {} moved after stop",
            sample.frame
        );
    }
    ensure!(!summary.walker.is_running(), "walker still running after stop");

    let mut once = summary.walker.clone();
    once.stop();
    let single = once.snapshot();
    once.stop();
    ensure!(once.snapshot() == single, "second stop changed walker state");
    Ok(())
}

fn reset_expectation(summary: &SimulationSummary) -> Result<()> {
    let sample = summary
        .sample(RESET_FRAME)
        .ok_or_else(|| anyhow::anyhow!("run ended before frame {RESET_FRAME}"))?;
    ensure!(
        sample.outcome == TickOutcome::LegPicked,
        "first tick after reset was {}",
        sample.outcome.label()
    );
    ensure!(
        sample.position == Point::ORIGIN,
        "reset left the dot at ({:.2}, {:.2})",
        sample.position.x,
        sample.position.y
    );
    ensure!(summary.walker.is_running(), "reset stopped the walker");

    let mut stopped = summary.walker.clone();
    stopped.stop();
    stopped.reset();
    ensure!(!stopped.is_running(), "reset restarted a stopped walker");
    ensure!(
        stopped.tick(u64::MAX) == TickOutcome::Idle,
        "stopped walker ticked after reset"
    );
    ensure!(stopped.heading().is_none(), "reset kept the heading");
    ensure_contained(summary)
}

fn center_degeneracy_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut twin = summary.initial.clone();
    let config = twin.config().clone();
    let range = LegRange::for_region(&config, &twin.region());

    for point in [
        Point::ORIGIN,
        Point::new(0.5, -0.5),
        Point::new(-0.99, 0.99),
    ] {
        twin.set_position(point);
        twin.redirect_to_center(config.redirect_step_distance, 0);
        ensure!(
            !twin.is_redirecting(),
            "redirect from ({:.2}, {:.2}) aimed at the origin",
            point.x,
            point.y
        );
        ensure!(
            twin.remaining() >= range.min - EPS && twin.remaining() <= range.max + EPS,
            "fallback leg {:.2} outside {:.2}..={:.2}",
            twin.remaining(),
            range.min,
            range.max
        );
    }

    twin.set_position(Point::new(0.0, 1.0));
    twin.redirect_to_center(config.redirect_step_distance, 0);
    ensure!(
        twin.is_redirecting(),
        "one unit from the origin should still redirect"
    );
    ensure!(
        (twin.remaining() - config.redirect_step_distance).abs() < EPS,
        "redirect leg should use the redirect distance"
    );
    ensure_contained(summary)
}

fn edge_approach_setup(walker: &mut Walker) {
    let edge = walker.region().half_width;
    walker.set_position(Point::new(edge - 5.0, 0.0));
    walker.begin_leg(Leg::new(0.0, 100.0), 0, false);
}

fn overshoot_redirect_expectation(summary: &SimulationSummary) -> Result<()> {
    let edge = summary.initial.region().half_width;
    let mut moves = moved_samples(summary);
    let first = moves
        .next()
        .ok_or_else(|| anyhow::anyhow!("walker never moved"))?;
    ensure!(
        matches!(first.outcome, TickOutcome::Advanced { .. })
            && (first.position.x - (edge - 2.0)).abs() < EPS,
        "first step should advance to x = {:.1}, got {} at {:.3}",
        edge - 2.0,
        first.outcome.label(),
        first.position.x
    );
    let second = moves
        .next()
        .ok_or_else(|| anyhow::anyhow!("walker stopped after one step"))?;
    ensure!(
        matches!(second.outcome, TickOutcome::Redirected { .. })
            && (second.position.x - (edge + 1.0)).abs() < EPS,
        "second step should overshoot to x = {:.1} and redirect, got {} at {:.3}",
        edge + 1.0,
        second.outcome.label(),
        second.position.x
    );

    let mut twin = summary.initial.clone();
    let config = twin.config().clone();
    twin.start(0);
    let unpaused = twin.paused_until_ms();
    twin.tick(unpaused);
    let crossing = unpaused.saturating_add(summary.frame_ms);
    ensure!(
        matches!(twin.tick(crossing), TickOutcome::Redirected { .. }),
        "twin did not redirect on the crossing tick"
    );
    let heading = twin.heading().unwrap_or(f64::NAN);
    ensure!(
        (heading - PI).abs() < EPS,
        "redirect heading {heading:.4} should point at the origin"
    );
    ensure!(twin.is_redirecting(), "redirect flag not set");
    ensure!(
        twin.paused_until_ms() == crossing.saturating_add(config.pause_ms),
        "redirect should start a fresh pause"
    );
    ensure!(
        (twin.remaining() - config.redirect_step_distance).abs() < EPS,
        "redirect leg should use the redirect distance"
    );
    Ok(())
}

fn resize_clamp_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure_contained(summary)?;
    let stats = &summary.trace.stats;
    let shrunk = summary
        .sample(SHRINK_FRAME)
        .ok_or_else(|| anyhow::anyhow!("run ended before frame {SHRINK_FRAME}"))?;
    ensure!(
        shrunk.position.x.abs() <= SHRUNK_HALF_WIDTH + stats.max_step + EPS
            && shrunk.position.y.abs() <= SHRUNK_HALF_HEIGHT + stats.max_step + EPS,
        "dot not clamped into the shrunk region"
    );

    let margin = summary.walker.config().boundary_margin;
    ensure!(
        summary.walker.region() == SafeRegion::from_viewport(RESTORED_VIEWPORT, margin),
        "resize did not derive the region from the viewport"
    );

    let mut twin = summary.walker.clone();
    let redirecting = twin.is_redirecting();
    let remaining = twin.remaining();
    let heading = twin.heading();
    let region = twin.region();
    twin.update_bounds(region.half_width / 4.0, region.half_height / 4.0);
    ensure!(
        twin.region().contains(twin.position()),
        "update_bounds left the dot outside"
    );
    ensure!(
        twin.is_redirecting() == redirecting && (twin.remaining() - remaining).abs() < EPS,
        "update_bounds changed the active leg"
    );
    if redirecting {
        let toward_origin = normalize_radians(twin.position().heading_to_origin());
        ensure!(
            twin
                .heading()
                .is_some_and(|h| angle_between(h, toward_origin) < 1e-6),
            "recovery leg no longer points at the origin after update_bounds"
        );
    } else {
        ensure!(twin.heading() == heading, "update_bounds turned the active leg");
    }

    twin.update_bounds(-1.0, f64::NAN);
    ensure!(
        twin.region().half_width >= 0.0 && twin.region().half_height >= 0.0,
        "bad bounds were not floored"
    );
    ensure!(
        twin.position() == Point::ORIGIN,
        "floored region should pin the dot to the origin"
    );
    Ok(())
}

fn angle_between(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(TAU);
    diff.min(TAU - diff)
}

fn invalid_patch() -> ConfigPatch {
    ConfigPatch {
        step_size: Some(-3.0),
        pause_ms: Some(-10),
        min_leg_distance: Some(700.0),
        max_leg_distance: Some(200.0),
        boundary_margin: Some(-1.0),
        redirect_step_distance: Some(f64::NAN),
        dot_size: Some(0.0),
        ..ConfigPatch::default()
    }
}

fn reconfigure_coercion_expectation(summary: &SimulationSummary) -> Result<()> {
    let stats = &summary.trace.stats;
    ensure!(
        stats.rejected_fields == 6,
        "expected 6 rejected fields, got {}",
        stats.rejected_fields
    );

    let initial = summary.initial.config();
    let mut expected = initial.clone();
    expected.step_size = 6.0;
    ensure!(
        summary.walker.config() == &expected,
        "only the valid step size change should apply"
    );
    summary.walker.config().validate()?;
    ensure!(stats.idle_ticks == 0, "rejected settings stopped the walker");

    for sample in &summary.trace.samples {
        let limit = if sample.frame < GOOD_PATCH_FRAME {
            initial.step_size
        } else {
            6.0
        };
        ensure!(
            sample.outcome.step() <= limit + EPS,
            "frame {} stepped {:.2}, limit {limit:.2}",
            sample.frame,
            sample.outcome.step()
        );
    }
    ensure_contained(summary)
}

fn halt_policy_expectation(summary: &SimulationSummary) -> Result<()> {
    let stats = &summary.trace.stats;
    ensure!(stats.redirects == 0, "halt policy produced redirects");
    ensure!(stats.halts > 0, "walker never reached an edge");
    ensure!(
        stats.worst_overshoot <= EPS,
        "halt policy left the region by {:.3}",
        stats.worst_overshoot
    );
    ensure!(!summary.walker.is_redirecting(), "halt policy set the redirect flag");

    let mut awaiting_leg = false;
    for sample in &summary.trace.samples {
        match sample.outcome {
            TickOutcome::Idle | TickOutcome::Paused => {}
            TickOutcome::LegPicked => awaiting_leg = false,
            outcome => {
                ensure!(
                    !awaiting_leg,
                    "frame {} moved after a halt without a fresh leg",
                    sample.frame
                );
                awaiting_leg = matches!(outcome, TickOutcome::Halted { .. });
            }
        }
    }
    Ok(())
}

fn determinism_expectation(summary: &SimulationSummary) -> Result<()> {
    let replay = summary.replay();
    ensure!(
        replay.fingerprint() == summary.fingerprint(),
        "replay fingerprint {:016x} differs from {:016x}",
        replay.fingerprint(),
        summary.fingerprint()
    );
    ensure!(replay.stats == summary.trace.stats, "replay stats differ");

    if summary.trace.stats.advancing_ticks > 0 {
        let other = Walker::new(
            summary.initial.config().clone(),
            summary.initial.region(),
            summary.seed ^ 1,
        )?;
        let other_trace =
            FrameDriver::new(other, summary.frame_ms).run(summary.frames, &summary.script);
        ensure!(
            other_trace.fingerprint() != summary.fingerprint(),
            "a different seed produced an identical trace"
        );
    }
    Ok(())
}

fn fuzz_script(seed: u64, frames: u64) -> Vec<ScriptedEvent> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ FUZZ_SALT);
    let mut events = Vec::new();
    let mut frame = rng.gen_range(10..60);
    while frame < frames {
        let event = match rng.gen_range(0..10) {
            0 => ControlEvent::Bounds {
                half_width: rng.gen_range(-20.0..500.0),
                half_height: rng.gen_range(-20.0..400.0),
            },
            1 => ControlEvent::Resize(Viewport::new(
                rng.gen_range(40.0..1_600.0),
                rng.gen_range(40.0..1_200.0),
            )),
            2 => ControlEvent::Reset,
            _ => ControlEvent::Reconfigure(random_patch(&mut rng)),
        };
        events.push(ScriptedEvent::new(frame, event));
        frame += rng.gen_range(10..90);
    }
    events
}

fn random_patch(rng: &mut ChaCha8Rng) -> ConfigPatch {
    let step = rng.gen_bool(0.4);
    let poison = rng.gen_bool(0.05);
    let pause = rng.gen_bool(0.3);
    let min_leg = rng.gen_bool(0.3);
    let max_leg = rng.gen_bool(0.3);
    let margin = rng.gen_bool(0.2);
    let redirect = rng.gen_bool(0.3);
    let dot = rng.gen_bool(0.2);
    let policy = rng.gen_bool(0.2);
    let scaling = rng.gen_bool(0.2);

    ConfigPatch {
        step_size: if poison {
            Some(f64::NAN)
        } else {
            step.then(|| rng.gen_range(-2.0..25.0))
        },
        pause_ms: pause.then(|| rng.gen_range(-100_i64..1_000)),
        min_leg_distance: min_leg.then(|| rng.gen_range(-50.0..700.0)),
        max_leg_distance: max_leg.then(|| rng.gen_range(-50.0..700.0)),
        boundary_margin: margin.then(|| rng.gen_range(-10.0..80.0)),
        redirect_step_distance: redirect.then(|| rng.gen_range(-10.0..300.0)),
        dot_size: dot.then(|| rng.gen_range(-5.0..60.0)),
        edge_policy: policy.then(|| {
            if rng.gen_bool(0.5) {
                EdgePolicy::Redirect
            } else {
                EdgePolicy::Halt
            }
        }),
        leg_scaling: scaling.then(|| {
            if rng.gen_bool(0.5) {
                LegScaling::Fixed
            } else {
                LegScaling::Viewport
            }
        }),
    }
}

fn fuzz_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure_contained(summary)?;
    summary.walker.config().validate()?;
    ensure!(summary.walker.is_running(), "control traffic stopped the walker");
    ensure!(
        summary.walker.remaining().is_finite() && summary.walker.remaining() >= 0.0,
        "remaining distance went invalid"
    );
    let position = summary.walker.position();
    ensure!(
        position.x.is_finite() && position.y.is_finite(),
        "position went non-finite"
    );
    Ok(())
}
