use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;

use dotwalk_core::{
    ConfigPatch, DEFAULT_FRAME_INTERVAL_MS, EdgePolicy, Viewport, Walker, WalkerConfig,
};

use super::driver::{ControlEvent, FrameDriver, FrameSample, RunTrace, ScriptedEvent};

pub const DEFAULT_FRAMES: u64 = 3_600;
pub const DEFAULT_VIEWPORT: Viewport = Viewport::new(800.0, 600.0);

/// Shared run settings coming from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub config: WalkerConfig,
    pub viewport: Viewport,
    pub frames: u64,
    pub frame_ms: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            config: WalkerConfig::default(),
            viewport: DEFAULT_VIEWPORT,
            frames: DEFAULT_FRAMES,
            frame_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

/// Builds the control script for one seed and frame count.
pub type ScriptBuilder = fn(u64, u64) -> Vec<ScriptedEvent>;

/// Everything a scenario needs to drive one walker run.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub patch: ConfigPatch,
    pub min_frames: Option<u64>,
    pub setup: Option<fn(&mut Walker)>,
    pub script: Vec<ScriptedEvent>,
    pub script_builder: Option<ScriptBuilder>,
    pub expectations: Vec<SimulationExpectation>,
}

impl Default for SimulationPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationPlan {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patch: ConfigPatch::default(),
            min_frames: None,
            setup: None,
            script: Vec::new(),
            script_builder: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_patch(mut self, patch: ConfigPatch) -> Self {
        self.patch = patch;
        self
    }

    #[must_use]
    pub const fn with_min_frames(mut self, frames: u64) -> Self {
        self.min_frames = Some(frames);
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut Walker)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_event(mut self, frame: u64, event: ControlEvent) -> Self {
        self.script.push(ScriptedEvent::new(frame, event));
        self
    }

    #[must_use]
    pub fn with_script_builder(mut self, builder: ScriptBuilder) -> Self {
        self.script_builder = Some(builder);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }

    #[must_use]
    pub fn frames_for(&self, requested: u64) -> u64 {
        self.min_frames.map_or(requested, |min| requested.max(min))
    }

    /// Full control script: a start on frame zero, then the plan's own events.
    #[must_use]
    pub fn script_for(&self, seed: u64, frames: u64) -> Vec<ScriptedEvent> {
        let mut script = Vec::with_capacity(self.script.len() + 1);
        script.push(ScriptedEvent::new(0, ControlEvent::Start));
        script.extend(self.script.iter().cloned());
        if let Some(builder) = self.script_builder {
            script.extend(builder(seed, frames));
        }
        script
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Check the expectation against a finished run.
    ///
    /// # Errors
    ///
    /// Returns the expectation's failure message.
    pub fn check(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

/// Outcome of one plan run, handed to expectations.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub frames: u64,
    pub frame_ms: u64,
    /// Walker as it was after setup, before the first frame.
    pub initial: Walker,
    /// Walker after the last frame.
    pub walker: Walker,
    pub script: Vec<ScriptedEvent>,
    pub trace: RunTrace,
}

impl SimulationSummary {
    /// Run the same script again from the initial walker.
    #[must_use]
    pub fn replay(&self) -> RunTrace {
        FrameDriver::new(self.initial.clone(), self.frame_ms).run(self.frames, &self.script)
    }

    #[must_use]
    pub fn sample(&self, frame: u64) -> Option<&FrameSample> {
        usize::try_from(frame)
            .ok()
            .and_then(|idx| self.trace.samples.get(idx))
    }

    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        self.trace.fingerprint()
    }
}

/// Runs plans against freshly built walkers.
#[derive(Debug, Clone)]
pub struct Simulator {
    settings: SimulationSettings,
    verbose: bool,
}

impl Simulator {
    #[must_use]
    pub const fn new(settings: SimulationSettings, verbose: bool) -> Self {
        Self { settings, verbose }
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Build a walker for `seed`, apply the plan and drive it.
    ///
    /// `policy` comes from a replay code and overrides the base configuration
    /// before the plan's own patch.
    ///
    /// # Errors
    ///
    /// Fails when the plan's patch is rejected or the walker cannot be built
    /// for the configured viewport.
    pub fn run_plan(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        policy: Option<EdgePolicy>,
    ) -> Result<SimulationSummary> {
        let mut base = self.settings.config.clone();
        if let Some(policy) = policy {
            base.edge_policy = policy;
        }
        let report = plan.patch.apply_to(&base);
        if let Some(err) = report.rejected.first() {
            anyhow::bail!("scenario configuration rejected: {err}");
        }

        let mut walker = Walker::with_viewport(report.config, self.settings.viewport, seed)
            .with_context(|| {
                format!(
                    "failed to build walker for viewport {}x{}",
                    self.settings.viewport.width, self.settings.viewport.height
                )
            })?;
        if let Some(setup) = plan.setup {
            setup(&mut walker);
        }
        let initial = walker.clone();

        let frames = plan.frames_for(self.settings.frames);
        let script = plan.script_for(seed, frames);
        let mut driver = FrameDriver::new(walker, self.settings.frame_ms);
        let trace = driver.run(frames, &script);

        Ok(SimulationSummary {
            seed,
            frames,
            frame_ms: driver.frame_ms(),
            initial,
            walker: driver.walker().clone(),
            script,
            trace,
        })
    }
}
