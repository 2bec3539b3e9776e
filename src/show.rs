//! Frame orchestrator: one call per animation frame ties the beat detector,
//! motion blender and preset engine together.

use crate::audio::AudioFeatures;
use crate::beat::{beat_energy, BeatDetector, DEFAULT_COOLDOWN_MS, DEFAULT_SENSITIVITY};
use crate::color::{contrast_pick, random_swatch, Rgb};
use crate::motion::{MotionBlender, MotionPath};
use crate::surface::Surface;
use crate::visual::{Controls, PresetEngine, RegistryError, RenderContext, Viewport};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Upper bound on a frame's dt, in seconds.
pub const MAX_DT: f32 = 0.1;
const FIRST_DT: f32 = 1.0 / 60.0;

/// Operator switches that are not per-draw controls.
#[derive(Clone, Debug, PartialEq)]
pub struct ShowSettings {
    pub beat_enabled: bool,
    pub sensitivity: f32,
    pub cooldown_ms: f64,
    pub mic_gain: f32,
    pub auto_color: bool,
    pub auto_preset: bool,
    pub blackout: bool,
}

impl Default for ShowSettings {
    fn default() -> Self {
        Self {
            beat_enabled: false,
            sensitivity: DEFAULT_SENSITIVITY,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            mic_gain: 1.0,
            auto_color: false,
            auto_preset: false,
            blackout: false,
        }
    }
}

/// Diagnostics for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub dt: f32,
    pub beat: bool,
    pub energy: f32,
    pub threshold: f32,
    pub offset: (f32, f32),
    pub enabled: bool,
    pub drew: bool,
}

/// Whether the strobe gate is open at `now_ms`. Strobe 0 never closes it.
pub fn strobe_open(now_ms: f64, strobe: f32) -> bool {
    if strobe.is_nan() || strobe <= 0.0 {
        return true;
    }
    let period = (1000.0 - 9.4 * strobe.min(100.0) as f64).max(60.0);
    now_ms.rem_euclid(period) < period * 0.5
}

/// Opacity of the per-frame black clear; higher shading leaves longer trails.
pub fn shading_alpha(shading: f32) -> f32 {
    1.0 - 0.92 * shading.clamp(0.0, 100.0) / 100.0
}

pub struct Show {
    pub controls: Controls,
    pub settings: ShowSettings,
    engine: PresetEngine,
    detector: BeatDetector,
    motion: MotionBlender,
    viewport: Viewport,
    preset: usize,
    last_ms: Option<f64>,
    rng: fastrand::Rng,
    last: FrameReport,
}

impl Show {
    pub fn new(seed: u64) -> Result<Self, RegistryError> {
        Ok(Self::with_engine(PresetEngine::new(seed)?, seed))
    }

    pub fn with_engine(engine: PresetEngine, seed: u64) -> Self {
        Self {
            controls: Controls::default(),
            settings: ShowSettings::default(),
            viewport: engine.viewport(),
            engine,
            detector: BeatDetector::new(),
            motion: MotionBlender::default(),
            preset: 0,
            last_ms: None,
            rng: fastrand::Rng::with_seed(seed ^ 0x5eed_f00d),
            last: FrameReport::default(),
        }
    }

    pub fn engine(&self) -> &PresetEngine {
        &self.engine
    }

    pub fn detector(&self) -> &BeatDetector {
        &self.detector
    }

    pub fn motion(&self) -> &MotionBlender {
        &self.motion
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn last_report(&self) -> FrameReport {
        self.last
    }

    pub fn preset(&self) -> usize {
        self.preset
    }

    pub fn preset_name(&self) -> &'static str {
        self.engine.name(self.preset)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Selects a preset. Out-of-range ids are kept and render as no-ops.
    pub fn set_preset(&mut self, id: usize) {
        if id >= self.engine.len() {
            tracing::warn!(id, "selected preset id is out of range");
        }
        self.preset = id;
    }

    pub fn next_preset(&mut self) {
        self.preset = (self.preset + 1) % self.engine.len().max(1);
    }

    pub fn prev_preset(&mut self) {
        let n = self.engine.len().max(1);
        self.preset = (self.preset % n + n - 1) % n;
    }

    pub fn set_motion(&mut self, path: MotionPath) {
        let now = self.last_ms.unwrap_or(0.0);
        self.motion.set_mode(path, now);
    }

    /// Jumps straight to `path` with no blend, keeping the transition speed.
    pub fn reset_motion(&mut self, path: MotionPath) {
        let transition = self.motion.transition_speed();
        self.motion = MotionBlender::new(path);
        self.motion.set_transition_speed(transition);
    }

    pub fn cycle_motion(&mut self) {
        self.set_motion(self.motion.target().next());
    }

    pub fn cycle_motion_back(&mut self) {
        self.set_motion(self.motion.target().prev());
    }

    pub fn set_transition_speed(&mut self, v: f32) {
        self.motion.set_transition_speed(v);
    }

    /// Toggling beat mode always starts the detector from a clean state.
    pub fn set_beat_mode(&mut self, on: bool) {
        self.settings.beat_enabled = on;
        self.detector.reset();
        tracing::info!(on, "beat mode");
    }

    /// Random color A and the palette color farthest from it as B.
    pub fn shuffle_colors(&mut self) {
        let a = random_swatch(&mut self.rng);
        self.set_colors(a, contrast_pick(a));
    }

    pub fn set_colors(&mut self, a: Rgb, b: Rgb) {
        self.controls.color_a = a;
        self.controls.color_b = b;
    }

    /// Beat policy hook: auto color and auto preset.
    pub fn on_beat(&mut self, now_ms: f64) {
        if self.settings.auto_color {
            self.shuffle_colors();
        }
        if self.settings.auto_preset {
            let n = self.engine.len();
            if n > 1 {
                let mut next = self.rng.usize(..n - 1);
                if next >= self.preset {
                    next += 1;
                }
                self.preset = next;
            }
        }
        tracing::trace!(now_ms, preset = self.preset, "beat");
    }

    /// Runs one frame at `now_ms` (milliseconds since the show started).
    pub fn frame(
        &mut self,
        now_ms: f64,
        features: &AudioFeatures,
        surface: &mut dyn Surface,
    ) -> FrameReport {
        let dt = match self.last_ms {
            Some(prev) => (((now_ms - prev) / 1000.0) as f32).clamp(0.0, MAX_DT),
            None => FIRST_DT,
        };
        self.last_ms = Some(now_ms);

        self.controls.sanitize();
        self.controls.smooth(dt);

        let energy = beat_energy(features, self.settings.mic_gain);
        let beat = self.settings.beat_enabled
            && self.detector.update(
                energy,
                now_ms,
                self.settings.sensitivity,
                self.settings.cooldown_ms,
            );
        if beat {
            self.on_beat(now_ms);
        }

        let offset = self
            .motion
            .compute_offset(now_ms, dt, self.controls.speed, &self.viewport);
        let enabled = !self.settings.blackout && strobe_open(now_ms, self.controls.strobe);

        if enabled {
            surface.clear(Rgb::BLACK, shading_alpha(self.controls.shading));
        } else {
            surface.clear(Rgb::BLACK, 1.0);
        }

        let ctx = RenderContext {
            now_ms,
            dt,
            viewport: self.viewport,
            controls: self.controls,
            offset,
            enabled,
        };
        let engine = &mut self.engine;
        let preset = self.preset;
        let drew = match catch_unwind(AssertUnwindSafe(|| {
            engine.render(preset, features, &ctx, surface)
        })) {
            Ok(drew) => drew,
            Err(_) => {
                tracing::error!(preset, "preset routine panicked; frame dropped");
                false
            }
        };

        self.last = FrameReport {
            dt,
            beat,
            energy,
            threshold: self.detector.threshold(),
            offset,
            enabled,
            drew,
        };
        self.last
    }
}
