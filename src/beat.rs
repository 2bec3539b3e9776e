//! Adaptive-threshold onset detector over a per-frame energy stream.

use crate::audio::AudioFeatures;

/// EMA smoothing factor shared by the mean and the deviation estimate.
pub const ALPHA: f32 = 0.06;

pub const DEFAULT_SENSITIVITY: f32 = 0.6;
pub const DEFAULT_COOLDOWN_MS: f64 = 120.0;

#[derive(Clone, Debug, PartialEq)]
pub struct BeatDetector {
    ema: f32,
    dev: f32,
    prev: f32,
    last_beat_ms: f64,
    threshold: f32,
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn clamp01(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

impl BeatDetector {
    pub fn new() -> Self {
        Self {
            ema: 0.0,
            dev: 0.0,
            prev: 0.0,
            last_beat_ms: f64::NEG_INFINITY,
            threshold: 0.0,
        }
    }

    /// Feeds one energy sample; returns true when it is accepted as a beat.
    ///
    /// The threshold is computed from the statistics before this sample, then
    /// the statistics absorb the sample whether or not it fired.
    pub fn update(
        &mut self,
        energy: f32,
        now_ms: f64,
        sensitivity: f32,
        min_interval_ms: f64,
    ) -> bool {
        let e = if energy.is_finite() { energy.max(0.0) } else { 0.0 };
        let s = clamp01(sensitivity);
        self.threshold = self.threshold_for(s);
        let gate = lerp(0.12, 0.03, s);

        let cooled = now_ms - self.last_beat_ms >= min_interval_ms.max(0.0);
        let rising = e > self.prev;
        let fired = cooled && rising && e > self.threshold && e > gate;
        if fired {
            self.last_beat_ms = now_ms;
        }

        self.dev += ALPHA * ((e - self.ema).abs() - self.dev);
        self.ema += ALPHA * (e - self.ema);
        self.prev = e;
        fired
    }

    /// Threshold the current statistics give at `sensitivity` (0..=1).
    pub fn threshold_for(&self, sensitivity: f32) -> f32 {
        let s = clamp01(sensitivity);
        let k = lerp(2.2, 0.6, s);
        let base = lerp(0.030, 0.008, s);
        self.ema + k * (self.dev * 1.10 + base)
    }

    /// Threshold computed by the last `update`.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn ema(&self) -> f32 {
        self.ema
    }

    pub fn dev(&self) -> f32 {
        self.dev
    }

    pub fn last_beat_ms(&self) -> f64 {
        self.last_beat_ms
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Energy handed to the detector: `clamp(0.75 bass + 0.25 amplitude) * gain`.
pub fn beat_energy(features: &AudioFeatures, mic_gain: f32) -> f32 {
    let raw = 0.75 * features.bass + 0.25 * features.amplitude;
    let raw = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };
    let gain = if mic_gain.is_finite() { mic_gain.max(0.0) } else { 0.0 };
    raw * gain
}
