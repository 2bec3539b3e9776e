use super::layout::RandomLayoutCache;
use super::pen::Pen;
use super::spotlight::Spotlight;
use super::RenderContext;
use crate::audio::AudioFeatures;
use crate::color::{alternate, alternation_slot, Rgb};
use std::f32::consts::TAU;

/// Scroll accumulators restart this far before the visible edge.
pub const SCROLL_MARGIN: f32 = 50.0;

/// Brightness-scaled colors for the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Inks {
    pub a: Rgb,
    pub b: Rgb,
    pub multicolor: bool,
}

impl Inks {
    pub fn from_context(ctx: &RenderContext) -> Self {
        let k = ctx.controls.brightness / 100.0;
        Self {
            a: ctx.controls.color_a.scaled(k),
            b: ctx.controls.color_b.scaled(k),
            multicolor: ctx.controls.multicolor,
        }
    }

    /// Color for element `index` under the shared alternation rule.
    #[inline]
    pub fn ink(&self, index: usize) -> Rgb {
        alternate(index, self.multicolor, self.a, self.b)
    }

    /// 0 or 1: which color group element `index` belongs to.
    #[inline]
    pub fn group(&self, index: usize) -> usize {
        alternation_slot(index, self.multicolor)
    }

    /// Color B when multicolor is on, else A.
    pub fn second(&self) -> Rgb {
        self.ink(1)
    }
}

/// Everything a preset routine may touch while drawing one frame.
///
/// Fields are public so a routine can hold a scoped pen while reading the
/// context or mutating the layout cache.
pub struct Stage<'a> {
    pub ctx: &'a RenderContext,
    pub audio: &'a AudioFeatures,
    pub inks: Inks,
    pub pen: Pen<'a>,
    pub layout: &'a mut RandomLayoutCache,
    pub spotlights: &'a mut [Spotlight],
    pub rng: &'a mut fastrand::Rng,
    /// `dt * 60`: one 60 Hz frame advances accumulators by exactly one step.
    pub fs: f32,
}

impl Stage<'_> {
    pub fn width(&self) -> f32 {
        self.ctx.viewport.width
    }

    pub fn height(&self) -> f32 {
        self.ctx.viewport.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width() * 0.5, self.height() * 0.5)
    }

    pub fn speed(&self) -> f32 {
        self.ctx.controls.speed
    }

    /// Size control mapped to 0..=1.
    pub fn size01(&self) -> f32 {
        self.ctx.controls.size / 100.0
    }

    pub fn now_ms(&self) -> f64 {
        self.ctx.now_ms
    }

    /// Uniform point inside the drawable area inset by `margin`.
    pub fn random_point(&mut self, margin: f32) -> (f32, f32) {
        let w = self.width();
        let h = self.height();
        let mx = margin.min(w * 0.5);
        let my = margin.min(h * 0.5);
        (
            mx + self.rng.f32() * (w - 2.0 * mx).max(0.0),
            my + self.rng.f32() * (h - 2.0 * my).max(0.0),
        )
    }
}

/// Angle of element `i` on an `n`-point ring rotated by `phase`.
#[inline]
pub fn ring_angle(i: usize, n: usize, phase: f32) -> f32 {
    i as f32 * TAU / n.max(1) as f32 + phase
}

pub fn ring_point(center: (f32, f32), radius: f32, angle: f32) -> (f32, f32) {
    (center.0 + radius * angle.cos(), center.1 + radius * angle.sin())
}

/// Re-randomization interval in ms; speed 0 never refreshes.
pub fn randomize_interval(speed: f32, k: f32) -> f64 {
    if speed <= 0.0 {
        f64::INFINITY
    } else {
        (1000.0 - k as f64 * speed as f64).max(0.0)
    }
}

pub fn refresh_due(now_ms: f64, last_ms: f64, speed: f32, k: f32) -> bool {
    let interval = randomize_interval(speed, k);
    interval.is_finite() && now_ms - last_ms >= interval
}

/// `phase += speed / divisor * fs`, kept in `[0, TAU)`.
pub fn advance_phase(phase: f32, speed: f32, divisor: f32, fs: f32) -> f32 {
    (phase + speed / divisor * fs).rem_euclid(TAU)
}

/// Steps a scroll accumulator, wrapping to `-SCROLL_MARGIN` once it reaches
/// `extent - SCROLL_MARGIN`. The result stays in `[-50, extent - 50)`.
pub fn advance_scroll(m: f32, step: f32, extent: f32) -> f32 {
    let limit = extent - SCROLL_MARGIN;
    let next = m + step.max(0.0);
    if !next.is_finite() || next >= limit || next < -SCROLL_MARGIN {
        -SCROLL_MARGIN
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_infinite_at_speed_zero() {
        assert!(randomize_interval(0.0, 10.0).is_infinite());
        assert_eq!(randomize_interval(50.0, 10.0), 500.0);
        assert_eq!(randomize_interval(100.0, 10.0), 0.0);
        assert_eq!(randomize_interval(100.0, 9.5), 50.0);
        assert!(!refresh_due(1e12, 0.0, 0.0, 10.0));
        assert!(refresh_due(500.0, 0.0, 50.0, 10.0));
        assert!(!refresh_due(499.0, 0.0, 50.0, 10.0));
    }

    #[test]
    fn scroll_wraps_before_extent() {
        let mut m = -SCROLL_MARGIN;
        for i in 0..10_000 {
            m = advance_scroll(m, (i % 101) as f32 * 0.2, 300.0);
            assert!((-SCROLL_MARGIN..250.0).contains(&m), "m={m}");
        }
    }

    #[test]
    fn phase_wraps() {
        let p = advance_phase(TAU - 0.01, 100.0, 1000.0, 1.0);
        assert!((0.0..TAU).contains(&p));
        assert!((p - 0.09).abs() < 1e-4);
    }
}
