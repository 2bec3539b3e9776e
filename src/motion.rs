//! Motion path blender: a drifting offset that cross-fades between named
//! parametric paths.

use crate::visual::Viewport;
use clap::ValueEnum;
use std::f32::consts::TAU;

/// Phase rate at speed 100, in cycles per second.
pub const MAX_CYCLES_PER_SEC: f32 = 0.5;
/// Path radius as a fraction of the smaller drawable side.
pub const RADIUS_FRACTION: f32 = 0.12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MotionPath {
    #[default]
    Off,
    Circle,
    Square,
    Triangle,
}

impl MotionPath {
    pub const fn all() -> [Self; 4] {
        [Self::Off, Self::Circle, Self::Square, Self::Triangle]
    }

    const fn index(self) -> usize {
        match self {
            Self::Off => 0,
            Self::Circle => 1,
            Self::Square => 2,
            Self::Triangle => 3,
        }
    }

    pub fn next(self) -> Self {
        let all = Self::all();
        all[(self.index() + 1) % all.len()]
    }

    pub fn prev(self) -> Self {
        let all = Self::all();
        all[(self.index() + all.len() - 1) % all.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Circle => "Circle",
            Self::Square => "Square",
            Self::Triangle => "Triangle",
        }
    }

    /// Unit-radius position at `phase` (cycles, wrapped into [0, 1)).
    pub fn point(self, phase: f32) -> (f32, f32) {
        let phase = if phase.is_finite() { phase.rem_euclid(1.0) } else { 0.0 };
        match self {
            Self::Off => (0.0, 0.0),
            Self::Circle => {
                let a = phase * TAU;
                (a.cos(), a.sin())
            }
            Self::Square => polygon_point(4, phase),
            Self::Triangle => polygon_point(3, phase),
        }
    }
}

/// Linear interpolation along the edges of a regular polygon inscribed in
/// the unit circle; each edge takes an equal share of the cycle.
fn polygon_point(sides: usize, phase: f32) -> (f32, f32) {
    let pos = phase * sides as f32;
    let k = (pos.floor() as usize).min(sides - 1);
    let t = pos - k as f32;
    let vertex = |i: usize| {
        let a = (i % sides) as f32 * TAU / sides as f32;
        (a.cos(), a.sin())
    };
    let (a, b) = (vertex(k), vertex(k + 1));
    (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t)
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let d = (edge1 - edge0).abs().max(1e-6);
    let t = ((x - edge0) / d).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Blend window in ms for a transition-speed control in 0..=100.
pub fn blend_ms_for(transition: f32) -> f64 {
    let t = if transition.is_finite() { transition.clamp(0.0, 100.0) } else { 0.0 };
    (3000.0 - 27.5 * t) as f64
}

fn one_hot(path: MotionPath) -> [f32; 4] {
    let mut w = [0.0; 4];
    w[path.index()] = 1.0;
    w
}

#[derive(Clone, Debug, PartialEq)]
pub struct MotionBlender {
    phase: f32,
    from: MotionPath,
    to: MotionPath,
    /// Path weights frozen when the current blend started. Equal to
    /// `one_hot(from)` unless a blend was interrupted.
    from_weights: [f32; 4],
    blend_started_ms: f64,
    blending: bool,
    transition: f32,
    offset: (f32, f32),
}

impl Default for MotionBlender {
    fn default() -> Self {
        Self::new(MotionPath::Off)
    }
}

impl MotionBlender {
    pub fn new(path: MotionPath) -> Self {
        Self {
            phase: 0.0,
            from: path,
            to: path,
            from_weights: one_hot(path),
            blend_started_ms: 0.0,
            blending: false,
            transition: 50.0,
            offset: (0.0, 0.0),
        }
    }

    /// Starts blending toward `next`. Returns false when `next` is already
    /// the target.
    pub fn set_mode(&mut self, next: MotionPath, now_ms: f64) -> bool {
        if next == self.to {
            return false;
        }
        self.from_weights = self.weights_at(now_ms);
        self.from = self.to;
        self.to = next;
        self.blend_started_ms = now_ms;
        self.blending = true;
        tracing::debug!(from = self.from.label(), to = next.label(), "motion path retarget");
        true
    }

    pub fn set_transition_speed(&mut self, v: f32) {
        self.transition = if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 };
    }

    pub fn transition_speed(&self) -> f32 {
        self.transition
    }

    pub fn blend_ms(&self) -> f64 {
        blend_ms_for(self.transition)
    }

    /// Eased blend factor in [0, 1]; 1 when not blending.
    pub fn blend_factor(&self, now_ms: f64) -> f32 {
        if !self.blending {
            return 1.0;
        }
        let t = ((now_ms - self.blend_started_ms) / self.blend_ms()) as f32;
        smoothstep(0.0, 1.0, t)
    }

    fn weights_at(&self, now_ms: f64) -> [f32; 4] {
        let e = self.blend_factor(now_ms);
        let target = one_hot(self.to);
        let mut w = [0.0; 4];
        for i in 0..4 {
            w[i] = self.from_weights[i] * (1.0 - e) + target[i] * e;
        }
        w
    }

    /// Advances the phase and returns this frame's offset in world units.
    pub fn compute_offset(
        &mut self,
        now_ms: f64,
        dt: f32,
        speed: f32,
        viewport: &Viewport,
    ) -> (f32, f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let speed = if speed.is_finite() { speed.clamp(0.0, 100.0) } else { 0.0 };
        self.phase = (self.phase + dt * speed / 100.0 * MAX_CYCLES_PER_SEC).rem_euclid(1.0);

        let weights = self.weights_at(now_ms);
        if self.blending && self.blend_factor(now_ms) >= 1.0 {
            self.blending = false;
            self.from = self.to;
            self.from_weights = one_hot(self.to);
        }

        let radius = viewport.min_side() * RADIUS_FRACTION;
        let (mut x, mut y) = (0.0, 0.0);
        for path in MotionPath::all() {
            let w = weights[path.index()];
            if w == 0.0 {
                continue;
            }
            let (px, py) = path.point(self.phase);
            x += w * px;
            y += w * py;
        }
        self.offset = (x * radius, y * radius);
        self.offset
    }

    pub fn offset(&self) -> (f32, f32) {
        self.offset
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn from(&self) -> MotionPath {
        self.from
    }

    pub fn target(&self) -> MotionPath {
        self.to
    }

    pub fn is_blending(&self) -> bool {
        self.blending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_vertices_are_on_unit_circle() {
        let (x, y) = MotionPath::Square.point(0.0);
        assert!((x - 1.0).abs() < 1e-6 && y.abs() < 1e-6);
        let (x, y) = MotionPath::Square.point(0.25);
        assert!(x.abs() < 1e-6 && (y - 1.0).abs() < 1e-6);
        let (x, y) = MotionPath::Triangle.point(0.999_999);
        assert!((x - 1.0).abs() < 1e-3 && y.abs() < 1e-3);
    }

    #[test]
    fn blend_window_shrinks_with_transition_speed() {
        assert_eq!(blend_ms_for(0.0), 3000.0);
        assert_eq!(blend_ms_for(100.0), 250.0);
        assert!(blend_ms_for(20.0) > blend_ms_for(80.0));
    }

    #[test]
    fn cycles_labels() {
        assert_eq!(MotionPath::Triangle.next(), MotionPath::Off);
        assert_eq!(MotionPath::Off.prev(), MotionPath::Triangle);
        assert_eq!(MotionPath::Circle.label(), "Circle");
    }
}
