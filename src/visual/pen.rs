use crate::color::Rgb;
use crate::surface::{LineCap, Surface};
use std::f32::consts::TAU;
use std::ops::{Deref, DerefMut};

const ARC_SEGMENTS_PER_TURN: f32 = 64.0;

/// World-unit drawing front end. Every coordinate, radius and stroke width a
/// preset hands in is mapped to device pixels here and nowhere else.
pub struct Pen<'s> {
    surface: &'s mut dyn Surface,
    dpr: f32,
    offset: (f32, f32),
}

impl<'s> Pen<'s> {
    pub fn new(surface: &'s mut dyn Surface, dpr: f32, offset: (f32, f32)) -> Self {
        let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        Self {
            surface,
            dpr,
            offset,
        }
    }

    #[inline]
    pub fn to_device(&self, (x, y): (f32, f32)) -> (f32, f32) {
        ((x + self.offset.0) * self.dpr, (y + self.offset.1) * self.dpr)
    }

    pub fn dpr(&self) -> f32 {
        self.dpr
    }

    /// Saves surface settings; they are restored when the returned scope drops.
    pub fn scoped(&mut self) -> PenScope<'_, 's> {
        self.surface.save();
        PenScope { pen: self }
    }

    pub fn line_width(&mut self, width: f32) {
        self.surface.set_line_width(width * self.dpr);
    }

    pub fn cap(&mut self, cap: LineCap) {
        self.surface.set_line_cap(cap);
    }

    pub fn dash(&mut self, pattern: &[f32], offset: f32) {
        let scaled: Vec<f32> = pattern.iter().map(|d| d * self.dpr).collect();
        self.surface.set_line_dash(&scaled, offset * self.dpr);
    }

    pub fn dot(&mut self, p: (f32, f32), r: f32, color: Rgb) {
        let (x, y) = self.to_device(p);
        self.surface.fill_circle(x, y, r * self.dpr, color);
    }

    /// One batched fill for every point.
    pub fn dots(&mut self, points: &[(f32, f32)], r: f32, color: Rgb) {
        if points.is_empty() {
            return;
        }
        let device: Vec<(f32, f32)> = points.iter().map(|&p| self.to_device(p)).collect();
        self.surface.fill_circles(&device, r * self.dpr, color);
    }

    pub fn line(&mut self, a: (f32, f32), b: (f32, f32), color: Rgb) {
        let pts = [self.to_device(a), self.to_device(b)];
        self.surface.stroke_polyline(&pts, false, color);
    }

    pub fn polyline(&mut self, points: &[(f32, f32)], closed: bool, color: Rgb) {
        if points.len() < 2 {
            return;
        }
        let device: Vec<(f32, f32)> = points.iter().map(|&p| self.to_device(p)).collect();
        self.surface.stroke_polyline(&device, closed, color);
    }

    /// Stroked arc from `start` to `end` radians (clockwise in screen space).
    pub fn arc(&mut self, center: (f32, f32), r: f32, start: f32, end: f32, color: Rgb) {
        let sweep = end - start;
        if !sweep.is_finite() || sweep.abs() < 1e-6 || r <= 0.0 {
            return;
        }
        let steps = ((sweep.abs() / TAU) * ARC_SEGMENTS_PER_TURN).ceil().max(2.0) as usize;
        let pts: Vec<(f32, f32)> = (0..=steps)
            .map(|k| {
                let a = start + sweep * k as f32 / steps as f32;
                self.to_device((center.0 + r * a.cos(), center.1 + r * a.sin()))
            })
            .collect();
        self.surface.stroke_polyline(&pts, false, color);
    }

    pub fn ring(&mut self, center: (f32, f32), r: f32, color: Rgb) {
        if r <= 0.0 {
            return;
        }
        let (x, y) = self.to_device(center);
        self.surface.stroke_circle(x, y, r * self.dpr, color);
    }

    pub fn rect_outline(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
        self.polyline(&corners, true, color);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        let (dx, dy) = self.to_device((x, y));
        self.surface
            .fill_rect(dx, dy, w * self.dpr, h * self.dpr, color);
    }
}

/// Restores surface settings on drop, including early returns and unwinding.
pub struct PenScope<'p, 's> {
    pen: &'p mut Pen<'s>,
}

impl<'s> Deref for PenScope<'_, 's> {
    type Target = Pen<'s>;

    fn deref(&self) -> &Self::Target {
        &*self.pen
    }
}

impl DerefMut for PenScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.pen
    }
}

impl Drop for PenScope<'_, '_> {
    fn drop(&mut self) {
        self.pen.surface.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCall, RecordingSurface};

    #[test]
    fn maps_world_to_device_once() {
        let mut s = RecordingSurface::new(200, 100);
        {
            let mut pen = Pen::new(&mut s, 2.0, (5.0, -5.0));
            pen.dot((10.0, 20.0), 3.0, Rgb::WHITE);
        }
        assert_eq!(
            s.calls,
            vec![DrawCall::Circles {
                centers: vec![(30.0, 30.0)],
                radius: 6.0,
                color: Rgb::WHITE,
            }]
        );
    }

    #[test]
    fn scope_restores_width_and_dash() {
        let mut s = RecordingSurface::new(10, 10);
        {
            let mut pen = Pen::new(&mut s, 1.5, (0.0, 0.0));
            {
                let mut scoped = pen.scoped();
                scoped.line_width(4.0);
                scoped.dash(&[2.0, 2.0], 1.0);
                scoped.line((0.0, 0.0), (1.0, 1.0), Rgb::WHITE);
            }
            pen.line((0.0, 0.0), (1.0, 1.0), Rgb::WHITE);
        }
        let widths: Vec<f32> = s
            .calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Polyline { style, .. } => Some(style.width),
                _ => None,
            })
            .collect();
        assert_eq!(widths, vec![6.0, 1.0]);
        assert_eq!(s.saves, s.restores);
        assert!(s.style().dash.is_empty());
    }
}
