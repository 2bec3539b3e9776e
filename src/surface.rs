//! Device-pixel drawing surfaces.
//!
//! Presets never talk to a surface directly; they draw through
//! [`crate::visual::Pen`], which converts world units to device pixels and
//! forwards here.

use crate::color::Rgb;
use std::fmt;
use std::ops::{Deref, DerefMut};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Mutable stroke settings covered by `save`/`restore`.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    pub width: f32,
    pub cap: LineCap,
    pub dash: Vec<f32>,
    pub dash_offset: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            cap: LineCap::Butt,
            dash: Vec::new(),
            dash_offset: 0.0,
        }
    }
}

pub trait Surface {
    /// Drawable size in device pixels.
    fn size(&self) -> (u32, u32);
    fn style(&self) -> &StrokeStyle;
    fn save(&mut self);
    fn restore(&mut self);
    fn set_line_width(&mut self, width: f32);
    fn set_line_cap(&mut self, cap: LineCap);
    fn set_line_dash(&mut self, dash: &[f32], offset: f32);
    /// Paints the whole surface with `color` at opacity `alpha` (0..=1).
    fn clear(&mut self, color: Rgb, alpha: f32);
    /// Fills every circle in one batch.
    fn fill_circles(&mut self, centers: &[(f32, f32)], radius: f32, color: Rgb);
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb);
    fn stroke_polyline(&mut self, points: &[(f32, f32)], closed: bool, color: Rgb);
    fn stroke_circle(&mut self, cx: f32, cy: f32, r: f32, color: Rgb);

    fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, color: Rgb) {
        self.fill_circles(&[(cx, cy)], r, color);
    }
}

/// Saves surface settings on creation and restores them when dropped,
/// including during unwinding.
pub struct SurfaceScope<'a> {
    surface: &'a mut dyn Surface,
}

impl<'a> SurfaceScope<'a> {
    pub fn new(surface: &'a mut dyn Surface) -> Self {
        surface.save();
        Self { surface }
    }
}

impl<'a> Deref for SurfaceScope<'a> {
    type Target = dyn Surface + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.surface
    }
}

impl DerefMut for SurfaceScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.surface
    }
}

impl Drop for SurfaceScope<'_> {
    fn drop(&mut self) {
        self.surface.restore();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    ZeroSize { width: u32, height: u32 },
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSize { width, height } => {
                write!(f, "cannot allocate a {width}x{height} pixmap")
            }
        }
    }
}

impl std::error::Error for SurfaceError {}

/// CPU rasterizer backed by a `tiny_skia::Pixmap`.
pub struct PixmapSurface {
    pixmap: tiny_skia::Pixmap,
    style: StrokeStyle,
    stack: Vec<StrokeStyle>,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or(SurfaceError::ZeroSize { width, height })?;
        pixmap.fill(tiny_skia::Color::BLACK);
        Ok(Self {
            pixmap,
            style: StrokeStyle::default(),
            stack: Vec::new(),
        })
    }

    /// Reallocates the pixmap; contents are cleared to black.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        if (width, height) == (self.pixmap.width(), self.pixmap.height()) {
            return Ok(());
        }
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or(SurfaceError::ZeroSize { width, height })?;
        pixmap.fill(tiny_skia::Color::BLACK);
        self.pixmap = pixmap;
        Ok(())
    }

    /// RGBA8 rows. Every frame starts from an opaque clear, so the
    /// premultiplied data equals straight RGB.
    pub fn pixels(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        let p = self.pixmap.pixel(x, y)?;
        Some(Rgb::new(p.red(), p.green(), p.blue()))
    }

    /// Number of pixels whose color is not pure black.
    pub fn lit_pixels(&self) -> usize {
        self.pixmap
            .data()
            .chunks_exact(4)
            .filter(|px| px[0] != 0 || px[1] != 0 || px[2] != 0)
            .count()
    }

    fn paint(color: Rgb, alpha: f32) -> tiny_skia::Paint<'static> {
        let mut paint = tiny_skia::Paint::default();
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        paint.set_color_rgba8(color.r, color.g, color.b, a);
        paint.anti_alias = true;
        paint
    }

    fn stroke(&self) -> tiny_skia::Stroke {
        let dash = if self.style.dash.is_empty() {
            None
        } else {
            tiny_skia::StrokeDash::new(self.style.dash.clone(), self.style.dash_offset)
        };
        tiny_skia::Stroke {
            width: self.style.width.max(0.0),
            line_cap: match self.style.cap {
                LineCap::Butt => tiny_skia::LineCap::Butt,
                LineCap::Round => tiny_skia::LineCap::Round,
                LineCap::Square => tiny_skia::LineCap::Square,
            },
            dash,
            ..Default::default()
        }
    }

    fn stroke_path(&mut self, path: &tiny_skia::Path, color: Rgb) {
        let stroke = self.stroke();
        let paint = Self::paint(color, 1.0);
        self.pixmap.stroke_path(
            path,
            &paint,
            &stroke,
            tiny_skia::Transform::identity(),
            None,
        );
    }
}

impl Surface for PixmapSurface {
    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn style(&self) -> &StrokeStyle {
        &self.style
    }

    fn save(&mut self) {
        self.stack.push(self.style.clone());
    }

    fn restore(&mut self) {
        if let Some(style) = self.stack.pop() {
            self.style = style;
        }
    }

    fn set_line_width(&mut self, width: f32) {
        if width.is_finite() {
            self.style.width = width.max(0.0);
        }
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.style.cap = cap;
    }

    fn set_line_dash(&mut self, dash: &[f32], offset: f32) {
        self.style.dash.clear();
        self.style.dash.extend_from_slice(dash);
        self.style.dash_offset = if offset.is_finite() { offset } else { 0.0 };
    }

    fn clear(&mut self, color: Rgb, alpha: f32) {
        if alpha >= 1.0 {
            self.pixmap
                .fill(tiny_skia::Color::from_rgba8(color.r, color.g, color.b, 255));
            return;
        }
        let (w, h) = self.size();
        let Some(rect) = tiny_skia::Rect::from_xywh(0.0, 0.0, w as f32, h as f32) else {
            return;
        };
        let mut paint = Self::paint(color, alpha);
        paint.anti_alias = false;
        self.pixmap
            .fill_rect(rect, &paint, tiny_skia::Transform::identity(), None);
    }

    fn fill_circles(&mut self, centers: &[(f32, f32)], radius: f32, color: Rgb) {
        if centers.is_empty() || !(radius > 0.0) || !radius.is_finite() {
            return;
        }
        let mut pb = tiny_skia::PathBuilder::new();
        for &(x, y) in centers {
            if x.is_finite() && y.is_finite() {
                pb.push_circle(x, y, radius);
            }
        }
        let Some(path) = pb.finish() else {
            return;
        };
        let paint = Self::paint(color, 1.0);
        self.pixmap.fill_path(
            &path,
            &paint,
            tiny_skia::FillRule::Winding,
            tiny_skia::Transform::identity(),
            None,
        );
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        let Some(rect) = tiny_skia::Rect::from_xywh(x, y, w, h) else {
            return;
        };
        let paint = Self::paint(color, 1.0);
        self.pixmap
            .fill_rect(rect, &paint, tiny_skia::Transform::identity(), None);
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)], closed: bool, color: Rgb) {
        let Some((&(x0, y0), rest)) = points.split_first() else {
            return;
        };
        let mut pb = tiny_skia::PathBuilder::new();
        pb.move_to(x0, y0);
        for &(x, y) in rest {
            pb.line_to(x, y);
        }
        if closed {
            pb.close();
        }
        let Some(path) = pb.finish() else {
            return;
        };
        self.stroke_path(&path, color);
    }

    fn stroke_circle(&mut self, cx: f32, cy: f32, r: f32, color: Rgb) {
        let Some(path) = tiny_skia::PathBuilder::from_circle(cx, cy, r) else {
            return;
        };
        self.stroke_path(&path, color);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Clear {
        color: Rgb,
        alpha: f32,
    },
    Circles {
        centers: Vec<(f32, f32)>,
        radius: f32,
        color: Rgb,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
    },
    Polyline {
        points: Vec<(f32, f32)>,
        closed: bool,
        color: Rgb,
        style: StrokeStyle,
    },
    Ring {
        center: (f32, f32),
        radius: f32,
        color: Rgb,
        style: StrokeStyle,
    },
}

impl DrawCall {
    pub fn color(&self) -> Rgb {
        match self {
            Self::Clear { color, .. }
            | Self::Circles { color, .. }
            | Self::Rect { color, .. }
            | Self::Polyline { color, .. }
            | Self::Ring { color, .. } => *color,
        }
    }
}

/// Records every call instead of rasterizing. Used by the test suites and
/// by diagnostics that only need geometry.
#[derive(Default)]
pub struct RecordingSurface {
    pub width: u32,
    pub height: u32,
    pub calls: Vec<DrawCall>,
    pub saves: usize,
    pub restores: usize,
    pub max_depth: usize,
    style: StrokeStyle,
    stack: Vec<StrokeStyle>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Drops recorded calls and counters; the style stack is left alone.
    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        self.saves = 0;
        self.restores = 0;
        self.max_depth = self.stack.len();
        std::mem::take(&mut self.calls)
    }

    /// Centers of every filled circle, in call order.
    pub fn circle_centers(&self) -> Vec<(f32, f32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Circles { centers, .. } => Some(centers.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn style(&self) -> &StrokeStyle {
        &self.style
    }

    fn save(&mut self) {
        self.saves += 1;
        self.stack.push(self.style.clone());
        self.max_depth = self.max_depth.max(self.stack.len());
    }

    fn restore(&mut self) {
        self.restores += 1;
        if let Some(style) = self.stack.pop() {
            self.style = style;
        }
    }

    fn set_line_width(&mut self, width: f32) {
        self.style.width = width;
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.style.cap = cap;
    }

    fn set_line_dash(&mut self, dash: &[f32], offset: f32) {
        self.style.dash = dash.to_vec();
        self.style.dash_offset = offset;
    }

    fn clear(&mut self, color: Rgb, alpha: f32) {
        self.calls.push(DrawCall::Clear { color, alpha });
    }

    fn fill_circles(&mut self, centers: &[(f32, f32)], radius: f32, color: Rgb) {
        self.calls.push(DrawCall::Circles {
            centers: centers.to_vec(),
            radius,
            color,
        });
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.calls.push(DrawCall::Rect { x, y, w, h, color });
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)], closed: bool, color: Rgb) {
        self.calls.push(DrawCall::Polyline {
            points: points.to_vec(),
            closed,
            color,
            style: self.style.clone(),
        });
    }

    fn stroke_circle(&mut self, cx: f32, cy: f32, r: f32, color: Rgb) {
        self.calls.push(DrawCall::Ring {
            center: (cx, cy),
            radius: r,
            color,
            style: self.style.clone(),
        });
    }
}
