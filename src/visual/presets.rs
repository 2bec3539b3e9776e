use super::layout::LAYOUT_POINTS;
use super::stage::{
    advance_phase, advance_scroll, refresh_due, ring_angle, ring_point, Stage, SCROLL_MARGIN,
};
use super::{PresetDef, PresetSlot};
use crate::color::Rgb;
use crate::surface::LineCap;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

impl PresetDef {
    const fn plain(id: usize, name: &'static str, draw: super::DrawFn) -> Self {
        Self {
            id,
            name,
            draw,
            reseed_on_activate: false,
            free_spin: None,
        }
    }

    const fn reseeding(mut self) -> Self {
        self.reseed_on_activate = true;
        self
    }

    const fn spinning(mut self, divisor: f32) -> Self {
        self.free_spin = Some(divisor);
        self
    }
}

pub fn make_presets() -> Vec<PresetDef> {
    vec![
        PresetDef::plain(0, "Ring (sin)", ring_sin),
        PresetDef::plain(1, "Ring (rot)", ring_rot),
        PresetDef::plain(2, "3 Rings", three_rings),
        PresetDef::plain(3, "Rand Lines", rand_lines),
        PresetDef::plain(4, "Rand Ring", rand_ring),
        PresetDef::plain(5, "Rand Dots", rand_dots).reseeding(),
        PresetDef::plain(6, "Scan H", scan_h),
        PresetDef::plain(7, "Scan V", scan_v),
        PresetDef::plain(8, "Discoball", discoball).reseeding(),
        PresetDef::plain(9, "Twinkle", twinkle).reseeding(),
        PresetDef::plain(10, "Rotor", rotor),
        PresetDef::plain(11, "Fan", fan),
        PresetDef::plain(12, "Grid", grid),
        PresetDef::plain(13, "Zigzag", zigzag),
        PresetDef::plain(14, "PingPong", ping_pong),
        PresetDef::plain(15, "Rand Rects", rand_rects),
        PresetDef::plain(16, "Spiral", spiral),
        PresetDef::plain(17, "Wave", wave),
        PresetDef::plain(18, "Double Wave", double_wave),
        PresetDef::plain(19, "Radar", radar),
        PresetDef::plain(20, "Half Arc", half_arc),
        PresetDef::plain(21, "Ripple", ripple),
        PresetDef::plain(22, "Beams", beams),
        PresetDef::plain(23, "Flower", flower),
        PresetDef::plain(24, "Lissajous", lissajous),
        PresetDef::plain(25, "Orbit Dots", orbit_dots),
        PresetDef::plain(26, "Checker", checker),
        PresetDef::plain(27, "Rain", rain).reseeding(),
        PresetDef::plain(28, "Star", star),
        PresetDef::plain(29, "Tunnel Rect", tunnel_rect),
        PresetDef::plain(30, "Helix", helix),
        PresetDef::plain(31, "Quad LED", quad_led),
        PresetDef::plain(32, "Spin Circle", spin_circle),
        PresetDef::plain(33, "Spin Square", spin_square).spinning(3000.0),
        PresetDef::plain(34, "Spin Triangle", spin_triangle).spinning(2400.0),
    ]
}

const RING_DOTS: usize = 18;

fn dot_radius(st: &Stage<'_>) -> f32 {
    3.0 + 9.0 * st.size01()
}

fn stroke_width(st: &Stage<'_>) -> f32 {
    2.0 + 6.0 * st.size01()
}

/// Redraws the first `count` endpoints when the speed-dependent interval has
/// elapsed (or on first use). Returns whether a refresh happened.
fn refresh_ends(st: &mut Stage<'_>, slot: &mut PresetSlot, k: f32, margin: f32, count: usize) -> bool {
    let now = st.now_ms();
    if slot.seeded && !refresh_due(now, slot.randomized_at, st.speed(), k) {
        return false;
    }
    for i in 0..count.min(slot.ends.len()) {
        slot.ends[i] = st.random_point(margin);
    }
    slot.randomized_at = now;
    slot.seeded = true;
    true
}

fn ring_sin(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.phase = advance_phase(slot.phase, st.speed(), 1200.0, st.fs);
    let c = st.center();
    let r = st.height() * 0.38 * st.size01();
    let d = dot_radius(st);
    let wave = slot.phase * 3.0;
    for i in 0..RING_DOTS {
        let w = (wave + 0.35 * i as f32).sin();
        let p = ring_point(c, r * (1.0 + 0.12 * w), ring_angle(i, RING_DOTS, slot.phase));
        let ink = st.inks.ink(i);
        st.pen.dot(p, d * (1.0 + 0.3 * w), ink);
    }
}

fn ring_rot(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.phase = advance_phase(slot.phase, st.speed(), 800.0, st.fs);
    let c = st.center();
    let r = st.height() * 0.38 * st.size01();
    let d = dot_radius(st);
    for i in 0..RING_DOTS {
        let p = ring_point(c, r, ring_angle(i, RING_DOTS, slot.phase));
        let ink = st.inks.ink(i);
        st.pen.dot(p, d, ink);
    }
}

fn three_rings(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const RINGS: [(f32, usize, f32, f32); 3] = [
        // radius fraction, dots, dot size, signed rate
        (0.42, 24, 5.0, 0.8),
        (0.28, 16, 7.0, -1.0),
        (0.14, 8, 9.0, 1.4),
    ];
    // 5 turns is the shortest period after which every rate lands on a whole turn.
    slot.phase = (slot.phase + st.speed() / 700.0 * st.fs).rem_euclid(5.0 * TAU);
    let c = st.center();
    let h = st.height() * st.size01();
    let grow = 0.5 + st.size01();
    for (j, &(frac, n, dot, rate)) in RINGS.iter().enumerate() {
        let ink = st.inks.ink(j);
        let pts: Vec<(f32, f32)> = (0..n)
            .map(|i| ring_point(c, h * frac, ring_angle(i, n, slot.phase * rate)))
            .collect();
        st.pen.dots(&pts, dot * grow, ink);
    }
}

fn rand_lines(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    refresh_ends(st, slot, 10.0, 40.0, 4);
    let width = stroke_width(st);
    let three = st.size01() >= 0.5;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    pen.cap(LineCap::Round);
    if three {
        for i in 0..3 {
            pen.line(slot.ends[i], slot.ends[i + 1], st.inks.ink(i));
        }
    } else {
        pen.line(slot.ends[0], slot.ends[1], st.inks.a);
    }
}

fn rand_ring(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    if refresh_ends(st, slot, 9.5, 60.0, 1) {
        slot.ends[1] = (st.rng.f32() * TAU, 0.0);
    }
    slot.phase = advance_phase(slot.phase, st.speed(), 1000.0, st.fs);
    let r = (st.height() * 0.3 * st.size01()).max(10.0);
    let width = stroke_width(st);
    let start = slot.ends[1].0 + slot.phase;
    let center = slot.ends[0];
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    if inks.multicolor {
        let arc = TAU / 8.0;
        for k in 0..8 {
            let a0 = start + k as f32 * arc;
            pen.arc(center, r, a0, a0 + arc, inks.ink(k));
        }
    } else {
        pen.arc(center, r, start, start + TAU, inks.a);
    }
}

fn rand_dots(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    let now = st.now_ms();
    if refresh_due(now, slot.randomized_at, st.speed(), 10.0) {
        let (w, h) = (st.width(), st.height());
        st.layout.regenerate(w, h, &mut *st.rng);
        slot.randomized_at = now;
    }
    let count = (50.0 + 450.0 * st.size01()).round() as usize;
    let r = 2.0 + 4.0 * st.size01();
    let mut groups: [Vec<(f32, f32)>; 2] = Default::default();
    for i in 0..count {
        groups[st.inks.group(i)].push(st.layout.point(i));
    }
    draw_groups(st, &groups, r);
}

/// One batched fill per alternation color.
fn draw_groups(st: &mut Stage<'_>, groups: &[Vec<(f32, f32)>; 2], r: f32) {
    for (g, pts) in groups.iter().enumerate() {
        let ink = st.inks.ink(g);
        st.pen.dots(pts, r, ink);
    }
}

fn scan_h(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.scroll = advance_scroll(slot.scroll, 0.2 * st.speed() * st.fs, st.width());
    let bars = 1 + (3.0 * st.size01()).floor() as usize;
    let bar_w = 10.0 + 30.0 * st.size01();
    let h = st.height();
    for k in 0..bars {
        let x = slot.scroll - k as f32 * 120.0;
        let ink = st.inks.ink(k);
        st.pen.fill_rect(x, 0.0, bar_w, h, ink);
    }
}

fn scan_v(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.scroll = advance_scroll(slot.scroll, 0.15 * st.speed() * st.fs, st.height());
    let bars = 1 + (3.0 * st.size01()).floor() as usize;
    let bar_h = 10.0 + 30.0 * st.size01();
    let w = st.width();
    for k in 0..bars {
        let y = slot.scroll - k as f32 * 120.0;
        let ink = st.inks.ink(k);
        st.pen.fill_rect(0.0, y, w, bar_h, ink);
    }
}

fn discoball(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.phase = advance_phase(slot.phase, st.speed(), 1500.0, st.fs);
    let (cx, cy) = st.center();
    let radius = (st.height() * 0.45 * st.size01()).max(4.0);
    let dot = 1.5 + 2.5 * st.size01();
    let (lw, lh) = st.layout.extent();
    let mut groups: [Vec<(f32, f32)>; 2] = Default::default();
    for i in 0..LAYOUT_POINTS {
        let (x, y) = st.layout.point(i);
        let lon = x / lw * TAU + slot.phase;
        let lat = (2.0 * y / lh - 1.0).clamp(-1.0, 1.0).asin();
        let z = lat.cos() * lon.cos();
        if z <= 0.0 {
            continue;
        }
        let p = (cx + radius * lat.cos() * lon.sin(), cy + radius * lat.sin());
        groups[st.inks.group(i)].push(p);
    }
    draw_groups(st, &groups, dot);
}

fn twinkle(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const LEVELS: usize = 4;
    slot.phase = advance_phase(slot.phase, st.speed(), 300.0, st.fs);
    let count = (200.0 + 300.0 * st.size01()).round() as usize;
    let r = 1.5 + 3.0 * st.size01();
    let mut groups: [Vec<(f32, f32)>; 2 * LEVELS] = Default::default();
    for i in 0..count {
        let level = 0.5 + 0.5 * (slot.phase + i as f32 * 1.7).sin();
        let bucket = ((level * LEVELS as f32) as usize).min(LEVELS - 1);
        groups[st.inks.group(i) * LEVELS + bucket].push(st.layout.point(i));
    }
    for (g, pts) in groups.iter().enumerate() {
        let (parity, bucket) = (g / LEVELS, g % LEVELS);
        let k = 0.25 + 0.75 * bucket as f32 / (LEVELS - 1) as f32;
        let ink = st.inks.ink(parity).scaled(k);
        st.pen.dots(pts, r, ink);
    }
}

fn rotor(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.phase = advance_phase(slot.phase, st.speed(), 1000.0, st.fs);
    let n = 2 + (4.0 * st.size01()).floor() as usize;
    let c = st.center();
    let len = st.height().min(st.width()) * 0.45;
    let width = 3.0 + 5.0 * st.size01();
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    for k in 0..n {
        let a = k as f32 * PI / n as f32 + slot.phase;
        let (dx, dy) = (len * a.cos(), len * a.sin());
        pen.line((c.0 - dx, c.1 - dy), (c.0 + dx, c.1 + dy), inks.ink(k));
    }
}

fn fan(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.phase = advance_phase(slot.phase, st.speed(), 600.0, st.fs);
    let origin = (st.width() * 0.5, st.height());
    let len = st.height() * (0.5 + 0.5 * st.size01());
    let sweep = 0.6 * slot.phase.sin();
    let width = stroke_width(st);
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    pen.cap(LineCap::Round);
    for k in 0..7 {
        let a = -FRAC_PI_2 + (k as f32 - 3.0) * 0.25 + sweep;
        let tip = (origin.0 + len * a.cos(), origin.1 + len * a.sin());
        pen.line(origin, tip, inks.ink(k));
    }
}

fn grid(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const SPACING: f32 = 80.0;
    slot.scroll = advance_scroll(slot.scroll, 0.1 * st.speed() * st.fs, st.width());
    let shift = (slot.scroll + SCROLL_MARGIN).rem_euclid(SPACING);
    let cols = (st.width() / SPACING).ceil() as usize + 2;
    let rows = (st.height() / SPACING).ceil() as usize + 1;
    let r = 3.0 + 10.0 * st.size01();
    let mut groups: [Vec<(f32, f32)>; 2] = Default::default();
    for row in 0..rows {
        for col in 0..cols {
            let p = (
                col as f32 * SPACING - SPACING + shift,
                row as f32 * SPACING + SPACING * 0.5,
            );
            groups[st.inks.group(row + col)].push(p);
        }
    }
    draw_groups(st, &groups, r);
}

fn zigzag(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const STEP: f32 = 40.0;
    slot.scroll = advance_scroll(slot.scroll, 0.15 * st.speed() * st.fs, st.width());
    let amp = 0.3 * st.height() * st.size01();
    let mid = st.height() * 0.5;
    let shift = (slot.scroll + SCROLL_MARGIN).rem_euclid(2.0 * STEP);
    let n = (st.width() / STEP).ceil() as usize + 5;
    let upper: Vec<(f32, f32)> = (0..n)
        .map(|k| {
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            (k as f32 * STEP - 2.0 * STEP + shift, mid + sign * amp)
        })
        .collect();
    let width = stroke_width(st);
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    pen.polyline(&upper, false, inks.a);
    if inks.multicolor {
        let mirrored: Vec<(f32, f32)> = upper.iter().map(|&(x, y)| (x, 2.0 * mid - y)).collect();
        pen.polyline(&mirrored, false, inks.b);
    }
}

fn ping_pong(st: &mut Stage<'_>, _slot: &mut PresetSlot) {
    let count = (4.0 + 8.0 * st.size01()).round() as usize;
    let (w, h) = (st.width(), st.height());
    let (speed, size, fs) = (st.speed(), st.ctx.controls.size, st.fs);
    let count = count.min(st.spotlights.len());
    for (i, ball) in st.spotlights.iter_mut().take(count).enumerate() {
        ball.step(w, h, speed, size, fs);
        st.pen.dot((ball.x, ball.y), ball.r, st.inks.ink(i));
    }
}

fn rand_rects(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    refresh_ends(st, slot, 9.5, 20.0, 4);
    let width = stroke_width(st);
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    for k in 0..2 {
        let (a, b) = (slot.ends[2 * k], slot.ends[2 * k + 1]);
        let (x, y) = (a.0.min(b.0), a.1.min(b.1));
        pen.rect_outline(x, y, (a.0 - b.0).abs(), (a.1 - b.1).abs(), inks.ink(k));
    }
}

fn spiral(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const DOTS: usize = 60;
    slot.phase = advance_phase(slot.phase, st.speed(), 900.0, st.fs);
    let c = st.center();
    let reach = st.height().min(st.width()) * 0.45 * st.size01();
    let grow = 4.0 * st.size01();
    for i in 0..DOTS {
        let t = i as f32 / DOTS as f32;
        let p = ring_point(c, reach * t, i as f32 * 0.35 + slot.phase);
        let ink = st.inks.ink(i);
        st.pen.dot(p, 2.0 + grow * t, ink);
    }
}

fn sine_points(st: &Stage<'_>, phase: f32) -> Vec<(f32, f32)> {
    const SAMPLES: usize = 96;
    let (w, h) = (st.width(), st.height());
    let amp = 0.35 * h * st.size01();
    (0..=SAMPLES)
        .map(|k| {
            let x = w * k as f32 / SAMPLES as f32;
            (x, h * 0.5 + amp * (2.0 * TAU * x / w + phase).sin())
        })
        .collect()
}

fn wave(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.phase = advance_phase(slot.phase, st.speed(), 500.0, st.fs);
    let pts = sine_points(st, slot.phase);
    let width = stroke_width(st);
    let ink = st.inks.a;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    pen.polyline(&pts, false, ink);
}

fn double_wave(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.phase = advance_phase(slot.phase, st.speed(), 650.0, st.fs);
    let first = sine_points(st, slot.phase);
    let second = sine_points(st, slot.phase + PI);
    let width = stroke_width(st);
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    pen.polyline(&first, false, inks.ink(0));
    pen.polyline(&second, false, inks.ink(1));
}

fn radar(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.phase = advance_phase(slot.phase, st.speed(), 700.0, st.fs);
    let c = st.center();
    let r = (st.height().min(st.width()) * 0.45 * st.size01()).max(8.0);
    let width = stroke_width(st);
    let inks = st.inks;
    let tip = ring_point(c, r, slot.phase);
    let mut pen = st.pen.scoped();
    pen.line_width(width * 0.5);
    pen.ring(c, r, inks.second());
    pen.line_width(width);
    pen.line(c, tip, inks.a);
    pen.arc(c, r * 0.9, slot.phase - 0.6, slot.phase, inks.a);
}

fn half_arc(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    // origin, start angle
    let (w, h) = (st.width(), st.height());
    let origins = [
        ((0.0, h * 0.5), -FRAC_PI_2),
        ((w * 0.5, h), PI),
        ((0.0, 0.0), 0.0),
        ((w, h), PI),
    ];
    let reach = w.min(h) * (0.5 + 0.5 * st.size01());
    if !slot.seeded {
        slot.pick = st.rng.usize(..origins.len());
        slot.extent = reach * (0.3 + 0.6 * st.rng.f32());
        slot.seeded = true;
    }
    slot.step += st.speed() / 20.0 * st.fs;
    if slot.step >= 100.0 {
        slot.step = 0.0;
        slot.pick = st.rng.usize(..origins.len());
        slot.extent = reach * (0.3 + 0.6 * st.rng.f32());
    }
    let (origin, start) = origins[slot.pick % origins.len()];
    let sweep = PI * slot.step / 100.0;
    let width = 3.0 + 6.0 * st.size01();
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    pen.arc(origin, slot.extent, start, start + sweep, inks.a);
    pen.arc(origin, slot.extent * 0.6, start, start + sweep, inks.second());
}

fn ripple(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    let reach = st.height().min(st.width()) * 0.5;
    slot.scroll = advance_scroll(slot.scroll, 0.2 * st.speed() * st.fs, reach);
    let n = 3 + (5.0 * st.size01()).floor() as usize;
    let c = st.center();
    let width = 2.0 + 4.0 * st.size01();
    let base = slot.scroll + SCROLL_MARGIN;
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    for k in 0..n {
        let r = (base + k as f32 * reach / n as f32).rem_euclid(reach);
        pen.ring(c, r, inks.ink(k));
    }
}

fn beams(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    refresh_ends(st, slot, 10.0, 40.0, 1);
    let (w, h) = (st.width(), st.height());
    let target = slot.ends[0];
    let mirror = (w - target.0, target.1);
    let width = 2.0 + 8.0 * st.size01();
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    pen.cap(LineCap::Round);
    let corners = [(0.0, h), (w, h)];
    for (k, (corner, end)) in corners
        .iter()
        .flat_map(|&c| [(c, target), (c, mirror)])
        .enumerate()
    {
        pen.line(corner, end, inks.ink(k));
    }
}

fn rose_points(center: (f32, f32), r: f32, rotation: f32) -> Vec<(f32, f32)> {
    const SAMPLES: usize = 180;
    (0..SAMPLES)
        .map(|k| {
            let t = PI * k as f32 / SAMPLES as f32;
            ring_point(center, r * (5.0 * t).cos(), t + rotation)
        })
        .collect()
}

fn flower(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.phase = advance_phase(slot.phase, st.speed(), 1100.0, st.fs);
    let c = st.center();
    let r = st.height() * 0.42 * st.size01();
    let outer = rose_points(c, r, slot.phase);
    let inner = rose_points(c, r * 0.8, slot.phase + PI / 5.0);
    let width = stroke_width(st) * 0.5;
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    pen.polyline(&outer, true, inks.a);
    pen.polyline(&inner, true, inks.second());
}

fn lissajous(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const SAMPLES: usize = 240;
    slot.phase = advance_phase(slot.phase, st.speed(), 1300.0, st.fs);
    let (cx, cy) = st.center();
    let ax = 0.4 * st.width() * st.size01();
    let ay = 0.4 * st.height() * st.size01();
    let pts: Vec<(f32, f32)> = (0..SAMPLES)
        .map(|k| {
            let t = TAU * k as f32 / SAMPLES as f32;
            (cx + ax * (3.0 * t + slot.phase).sin(), cy + ay * (2.0 * t).sin())
        })
        .collect();
    let width = stroke_width(st) * 0.5;
    let ink = st.inks.a;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    pen.polyline(&pts, true, ink);
}

fn orbit_dots(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const ORBITS: usize = 6;
    // Rates are (6 - j) / 3, so three turns bring every orbit back to a whole turn.
    slot.phase = (slot.phase + st.speed() / 900.0 * st.fs).rem_euclid(3.0 * TAU);
    let c = st.center();
    let reach = st.height() * 0.45 * st.size01();
    let r = 4.0 + 8.0 * st.size01();
    for j in 0..ORBITS {
        let rate = (ORBITS - j) as f32 / 3.0;
        let p = ring_point(c, reach * (j + 1) as f32 / ORBITS as f32, slot.phase * rate);
        let ink = st.inks.ink(j);
        st.pen.dot(p, r, ink);
    }
}

fn checker(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.phase = advance_phase(slot.phase, st.speed(), 400.0, st.fs);
    let cell = 40.0 + 80.0 * st.size01();
    let flip = usize::from(slot.phase >= PI);
    let cols = (st.width() / cell).ceil() as usize;
    let rows = (st.height() / cell).ceil() as usize;
    for row in 0..rows {
        for col in 0..cols {
            if (row + col + flip) % 2 != 0 {
                continue;
            }
            let ink = st.inks.ink(row);
            st.pen
                .fill_rect(col as f32 * cell + 2.0, row as f32 * cell + 2.0, cell - 4.0, cell - 4.0, ink);
        }
    }
}

fn rain(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    let h = st.height();
    slot.scroll = advance_scroll(slot.scroll, 0.3 * st.speed() * st.fs, h);
    let count = (40.0 + 120.0 * st.size01()).round() as usize;
    let len = 20.0 + 60.0 * st.size01();
    let width = 1.0 + 2.0 * st.size01();
    let fall = slot.scroll + SCROLL_MARGIN;
    let streaks: Vec<((f32, f32), f32)> = (0..count)
        .map(|k| {
            let (x, y0) = st.layout.point(k);
            let y = (y0 + fall).rem_euclid(h + 2.0 * SCROLL_MARGIN) - SCROLL_MARGIN;
            ((x, y), len)
        })
        .collect();
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    for (k, ((x, y), l)) in streaks.into_iter().enumerate() {
        pen.line((x, y), (x, y + l), inks.ink(k));
    }
}

fn star_points(center: (f32, f32), r: f32, rotation: f32) -> Vec<(f32, f32)> {
    (0..10)
        .map(|k| {
            let rr = if k % 2 == 0 { r } else { r * 0.45 };
            ring_point(center, rr, rotation - FRAC_PI_2 + k as f32 * PI / 5.0)
        })
        .collect()
}

fn star(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    slot.phase = advance_phase(slot.phase, st.speed(), 1000.0, st.fs);
    let c = st.center();
    let r = st.height() * 0.45 * st.size01();
    let outer = star_points(c, r, slot.phase);
    let inner = star_points(c, r * 0.4, -slot.phase);
    let width = stroke_width(st) * 0.6;
    let inks = st.inks;
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    pen.polyline(&outer, true, inks.a);
    pen.polyline(&inner, true, inks.second());
}

fn tunnel_rect(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const THRESHOLD: f32 = 100.0;
    let delta = 0.25 * st.speed() * st.fs;
    if slot.flip {
        slot.step -= delta;
        if slot.step <= 0.0 {
            slot.step = 0.0;
            slot.flip = false;
        }
    } else {
        slot.step += delta;
        if slot.step >= THRESHOLD {
            slot.step = THRESHOLD;
            slot.flip = true;
        }
    }
    let (cx, cy) = st.center();
    let grow = slot.step / THRESHOLD * (0.3 + 0.7 * st.size01());
    let (hw, hh) = (st.width() * 0.5 * grow, st.height() * 0.5 * grow);
    let width = stroke_width(st) * 0.6;
    let ink = if slot.flip { st.inks.second() } else { st.inks.a };
    let mut pen = st.pen.scoped();
    pen.line_width(width);
    for k in 0..3 {
        let f = 1.0 - k as f32 * 0.3;
        pen.rect_outline(cx - hw * f, cy - hh * f, 2.0 * hw * f, 2.0 * hh * f, ink);
    }
}

fn helix(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const DOTS: usize = 40;
    slot.phase = advance_phase(slot.phase, st.speed(), 600.0, st.fs);
    let (w, h) = (st.width(), st.height());
    let amp = 0.3 * h * st.size01();
    let base = 2.0 + 5.0 * st.size01();
    for chain in 0..2 {
        let sign = if chain == 0 { 1.0 } else { -1.0 };
        let ink = st.inks.ink(chain);
        for i in 0..DOTS {
            let a = slot.phase + i as f32 * 0.3;
            let p = (w * (i as f32 + 0.5) / DOTS as f32, h * 0.5 + sign * amp * a.sin());
            let depth = 1.0 + 0.5 * sign * a.cos();
            st.pen.dot(p, base * depth, ink);
        }
    }
}

fn quad_led(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const LEDS: [(Rgb, f32); 4] = [
        (Rgb::new(255, 0, 0), 3.0),
        (Rgb::new(0, 255, 0), 4.0),
        (Rgb::new(0, 0, 255), 5.0),
        (Rgb::new(255, 255, 255), 7.0),
    ];
    const FLOOR: f32 = 0.15;
    const CEILING: f32 = 1.0;
    slot.phase = advance_phase(slot.phase, st.speed(), 900.0, st.fs);
    // Every blink rate is a whole number of rad/s, so wrapping at one turn is seamless.
    let t = (st.now_ms() / 1000.0).rem_euclid(std::f64::consts::TAU) as f32;
    let c = st.center();
    let reach = st.height() * 0.3 * st.size01();
    let r = 4.0 + 8.0 * st.size01();
    let spread = r * 1.6;
    let dim = st.ctx.controls.brightness / 100.0;
    for cluster in 0..3 {
        let hub = ring_point(c, reach, ring_angle(cluster, 3, slot.phase));
        for (k, &(color, rate)) in LEDS.iter().enumerate() {
            let p = ring_point(hub, spread, ring_angle(k, 4, 2.0 * slot.phase));
            let blink = 0.5 + 0.5 * (t * rate + cluster as f32 * 1.3).sin();
            let level = FLOOR + (CEILING - FLOOR) * blink;
            st.pen.dot(p, r, color.scaled(level * dim));
        }
    }
}

/// Draws alternating `seg`-long dashes along an outline in two passes, the
/// second shifted by exactly one segment.
fn dashed_passes(st: &mut Stage<'_>, seg: f32, scroll: f32, outline: &Outline) {
    if seg.is_nan() || seg <= 0.0 {
        return;
    }
    let width = 4.0 + 10.0 * st.size01();
    let inks = st.inks;
    for pass in 0..2 {
        let mut pen = st.pen.scoped();
        pen.line_width(width);
        pen.cap(LineCap::Butt);
        pen.dash(&[seg, seg], scroll + pass as f32 * seg);
        let ink = inks.ink(pass);
        match outline {
            Outline::Circle { center, r } => pen.ring(*center, *r, ink),
            Outline::Polygon(points) => pen.polyline(points, true, ink),
        }
    }
}

enum Outline {
    Circle { center: (f32, f32), r: f32 },
    Polygon(Vec<(f32, f32)>),
}

fn spin_circle(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const SEGMENTS: f32 = 16.0;
    let r = (st.height().min(st.width()) * 0.4 * st.size01()).max(4.0);
    let seg = TAU * r / SEGMENTS;
    // Dash phase in segment units; two segments make one full pattern.
    slot.scroll = (slot.scroll + st.speed() / 400.0 * st.fs).rem_euclid(2.0);
    let center = st.center();
    dashed_passes(st, seg, slot.scroll * seg, &Outline::Circle { center, r });
}

fn regular_polygon(center: (f32, f32), r: f32, sides: usize, rotation: f32) -> Vec<(f32, f32)> {
    (0..sides)
        .map(|k| ring_point(center, r, ring_angle(k, sides, rotation - FRAC_PI_2)))
        .collect()
}

fn spin_square(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const PER_SIDE: f32 = 4.0;
    let half = (st.height().min(st.width()) * 0.3 * st.size01()).max(4.0);
    let r = half * std::f32::consts::SQRT_2;
    let side = 2.0 * half;
    let points = regular_polygon(st.center(), r, 4, slot.spin + PI / 4.0);
    dashed_passes(st, side / PER_SIDE, 0.0, &Outline::Polygon(points));
}

fn spin_triangle(st: &mut Stage<'_>, slot: &mut PresetSlot) {
    const PER_SIDE: f32 = 6.0;
    let r = (st.height().min(st.width()) * 0.4 * st.size01()).max(4.0);
    let side = r * 3.0f32.sqrt();
    let points = regular_polygon(st.center(), r, 3, slot.spin);
    dashed_passes(st, side / PER_SIDE, 0.0, &Outline::Polygon(points));
}
