use std::f32::consts::TAU;

use tui_lightshow::motion::{
    blend_ms_for, MotionBlender, MotionPath, MAX_CYCLES_PER_SEC, RADIUS_FRACTION,
};
use tui_lightshow::visual::Viewport;

const DT: f32 = 0.016;

fn viewport() -> Viewport {
    Viewport::new(960.0, 540.0, 1.0)
}

fn dist(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Largest offset change one frame may produce: path travel at the phase
/// rate plus the steepest eased weight change, with 10% slack.
fn max_step(vp: &Viewport, speed: f32, blend_ms: f64) -> f32 {
    let r = vp.min_side() * RADIUS_FRACTION;
    let cps = speed / 100.0 * MAX_CYCLES_PER_SEC;
    let weight_rate = 1.5 * (DT * 1000.0) / blend_ms as f32 * 2.0;
    r * (TAU * cps * DT + weight_rate) * 1.1
}

#[test]
fn offsets_are_finite_on_every_path() {
    let vp = viewport();
    for path in MotionPath::all() {
        for phase in [0.0, 0.25, 0.5, 0.75, 0.999] {
            let (x, y) = path.point(phase);
            assert!(x.is_finite() && y.is_finite(), "{path:?} at {phase}");
            assert!(x.hypot(y) <= 1.0 + 1e-5, "{path:?} left the unit circle at {phase}");
        }
        let mut blender = MotionBlender::new(path);
        for f in 0..200 {
            let (x, y) = blender.compute_offset(f as f64 * 16.0, DT, 100.0, &vp);
            assert!(x.is_finite() && y.is_finite());
        }
    }
    assert_eq!(MotionPath::Off.point(0.3), (0.0, 0.0));
}

#[test]
fn off_path_stays_centered() {
    let mut blender = MotionBlender::default();
    let vp = viewport();
    for f in 0..100 {
        assert_eq!(blender.compute_offset(f as f64 * 16.0, DT, 100.0, &vp), (0.0, 0.0));
    }
}

#[test]
fn circle_runs_on_radius_from_smaller_side() {
    let vp = viewport();
    let mut blender = MotionBlender::new(MotionPath::Circle);
    let (x, y) = blender.compute_offset(0.0, DT, 50.0, &vp);
    let expected = 540.0 * RADIUS_FRACTION;
    assert!((x.hypot(y) - expected).abs() < 1e-3, "radius {}", x.hypot(y));
}

#[test]
fn zero_speed_freezes_phase() {
    let vp = viewport();
    let mut blender = MotionBlender::new(MotionPath::Square);
    let first = blender.compute_offset(0.0, DT, 0.0, &vp);
    for f in 1..120 {
        assert_eq!(blender.compute_offset(f as f64 * 16.0, DT, 0.0, &vp), first);
    }
    assert_eq!(blender.phase(), 0.0);
}

#[test]
fn set_mode_to_current_target_is_noop() {
    let mut blender = MotionBlender::new(MotionPath::Circle);
    assert!(!blender.set_mode(MotionPath::Circle, 100.0));
    assert!(!blender.is_blending());
    assert!(blender.set_mode(MotionPath::Triangle, 100.0));
    assert!(blender.is_blending());
    assert!(!blender.set_mode(MotionPath::Triangle, 150.0), "retarget to same target");
    assert_eq!(blender.from(), MotionPath::Circle);
    assert_eq!(blender.target(), MotionPath::Triangle);
}

#[test]
fn blend_collapses_to_target_and_stays_there() {
    let vp = viewport();
    let mut blender = MotionBlender::new(MotionPath::Circle);
    blender.set_transition_speed(100.0);
    assert_eq!(blender.blend_ms(), blend_ms_for(100.0));
    blender.set_mode(MotionPath::Square, 0.0);

    let mut now = 0.0;
    while now <= blender.blend_ms() + 16.0 {
        blender.compute_offset(now, DT, 60.0, &vp);
        now += 16.0;
    }
    assert!(!blender.is_blending());
    assert_eq!(blender.from(), MotionPath::Square);

    let r = vp.min_side() * RADIUS_FRACTION;
    for _ in 0..10 {
        let got = blender.compute_offset(now, DT, 60.0, &vp);
        let (px, py) = MotionPath::Square.point(blender.phase());
        assert!(dist(got, (px * r, py * r)) < 1e-3, "offset is not the pure target path");
        now += 16.0;
    }
}

#[test]
fn rapid_retargets_never_jump() {
    let vp = viewport();
    let speed = 100.0;
    let mut blender = MotionBlender::new(MotionPath::Circle);
    blender.set_transition_speed(80.0);
    let bound = max_step(&vp, speed, blender.blend_ms());

    let order = [
        MotionPath::Square,
        MotionPath::Triangle,
        MotionPath::Off,
        MotionPath::Circle,
        MotionPath::Square,
    ];
    let mut prev = blender.compute_offset(0.0, DT, speed, &vp);
    for f in 1..600usize {
        let now = f as f64 * 16.0;
        // Retarget every 7 frames, well inside the blend window.
        if f % 7 == 0 {
            blender.set_mode(order[(f / 7) % order.len()], now);
        }
        let next = blender.compute_offset(now, DT, speed, &vp);
        let jump = dist(prev, next);
        assert!(jump <= bound, "frame {f}: jumped {jump} > {bound}");
        prev = next;
    }
}

#[test]
fn slower_transition_lengthens_blend() {
    let vp = viewport();
    let mut fast = MotionBlender::new(MotionPath::Off);
    let mut slow = MotionBlender::new(MotionPath::Off);
    fast.set_transition_speed(100.0);
    slow.set_transition_speed(0.0);
    fast.set_mode(MotionPath::Circle, 0.0);
    slow.set_mode(MotionPath::Circle, 0.0);
    for f in 0..20 {
        let now = f as f64 * 16.0;
        fast.compute_offset(now, DT, 50.0, &vp);
        slow.compute_offset(now, DT, 50.0, &vp);
    }
    assert!(!fast.is_blending(), "250 ms blend should be done after 304 ms");
    assert!(slow.is_blending(), "3 s blend should still be running");
    assert!(slow.blend_factor(304.0) < fast.blend_factor(304.0));
}
