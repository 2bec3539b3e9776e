use tui_lightshow::audio::AudioFeatures;
use tui_lightshow::color::{distance, Rgb, PALETTE};
use tui_lightshow::motion::MotionPath;
use tui_lightshow::show::{shading_alpha, strobe_open, Show, MAX_DT};
use tui_lightshow::surface::{DrawCall, RecordingSurface};
use tui_lightshow::visual::{make_presets, PresetDef, PresetEngine, PresetSlot, Stage};

fn show() -> Show {
    Show::new(11).expect("catalog validates")
}

fn quiet() -> AudioFeatures {
    AudioFeatures::default()
}

fn kick(bass: f32) -> AudioFeatures {
    AudioFeatures {
        amplitude: bass,
        bass,
        ..AudioFeatures::default()
    }
}

fn explode(_: &mut Stage<'_>, _: &mut PresetSlot) {
    panic!("preset exploded");
}

#[test]
fn frame_clamps_dt() {
    let mut s = show();
    let mut surface = RecordingSurface::new(960, 540);
    let first = s.frame(0.0, &quiet(), &mut surface);
    assert!((first.dt - 1.0 / 60.0).abs() < 1e-6, "first frame assumes 60 Hz");
    let stalled = s.frame(5000.0, &quiet(), &mut surface);
    assert_eq!(stalled.dt, MAX_DT, "stalls clamp to the upper bound");
    let backwards = s.frame(4000.0, &quiet(), &mut surface);
    assert_eq!(backwards.dt, 0.0);
}

#[test]
fn frame_clears_then_draws_active_preset() {
    let mut s = show();
    let mut surface = RecordingSurface::new(960, 540);
    let report = s.frame(0.0, &quiet(), &mut surface);
    assert!(report.enabled && report.drew);
    assert!(matches!(
        surface.calls.first(),
        Some(DrawCall::Clear { alpha, .. }) if *alpha == 1.0
    ));
    assert!(surface.calls.len() > 1, "preset drew after the clear");
    assert_eq!(s.engine().active(), Some(0));
}

#[test]
fn shading_leaves_trails() {
    let mut s = show();
    s.controls.set_shading(100.0);
    let mut surface = RecordingSurface::new(960, 540);
    s.frame(0.0, &quiet(), &mut surface);
    match surface.calls.first() {
        Some(DrawCall::Clear { alpha, .. }) => assert!((alpha - 0.08).abs() < 1e-6),
        other => panic!("expected a clear, got {other:?}"),
    }
    assert_eq!(shading_alpha(0.0), 1.0);
}

#[test]
fn strobe_gate_blacks_out_half_the_period() {
    assert!(strobe_open(123.0, 0.0), "strobe 0 never closes");
    // strobe 50: period 530 ms, open for the first 265 ms.
    assert!(strobe_open(10.0, 50.0));
    assert!(!strobe_open(300.0, 50.0));
    assert!(strobe_open(540.0, 50.0));
    // Period never drops under 60 ms.
    assert!(strobe_open(29.0, 100.0));
    assert!(!strobe_open(31.0, 100.0));

    let mut s = show();
    s.controls.set_strobe(50.0);
    let mut surface = RecordingSurface::new(960, 540);
    s.frame(0.0, &quiet(), &mut surface);
    surface.take_calls();
    let closed = s.frame(300.0, &quiet(), &mut surface);
    assert!(!closed.enabled && !closed.drew);
    assert_eq!(surface.calls.len(), 1, "closed strobe only clears");
    assert!(matches!(surface.calls[0], DrawCall::Clear { alpha, .. } if alpha == 1.0));
}

#[test]
fn blackout_pauses_animation() {
    let mut s = show();
    let mut surface = RecordingSurface::new(960, 540);
    s.frame(0.0, &quiet(), &mut surface);
    let phase = s.engine().slot(0).expect("slot").phase;
    s.settings.blackout = true;
    for f in 1..30 {
        let r = s.frame(f as f64 * 16.0, &quiet(), &mut surface);
        assert!(!r.drew);
    }
    assert_eq!(s.engine().slot(0).expect("slot").phase, phase, "blackout must pause");
}

#[test]
fn size_and_brightness_ease_toward_destination() {
    let mut s = show();
    s.controls.set_size(100.0);
    s.controls.set_brightness(0.0);
    let mut surface = RecordingSurface::new(960, 540);
    s.frame(0.0, &quiet(), &mut surface);
    let size_after_one = s.controls.size;
    assert!(size_after_one > 50.0 && size_after_one < 100.0, "size {size_after_one}");
    for f in 1..240 {
        s.frame(f as f64 * 16.0, &quiet(), &mut surface);
    }
    assert_eq!(s.controls.size, 100.0);
    assert_eq!(s.controls.brightness, 0.0);
}

#[test]
fn beat_mode_off_never_fires() {
    let mut s = show();
    let mut surface = RecordingSurface::new(960, 540);
    for f in 0..120 {
        let audio = if f % 30 == 0 { kick(0.9) } else { kick(0.05) };
        assert!(!s.frame(f as f64 * 16.0, &audio, &mut surface).beat);
    }
}

#[test]
fn beats_drive_auto_color() {
    let mut s = show();
    s.set_beat_mode(true);
    s.settings.auto_color = true;
    let mut surface = RecordingSurface::new(960, 540);
    let mut beats = 0;
    for f in 0..240 {
        let audio = if f % 30 == 0 { kick(0.9) } else { kick(0.05) };
        let report = s.frame(f as f64 * 16.0, &audio, &mut surface);
        if report.beat {
            beats += 1;
            let (a, b) = (s.controls.color_a, s.controls.color_b);
            assert!(PALETTE.contains(&a) && PALETTE.contains(&b));
            let farthest = PALETTE.iter().map(|&c| distance(a, c)).fold(0.0f32, f32::max);
            assert_eq!(distance(a, b), farthest, "B must be the most distant swatch");
        }
    }
    assert!(beats >= 7, "expected a beat per kick, got {beats}");
}

#[test]
fn auto_preset_moves_to_a_different_preset() {
    let mut s = show();
    s.settings.auto_preset = true;
    for i in 0..50 {
        let before = s.preset();
        s.on_beat(i as f64);
        assert_ne!(s.preset(), before);
        assert!(s.preset() < s.engine().len());
    }
}

#[test]
fn preset_stepping_wraps() {
    let mut s = show();
    s.prev_preset();
    assert_eq!(s.preset(), 34);
    s.next_preset();
    assert_eq!(s.preset(), 0);
    s.set_preset(99);
    let mut surface = RecordingSurface::new(960, 540);
    let r = s.frame(0.0, &quiet(), &mut surface);
    assert!(!r.drew, "unknown ids render nothing");
    assert_eq!(s.preset_name(), "<none>");
}

#[test]
fn beat_mode_toggle_resets_detector() {
    let mut s = show();
    s.set_beat_mode(true);
    let mut surface = RecordingSurface::new(960, 540);
    for f in 0..60 {
        s.frame(f as f64 * 16.0, &kick(0.4), &mut surface);
    }
    assert!(s.detector().ema() > 0.0);
    s.set_beat_mode(false);
    assert_eq!(s.detector().ema(), 0.0);
    assert_eq!(s.detector().last_beat_ms(), f64::NEG_INFINITY);
}

#[test]
fn motion_offset_reaches_the_engine() {
    let mut s = show();
    s.reset_motion(MotionPath::Circle);
    let mut surface = RecordingSurface::new(960, 540);
    let r = s.frame(0.0, &quiet(), &mut surface);
    let radius = r.offset.0.hypot(r.offset.1);
    assert!((radius - 540.0 * 0.12).abs() < 1e-2, "offset radius {radius}");
    assert_eq!(s.motion().offset(), r.offset);

    s.set_motion(MotionPath::Off);
    assert!(s.motion().is_blending());
}

#[test]
fn panicking_preset_drops_only_its_frame() {
    let mut defs = make_presets();
    defs.push(PresetDef {
        id: defs.len(),
        name: "Explode",
        draw: explode,
        reseed_on_activate: false,
        free_spin: None,
    });
    let bad = defs.len() - 1;
    let engine = PresetEngine::with_presets(defs, 3).expect("registry");
    let mut s = Show::with_engine(engine, 3);
    let mut surface = RecordingSurface::new(960, 540);

    s.set_preset(bad);
    let r = s.frame(0.0, &quiet(), &mut surface);
    assert!(!r.drew, "panicking frame is dropped");
    assert_eq!(surface.depth(), 0, "scope restored while unwinding");
    assert_eq!(surface.saves, surface.restores);

    s.set_preset(0);
    let r = s.frame(16.0, &quiet(), &mut surface);
    assert!(r.drew, "show keeps rendering after a panic");
}

#[test]
fn shuffle_colors_picks_contrasting_pair() {
    let mut s = show();
    for _ in 0..20 {
        s.shuffle_colors();
        let (a, b) = (s.controls.color_a, s.controls.color_b);
        assert_ne!(a, b);
        assert!(PALETTE.contains(&a));
    }
    s.set_colors(Rgb::WHITE, Rgb::BLACK);
    assert_eq!(s.controls.color_b, Rgb::BLACK);
}
