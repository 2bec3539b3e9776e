use std::time::{Duration, Instant};

use anyhow::Result;
use tui_lightshow::audio::AudioFeatures;
use tui_lightshow::beat::{beat_energy, BeatDetector};
use tui_lightshow::motion::{MotionBlender, MotionPath};
use tui_lightshow::show::Show;
use tui_lightshow::surface::PixmapSurface;
use tui_lightshow::visual::Viewport;

const FRAME_MS: f64 = 1000.0 / 60.0;

struct Args {
    frames: usize,
    w: u32,
    h: u32,
    world_width: f32,
    speed: f32,
    size: f32,
    shading: f32,
    multicolor: bool,
    seed: u64,
    ci_smoke: bool,
    quick: bool,
    max_ms: f64,
}

fn parse_args() -> Args {
    let mut args = Args {
        frames: 180,
        w: 160,
        h: 88,
        world_width: 960.0,
        speed: 50.0,
        size: 50.0,
        shading: 0.0,
        multicolor: true,
        seed: 7,
        ci_smoke: false,
        quick: false,
        max_ms: 20.0,
    };

    let argv = std::env::args().skip(1).collect::<Vec<_>>();
    let mut i = 0usize;
    while i < argv.len() {
        let k = argv[i].as_str();
        let v = argv.get(i + 1).map(|s| s.as_str());
        match (k, v) {
            ("--frames", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.frames = n.max(1);
                }
                i += 2;
            }
            ("--w", Some(x)) => {
                if let Ok(n) = x.parse::<u32>() {
                    args.w = n.max(1);
                }
                i += 2;
            }
            ("--h", Some(x)) => {
                if let Ok(n) = x.parse::<u32>() {
                    args.h = n.max(1);
                }
                i += 2;
            }
            ("--world-width", Some(x)) => {
                if let Ok(v) = x.parse::<f32>() {
                    args.world_width = v.max(1.0);
                }
                i += 2;
            }
            ("--speed", Some(x)) => {
                if let Ok(v) = x.parse::<f32>() {
                    args.speed = v.clamp(0.0, 100.0);
                }
                i += 2;
            }
            ("--size", Some(x)) => {
                if let Ok(v) = x.parse::<f32>() {
                    args.size = v.clamp(0.0, 100.0);
                }
                i += 2;
            }
            ("--shading", Some(x)) => {
                if let Ok(v) = x.parse::<f32>() {
                    args.shading = v.clamp(0.0, 100.0);
                }
                i += 2;
            }
            ("--multicolor", Some(x)) if !x.starts_with("--") => {
                args.multicolor = parse_bool(x).unwrap_or(true);
                i += 2;
            }
            ("--seed", Some(x)) => {
                if let Ok(n) = x.parse::<u64>() {
                    args.seed = n;
                }
                i += 2;
            }
            ("--ci-smoke", Some(x)) if !x.starts_with("--") => {
                args.ci_smoke = parse_bool(x).unwrap_or(true);
                i += 2;
            }
            ("--ci-smoke", _) => {
                args.ci_smoke = true;
                i += 1;
            }
            ("--quick", Some(x)) if !x.starts_with("--") => {
                args.quick = parse_bool(x).unwrap_or(true);
                i += 2;
            }
            ("--quick", _) => {
                args.quick = true;
                i += 1;
            }
            ("--max-ms", Some(x)) => {
                if let Ok(v) = x.parse::<f64>() {
                    args.max_ms = v.max(0.1);
                }
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    if args.quick {
        args.frames = args.frames.min(60);
    }

    args
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Synthetic 120 BPM material: a bass hit every 30 frames over a slow swell.
fn synth_audio(step: usize) -> AudioFeatures {
    let t = step as f32 / 60.0;
    let swell = (t * 0.7).sin() * 0.5 + 0.5;
    let hit = if step % 30 == 0 {
        0.9
    } else if step % 30 < 4 {
        0.5
    } else {
        0.12
    };
    AudioFeatures {
        amplitude: (0.2 + swell * 0.3 + hit * 0.3).min(1.0),
        bass: hit,
        mid: 0.2 + swell * 0.4,
        treble: ((t * 5.2).sin() * 0.5 + 0.5) * 0.4,
        centroid: 0.3 + swell * 0.2,
    }
}

fn bench_presets(args: &Args) -> Result<()> {
    let mut show = Show::new(args.seed)?;
    show.controls.set_speed(args.speed);
    show.controls.set_size(args.size);
    show.controls.set_shading(args.shading);
    show.controls.settle();
    show.controls.multicolor = args.multicolor;

    let mut surface = PixmapSurface::new(args.w, args.h)?;
    show.set_viewport(Viewport::from_pixels(args.w, args.h, args.world_width));

    let names = show.engine().names();
    let mut total_time = Duration::ZERO;
    let mut total_frames = 0usize;
    let mut black_presets = Vec::<&str>::new();
    let mut slow_presets = Vec::<(&str, f64)>::new();

    println!(
        "Preset benchmark: presets={} frames/preset={} size={}x{} world_width={} speed={} size_ctl={} multicolor={}",
        names.len(),
        args.frames,
        args.w,
        args.h,
        args.world_width,
        args.speed,
        args.size,
        args.multicolor
    );

    let mut clock_ms = 0.0f64;
    for (idx, &name) in names.iter().enumerate() {
        show.set_preset(idx);
        let start = Instant::now();
        let mut lit = 0usize;

        for f in 0..args.frames {
            let report = show.frame(clock_ms, &synth_audio(f), &mut surface);
            clock_ms += FRAME_MS;
            if report.drew && surface.lit_pixels() > 0 {
                lit += 1;
            }
        }

        let elapsed = start.elapsed();
        total_time += elapsed;
        total_frames += args.frames;
        let ms = elapsed.as_secs_f64() * 1000.0 / args.frames as f64;
        println!("{:>2}. {:<16} {:>8.3} ms/frame  lit={:>3}/{}", idx, name, ms, lit, args.frames);
        if lit == 0 {
            black_presets.push(name);
        }
        if args.ci_smoke && ms > args.max_ms {
            slow_presets.push((name, ms));
        }
    }

    let avg_ms = total_time.as_secs_f64() * 1000.0 / total_frames.max(1) as f64;
    let fps = if avg_ms > 0.0 { 1000.0 / avg_ms } else { 0.0 };
    println!("Summary: {:>8.3} ms/frame avg  {:>7.2} FPS", avg_ms, fps);

    if args.ci_smoke {
        if !black_presets.is_empty() || !slow_presets.is_empty() {
            eprintln!("CI smoke: FAIL");
            if !black_presets.is_empty() {
                eprintln!("  black presets: {}", black_presets.join(", "));
            }
            for (name, ms) in slow_presets {
                eprintln!("  slow preset: {} ({:.3} ms/frame > {:.3})", name, ms, args.max_ms);
            }
            anyhow::bail!("ci smoke failed");
        }
        println!("CI smoke: PASS (max_ms={:.3})", args.max_ms);
    }
    Ok(())
}

fn bench_beat_detector(args: &Args) {
    let mut detector = BeatDetector::new();
    let frames = args.frames.max(240);
    let mut beats = 0usize;
    let start = Instant::now();
    for f in 0..frames {
        let energy = beat_energy(&synth_audio(f), 1.0);
        if detector.update(energy, f as f64 * FRAME_MS, 0.6, 120.0) {
            beats += 1;
        }
    }
    let us = start.elapsed().as_secs_f64() * 1e6 / frames as f64;
    println!(
        "Beat detector: frames={} beats={} (synthetic hits={}) {:.3} us/update",
        frames,
        beats,
        frames.div_ceil(30),
        us
    );
}

fn bench_motion_paths(args: &Args) {
    let viewport = Viewport::from_pixels(args.w, args.h, args.world_width);
    for path in MotionPath::all() {
        let mut blender = MotionBlender::new(MotionPath::Off);
        blender.set_mode(path, 0.0);
        let mut max_r = 0.0f32;
        let start = Instant::now();
        for f in 0..args.frames {
            let (x, y) = blender.compute_offset(f as f64 * FRAME_MS, 1.0 / 60.0, args.speed, &viewport);
            max_r = max_r.max((x * x + y * y).sqrt());
        }
        let us = start.elapsed().as_secs_f64() * 1e6 / args.frames as f64;
        println!(
            "Motion {:<8} max offset {:>7.2}  blending={} {:.3} us/frame",
            path.label(),
            max_r,
            blender.is_blending(),
            us
        );
    }
}

fn main() -> Result<()> {
    let args = parse_args();
    bench_presets(&args)?;
    bench_beat_detector(&args);
    bench_motion_paths(&args);
    Ok(())
}
