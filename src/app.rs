use crate::audio::AudioSystem;
use crate::config::{AudioSource, Config};
use crate::render::{Frame, HalfBlockRenderer, Renderer};
use crate::show::Show;
use crate::surface::{PixmapSurface, Surface};
use crate::terminal::TerminalGuard;
use crate::visual::Viewport;
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::BufWriter;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const CONTROL_STEP: f32 = 5.0;
const COARSE_STEP: f32 = 10.0;

/// Builds the show from the command line: controls, colors, motion, beat policy.
pub fn show_from_config(cfg: &Config, seed: u64) -> anyhow::Result<Show> {
    let mut show = Show::new(seed).context("preset registry")?;

    let c = &mut show.controls;
    c.set_speed(cfg.speed);
    c.set_size(cfg.size);
    c.set_brightness(cfg.brightness);
    c.set_strobe(cfg.strobe);
    c.set_shading(cfg.shading);
    c.settle();
    c.multicolor = cfg.multicolor;
    show.set_colors(cfg.color_a, cfg.color_b);

    show.set_transition_speed(cfg.transition);
    show.reset_motion(cfg.motion);

    let s = &mut show.settings;
    s.sensitivity = cfg.sensitivity;
    s.cooldown_ms = cfg.cooldown_ms.max(0.0);
    s.mic_gain = cfg.mic_gain.max(0.0);
    s.auto_color = cfg.auto_color;
    s.auto_preset = cfg.auto_preset;
    show.set_beat_mode(cfg.beat);

    if cfg.preset.is_some() {
        let names = show.engine().names();
        match cfg.preset_index(&names) {
            Some(idx) => show.set_preset(idx),
            None => tracing::warn!(query = ?cfg.preset, "no preset matches; starting at 0"),
        }
    }
    Ok(show)
}

fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x1157_5eed)
}

/// Drawable area for a terminal, leaving `hud_rows` text rows at the bottom.
fn surface_size(size: (u16, u16), hud_rows: u16) -> (u16, u32, u32) {
    let visual_rows = size.1.saturating_sub(hud_rows).max(1);
    (visual_rows, size.0.max(1) as u32, visual_rows as u32 * 2)
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let seed = cfg.seed.unwrap_or_else(seed_from_clock);
    let mut show = show_from_config(&cfg, seed)?;

    let audio = match AudioSystem::new(cfg.source, cfg.device.as_deref()) {
        Ok(a) => a,
        Err(err) if cfg.source == AudioSource::Mic => {
            tracing::warn!(error = %err, "microphone unavailable; running silent");
            AudioSystem::new(AudioSource::None, None)?
        }
        Err(err) => return Err(err),
    };
    let features = audio.features();
    tracing::info!(
        seed,
        preset = show.preset(),
        source = ?audio.source,
        fps = cfg.fps,
        "light show starting"
    );

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());
    let mut renderer = HalfBlockRenderer::new();
    tracing::debug!(renderer = renderer.name(), "terminal presenter ready");

    let mut ui = UiState::default();
    let mut last_size = TerminalGuard::size()?;
    let mut hud_rows = hud_rows_for_size(last_size, ui.show_hud);
    let (mut visual_rows, pw, ph) = surface_size(last_size, hud_rows);
    let mut surface = PixmapSurface::new(pw, ph).context("allocate pixmap")?;
    show.set_viewport(Viewport::from_pixels(pw, ph, cfg.world_width));

    let start = Instant::now();
    let mut fps = FpsCounter::new();
    let target = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);

    loop {
        let frame_start = Instant::now();

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    if handle_key(k.code, k.modifiers, &mut show, &mut ui) {
                        return Ok(());
                    }
                }
                Event::Resize(c, r) => last_size = (c.max(1), r.max(1)),
                _ => {}
            }
        }
        // Some terminals drop resize events; poll the size as well.
        let sz = TerminalGuard::size()?;
        if sz != last_size {
            last_size = sz;
        }

        let (term_cols, term_rows) = last_size;
        let hud = if ui.show_hud {
            build_hud(term_cols as usize, &show, fps.fps(), audio.source)
        } else {
            String::new()
        };
        let wanted_rows = hud_rows_for_text(term_rows, ui.show_hud, &hud);

        let (rows, pw, ph) = surface_size(last_size, wanted_rows);
        if wanted_rows != hud_rows || (pw, ph) != surface.size() {
            hud_rows = wanted_rows;
            visual_rows = rows;
            surface.resize(pw, ph).context("resize pixmap")?;
            show.set_viewport(Viewport::from_pixels(pw, ph, cfg.world_width));
            TerminalGuard::clear(&mut out)?;
            tracing::debug!(cols = term_cols, rows = term_rows, pw, ph, "viewport resized");
        }

        let now_ms = start.elapsed().as_secs_f64() * 1000.0;
        let snapshot = features.load();
        show.frame(now_ms, &snapshot, &mut surface);

        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows,
            pixel_width: pw as usize,
            pixel_height: ph as usize,
            pixels_rgba: surface.pixels(),
            hud: &hud,
            hud_rows,
            overlay: ui.show_help.then_some(HELP_TEXT),
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, &mut out)?;
        fps.tick();

        let elapsed = frame_start.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

/// Host-only display state.
#[derive(Clone, Copy, Debug)]
pub struct UiState {
    pub show_hud: bool,
    pub show_help: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            show_hud: true,
            show_help: false,
        }
    }
}

/// Applies one key press. Returns true when the app should quit.
pub fn handle_key(code: KeyCode, mods: KeyModifiers, show: &mut Show, ui: &mut UiState) -> bool {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return true;
    }
    let c = show.controls;
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => return true,
        KeyCode::Left => show.prev_preset(),
        KeyCode::Right => show.next_preset(),
        KeyCode::Up => show.controls.set_speed(c.speed + CONTROL_STEP),
        KeyCode::Down => show.controls.set_speed(c.speed - CONTROL_STEP),
        KeyCode::Char('+') | KeyCode::Char('=') => show.controls.set_size(c.size_dest + CONTROL_STEP),
        KeyCode::Char('-') | KeyCode::Char('_') => show.controls.set_size(c.size_dest - CONTROL_STEP),
        KeyCode::Char('.') | KeyCode::Char('>') => {
            show.controls.set_brightness(c.brightness_dest + CONTROL_STEP)
        }
        KeyCode::Char(',') | KeyCode::Char('<') => {
            show.controls.set_brightness(c.brightness_dest - CONTROL_STEP)
        }
        KeyCode::Char('s') => show.controls.set_strobe(c.strobe + COARSE_STEP),
        KeyCode::Char('S') => show.controls.set_strobe(c.strobe - COARSE_STEP),
        KeyCode::Char('d') => show.controls.set_shading(c.shading + COARSE_STEP),
        KeyCode::Char('D') => show.controls.set_shading(c.shading - COARSE_STEP),
        KeyCode::Char('c') | KeyCode::Char('C') => show.shuffle_colors(),
        KeyCode::Char('x') | KeyCode::Char('X') => show.set_colors(c.color_b, c.color_a),
        KeyCode::Char('m') | KeyCode::Char('M') => show.controls.multicolor = !c.multicolor,
        KeyCode::Char('o') => show.cycle_motion(),
        KeyCode::Char('O') => show.cycle_motion_back(),
        KeyCode::Char(']') => {
            let v = show.motion().transition_speed();
            show.set_transition_speed(v + COARSE_STEP);
        }
        KeyCode::Char('[') => {
            let v = show.motion().transition_speed();
            show.set_transition_speed(v - COARSE_STEP);
        }
        KeyCode::Char('b') | KeyCode::Char('B') => {
            let on = !show.settings.beat_enabled;
            show.set_beat_mode(on);
        }
        KeyCode::Char('a') => show.settings.auto_color = !show.settings.auto_color,
        KeyCode::Char('A') => show.settings.auto_preset = !show.settings.auto_preset,
        KeyCode::Char('k') | KeyCode::Char('K') => show.settings.blackout = !show.settings.blackout,
        KeyCode::Char('i') | KeyCode::Char('I') => ui.show_hud = !ui.show_hud,
        KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::F(1) => {
            ui.show_help = !ui.show_help
        }
        _ => {}
    }
    false
}

fn hud_rows_for_size(size: (u16, u16), show_hud: bool) -> u16 {
    if !show_hud || size.1 <= 1 {
        return 0;
    }
    (size.1 - 1).min(3)
}

fn hud_rows_for_text(term_rows: u16, show_hud: bool, hud: &str) -> u16 {
    if !show_hud {
        return 0;
    }
    (hud.lines().count() as u16).min(term_rows.saturating_sub(1))
}

fn on_off(v: bool) -> &'static str {
    if v { "on" } else { "off" }
}

/// HUD text, hard-wrapped to the terminal width.
pub fn build_hud(cols: usize, show: &Show, fps: f32, source: AudioSource) -> String {
    let c = &show.controls;
    let s = &show.settings;
    let r = show.last_report();
    let motion = show.motion();
    let lines = [
        format!(
            "#{:02} {} | spd {:.0} size {:.0} bri {:.0} strobe {:.0} shade {:.0} | A {} B {} multi {}",
            show.preset(),
            show.preset_name(),
            c.speed,
            c.size_dest,
            c.brightness_dest,
            c.strobe,
            c.shading,
            c.color_a.to_hex(),
            c.color_b.to_hex(),
            on_off(c.multicolor),
        ),
        format!(
            "motion {}{} ({:+.0},{:+.0}) trans {:.0} | beat {} {} e {:.3} thr {:.3} | auto color {} preset {}{}",
            motion.target().label(),
            if motion.is_blending() { "*" } else { "" },
            r.offset.0,
            r.offset.1,
            motion.transition_speed(),
            on_off(s.beat_enabled),
            if r.beat { "!" } else { "." },
            r.energy,
            r.threshold,
            on_off(s.auto_color),
            on_off(s.auto_preset),
            if s.blackout { " | BLACKOUT" } else { "" },
        ),
        format!(
            "src {:?} | {:.1} fps | arrows preset/speed, ? help, q quit",
            source, fps
        ),
    ];
    let width = cols.max(1);
    lines
        .iter()
        .flat_map(|l| hard_wrap_line(l, width))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hard_wrap_line(line: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

pub const HELP_TEXT: &str = "Light Show Keys\n\
left/right  previous/next preset\n\
up/down  speed\n\
+ / -  size\n\
, / .  brightness\n\
s / S  strobe up/down\n\
d / D  shading up/down\n\
c  shuffle colors\n\
x  swap color A and B\n\
m  multicolor on/off\n\
o / O  next/previous motion path\n\
[ / ]  motion transition slower/faster\n\
b  beat mode on/off\n\
a / A  auto color / auto preset on beat\n\
k  blackout\n\
i  show/hide HUD\n\
? or h or F1  toggle this help\n\
q or esc  quit";

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let dt = self.last.elapsed().as_secs_f32();
        if dt >= 0.5 {
            self.fps = self.frames as f32 / dt;
            self.frames = 0;
            self.last = Instant::now();
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn hard_wrap_splits_on_char_boundaries() {
        let parts = hard_wrap_line("abcdé", 2);
        assert_eq!(parts, vec!["ab", "cd", "é"]);
        assert_eq!(hard_wrap_line("", 4), vec![String::new()]);
    }

    #[test]
    fn keys_adjust_show_controls() {
        let cfg = Config::try_parse_from(["x", "--source", "none", "--seed", "1"]).expect("cfg");
        let mut show = show_from_config(&cfg, 1).expect("show");
        let mut ui = UiState::default();
        assert!(!handle_key(KeyCode::Up, KeyModifiers::NONE, &mut show, &mut ui));
        assert_eq!(show.controls.speed, 55.0);
        handle_key(KeyCode::Right, KeyModifiers::NONE, &mut show, &mut ui);
        assert_eq!(show.preset(), 1);
        handle_key(KeyCode::Left, KeyModifiers::NONE, &mut show, &mut ui);
        handle_key(KeyCode::Left, KeyModifiers::NONE, &mut show, &mut ui);
        assert_eq!(show.preset(), show.engine().len() - 1, "wraps backwards");
        handle_key(KeyCode::Char('b'), KeyModifiers::NONE, &mut show, &mut ui);
        assert!(show.settings.beat_enabled);
        handle_key(KeyCode::Char('?'), KeyModifiers::NONE, &mut show, &mut ui);
        assert!(ui.show_help);
        assert!(handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL, &mut show, &mut ui));
    }

    #[test]
    fn config_seeds_show_controls() {
        let cfg = Config::try_parse_from([
            "x", "--speed", "20", "--size", "80", "--motion", "circle", "--preset", "disco",
        ])
        .expect("cfg");
        let show = show_from_config(&cfg, 7).expect("show");
        assert_eq!(show.controls.speed, 20.0);
        assert_eq!(show.controls.size, 80.0, "size settles immediately at startup");
        assert!(!show.motion().is_blending());
        assert_eq!(show.preset_name(), "Discoball");
    }
}
