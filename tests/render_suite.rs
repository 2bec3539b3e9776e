use tui_lightshow::color::Rgb;
use tui_lightshow::render::{draw_overlay_popup, wrap_text, Frame, HalfBlockRenderer, Renderer};
use tui_lightshow::surface::{PixmapSurface, Surface};

/// Build a solid-color RGBA pixel buffer.
fn solid_pixels(w: usize, h: usize, r: u8, g: u8, b: u8) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for px in buf.chunks_exact_mut(4) {
        px[0] = r;
        px[1] = g;
        px[2] = b;
        px[3] = 255;
    }
    buf
}

/// Even pixel rows in one color, odd rows in another.
fn striped_pixels(w: usize, h: usize, top: (u8, u8, u8), bottom: (u8, u8, u8)) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for y in 0..h {
        let c = if y % 2 == 0 { top } else { bottom };
        for x in 0..w {
            let i = (y * w + x) * 4;
            buf[i] = c.0;
            buf[i + 1] = c.1;
            buf[i + 2] = c.2;
            buf[i + 3] = 255;
        }
    }
    buf
}

fn make_frame<'a>(cols: u16, visual_rows: u16, pixels: &'a [u8], sync: bool) -> Frame<'a> {
    Frame {
        term_cols: cols,
        term_rows: visual_rows + 2,
        visual_rows,
        pixel_width: cols as usize,
        pixel_height: visual_rows as usize * 2,
        pixels_rgba: pixels,
        hud: "#00 Ring (sin) | spd 50",
        hud_rows: 1,
        overlay: None,
        sync_updates: sync,
    }
}

fn render_to_string(frame: &Frame<'_>) -> String {
    let mut out = Vec::new();
    HalfBlockRenderer::new()
        .render(frame, &mut out)
        .expect("render");
    String::from_utf8(out).expect("utf8 output")
}

#[test]
fn halfblock_renders_solid_frame() {
    let pixels = solid_pixels(10, 10, 200, 200, 200);
    let s = render_to_string(&make_frame(10, 5, &pixels, false));
    assert!(s.contains("\x1b[?7l"), "missing autowrap-off");
    assert!(s.contains("\x1b[?7h"), "missing autowrap-on");
    assert!(s.contains("38;2;200;200;200"), "missing FG color");
    assert!(s.contains("48;2;200;200;200"), "missing BG color");
    assert_eq!(s.matches('\u{2580}').count(), 50, "one glyph per cell");
    assert!(s.contains("#00 Ring ("), "HUD text missing");
}

#[test]
fn halfblock_clips_hud_to_terminal_width() {
    let pixels = solid_pixels(10, 10, 0, 0, 0);
    let narrow = render_to_string(&make_frame(10, 5, &pixels, false));
    assert!(narrow.contains("#00 Ring ("));
    assert!(!narrow.contains("Ring (s"), "HUD line ran past 10 columns");

    let pixels = solid_pixels(40, 10, 0, 0, 0);
    let wide = render_to_string(&make_frame(40, 5, &pixels, false));
    assert!(wide.contains("#00 Ring (sin) | spd 50"), "wide terminal shows the full line");
}

#[test]
fn halfblock_maps_upper_pixel_to_foreground() {
    let pixels = striped_pixels(4, 4, (255, 0, 0), (0, 0, 255));
    let s = render_to_string(&make_frame(4, 2, &pixels, false));
    assert!(s.contains("38;2;255;0;0"), "upper pixel should be the foreground");
    assert!(s.contains("48;2;0;0;255"), "lower pixel should be the background");
    assert!(!s.contains("38;2;0;0;255"), "lower pixel leaked into the foreground");
}

#[test]
fn halfblock_skips_repeated_color_escapes() {
    let pixels = solid_pixels(8, 6, 10, 20, 30);
    let s = render_to_string(&make_frame(8, 3, &pixels, false));
    assert_eq!(s.matches("38;2;").count(), 1, "uniform frame needs one FG escape");
    assert_eq!(s.matches("48;2;").count(), 1, "uniform frame needs one BG escape");
}

#[test]
fn halfblock_sync_markers_follow_flag() {
    let pixels = solid_pixels(4, 4, 1, 2, 3);
    let on = render_to_string(&make_frame(4, 2, &pixels, true));
    assert!(on.starts_with("\x1b[?2026h"), "sync begin missing");
    assert!(on.contains("\x1b[?2026l"), "sync end missing");
    let off = render_to_string(&make_frame(4, 2, &pixels, false));
    assert!(!off.contains("2026"), "sync markers emitted while disabled");
}

#[test]
fn halfblock_ignores_stale_geometry() {
    let pixels = solid_pixels(4, 4, 1, 2, 3);
    let mut frame = make_frame(4, 2, &pixels, false);
    frame.pixel_width = 3;
    let s = render_to_string(&frame);
    assert!(s.is_empty(), "mismatched pixel size should draw nothing");
}

#[test]
fn halfblock_rejects_short_buffer() {
    let pixels = vec![0u8; 8];
    let frame = make_frame(4, 2, &pixels, false);
    let mut out = Vec::new();
    let err = HalfBlockRenderer::new().render(&frame, &mut out);
    assert!(err.is_err(), "short pixel buffer must be an error");
}

#[test]
fn halfblock_draws_overlay_popup() {
    let pixels = solid_pixels(40, 20, 0, 0, 0);
    let mut frame = make_frame(40, 10, &pixels, false);
    frame.term_rows = 12;
    frame.overlay = Some("Light Show Keys\nq quit");
    let s = render_to_string(&frame);
    assert!(s.contains("Light Show Keys"), "title missing");
    assert!(s.contains("| q quit"), "body line missing");
    assert!(s.contains("+---"), "border missing");
}

#[test]
fn halfblock_name() {
    assert_eq!(HalfBlockRenderer::new().name(), "halfblock");
}

#[test]
fn overlay_skips_tiny_terminals() {
    let mut out = Vec::new();
    draw_overlay_popup(&mut out, 6, 3, "Title\nbody").expect("popup");
    assert!(out.is_empty());
    draw_overlay_popup(&mut out, 40, 10, "   ").expect("popup");
    assert!(out.is_empty());
}

#[test]
fn wrap_text_keeps_words_and_splits_long_ones() {
    assert_eq!(wrap_text("aa bb cc", 5), vec!["aa bb", "cc"]);
    assert_eq!(wrap_text("abcdefg", 3), vec!["abc", "def", "g"]);
    assert_eq!(wrap_text("one\n\ntwo", 10), vec!["one", "", "two"]);
}

#[test]
fn pixmap_surface_feeds_the_presenter() {
    let mut surface = PixmapSurface::new(16, 8).expect("pixmap");
    surface.fill_rect(0.0, 0.0, 16.0, 8.0, Rgb::new(0, 255, 0));
    let frame = make_frame(16, 4, surface.pixels(), false);
    let s = render_to_string(&frame);
    assert!(s.contains("38;2;0;255;0"), "pixmap color should reach the terminal");
}
