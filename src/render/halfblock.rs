use crate::render::{draw_overlay_popup, Frame, Renderer};
use std::io::Write;

const HALF_BLOCK: char = '\u{2580}';

/// Truecolor half-block presenter: the upper pixel is the glyph foreground,
/// the lower pixel its background.
#[derive(Default)]
pub struct HalfBlockRenderer {
    last_fg: Option<(u8, u8, u8)>,
    last_bg: Option<(u8, u8, u8)>,
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_fg(&mut self, out: &mut dyn Write, c: (u8, u8, u8)) -> std::io::Result<()> {
        if self.last_fg != Some(c) {
            write!(out, "\x1b[38;2;{};{};{}m", c.0, c.1, c.2)?;
            self.last_fg = Some(c);
        }
        Ok(())
    }

    fn set_bg(&mut self, out: &mut dyn Write, c: (u8, u8, u8)) -> std::io::Result<()> {
        if self.last_bg != Some(c) {
            write!(out, "\x1b[48;2;{};{};{}m", c.0, c.1, c.2)?;
            self.last_bg = Some(c);
        }
        Ok(())
    }

    fn paint_pixels(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let w = frame.pixel_width;
        let px = |x: usize, y: usize| {
            let i = (y * w + x) * 4;
            (
                frame.pixels_rgba[i],
                frame.pixels_rgba[i + 1],
                frame.pixels_rgba[i + 2],
            )
        };
        for row in 0..frame.visual_rows as usize {
            write!(out, "\x1b[{};1H", row + 1)?;
            for x in 0..w {
                self.set_fg(out, px(x, row * 2))?;
                self.set_bg(out, px(x, row * 2 + 1))?;
                write!(out, "{HALF_BLOCK}")?;
            }
        }
        Ok(())
    }
}

fn paint_hud(frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
    let cols = frame.term_cols as usize;
    let mut lines = frame.hud.lines();
    for i in 0..frame.hud_rows as usize {
        write!(
            out,
            "\x1b[{};1H\x1b[0m\x1b[2K",
            frame.visual_rows as usize + i + 1
        )?;
        if let Some(line) = lines.next() {
            let clipped: String = line.chars().take(cols).collect();
            write!(out, "{clipped}")?;
        }
    }
    Ok(())
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "halfblock"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let (w, h) = (frame.pixel_width, frame.pixel_height);
        if frame.term_cols == 0 || frame.visual_rows == 0 || w == 0 || h == 0 {
            return Ok(());
        }
        if (w, h) != Frame::expected_pixels(frame.term_cols, frame.visual_rows) {
            return Ok(());
        }
        let need = w.saturating_mul(h).saturating_mul(4);
        if frame.pixels_rgba.len() < need {
            anyhow::bail!(
                "pixel buffer too small (need {need}, got {})",
                frame.pixels_rgba.len()
            );
        }

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }
        // Autowrap off while full-width rows are painted.
        out.write_all(b"\x1b[0m\x1b[?7l")?;
        self.last_fg = None;
        self.last_bg = None;

        self.paint_pixels(frame, out)?;
        paint_hud(frame, out)?;
        if let Some(text) = frame.overlay {
            draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
        }

        out.write_all(b"\x1b[0m\x1b[?7h")?;
        if frame.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        Ok(())
    }
}
