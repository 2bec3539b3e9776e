mod halfblock;

pub use halfblock::HalfBlockRenderer;

use std::io::Write;

/// One presented frame: an RGBA pixel grid two pixels tall per text row,
/// plus the text drawn under and over it.
pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    pub hud: &'a str,
    pub hud_rows: u16,
    pub overlay: Option<&'a str>,
    pub sync_updates: bool,
}

impl Frame<'_> {
    /// Pixel size a presenter expects for this terminal geometry.
    pub fn expected_pixels(cols: u16, visual_rows: u16) -> (usize, usize) {
        (cols as usize, visual_rows as usize * 2)
    }
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

/// Greedy word wrap to `width` columns; words longer than a line are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for raw in text.lines() {
        let mut cur = String::new();
        let mut cur_len = 0usize;
        for word in raw.split(' ') {
            let mut word: Vec<char> = word.chars().collect();
            loop {
                let gap = usize::from(cur_len > 0);
                if cur_len + gap + word.len() <= width {
                    if gap == 1 {
                        cur.push(' ');
                    }
                    cur.extend(word.iter());
                    cur_len += gap + word.len();
                    break;
                }
                if cur_len > 0 {
                    lines.push(std::mem::take(&mut cur));
                    cur_len = 0;
                    continue;
                }
                let rest = word.split_off(width);
                lines.push(word.iter().collect());
                word = rest;
            }
        }
        lines.push(cur);
    }
    lines
}

/// Centered boxed popup over a dimmed backdrop; the first line is the title.
pub fn draw_overlay_popup(
    out: &mut dyn Write,
    term_cols: u16,
    term_rows: u16,
    text: &str,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let cols = term_cols as usize;
    let rows = term_rows as usize;
    if cols < 8 || rows < 4 {
        return Ok(());
    }

    let lines = wrap_text(text, cols.saturating_sub(6));
    let inner_w = lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(1, cols.saturating_sub(6).max(1));
    let box_w = inner_w + 4;
    let body_h = lines.len().min(rows.saturating_sub(3).max(1));
    let box_h = body_h + 2;

    let start_col = (cols.saturating_sub(box_w)) / 2 + 1;
    let start_row = (rows.saturating_sub(box_h)) / 2 + 1;
    let edge = format!("+{}+", "-".repeat(box_w - 2));

    out.write_all(b"\x1b[0m\x1b[38;2;236;242;255m\x1b[48;2;8;10;18m")?;
    write!(out, "\x1b[{};{}H{}", start_row, start_col, edge)?;
    for (i, line) in lines.iter().take(body_h).enumerate() {
        let row = start_row + 1 + i;
        let pad = inner_w.saturating_sub(line.chars().count());
        if i == 0 {
            write!(
                out,
                "\x1b[{};{}H| \x1b[1m\x1b[38;2;255;220;120m{}\x1b[22m\x1b[38;2;236;242;255m{} |",
                row,
                start_col,
                line,
                " ".repeat(pad)
            )?;
        } else {
            write!(
                out,
                "\x1b[{};{}H| {}{} |",
                row,
                start_col,
                line,
                " ".repeat(pad)
            )?;
        }
    }
    write!(out, "\x1b[{};{}H{}", start_row + box_h - 1, start_col, edge)?;
    out.write_all(b"\x1b[0m")?;
    Ok(())
}
