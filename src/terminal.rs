use anyhow::Context;
use crossterm::{
    cursor,
    terminal::{self, ClearType},
    ExecutableCommand,
};
use std::io::{stdout, Stdout, Write};

/// Raw mode plus alternate screen for as long as the guard lives.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        // Drop undoes raw mode even if a later step fails.
        let guard = Self { _private: () };

        let mut out = stdout();
        out.execute(terminal::EnterAlternateScreen)
            .context("enter alternate screen")?;
        out.execute(terminal::Clear(ClearType::All))
            .context("clear screen")?;
        out.execute(cursor::Hide).context("hide cursor")?;
        tracing::debug!("terminal entered raw alternate screen");

        Ok(guard)
    }

    pub fn stdout() -> Stdout {
        stdout()
    }

    /// Current size in cells, never smaller than 1x1.
    pub fn size() -> anyhow::Result<(u16, u16)> {
        let (cols, rows) = terminal::size().context("query terminal size")?;
        Ok((cols.max(1), rows.max(1)))
    }

    /// Wipes the screen, used after a resize leaves stale cells behind.
    pub fn clear(out: &mut dyn Write) -> anyhow::Result<()> {
        out.write_all(b"\x1b[0m\x1b[2J")?;
        Ok(())
    }
}

/// Terminal state to put back when leaving: sync output off, autowrap on, colors reset.
pub const RESTORE_SEQUENCE: &[u8] = b"\x1b[?2026l\x1b[?7h\x1b[0m";

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut out = stdout();
        let _ = out.write_all(RESTORE_SEQUENCE);
        let _ = out.flush();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
    }
}
