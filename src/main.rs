use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tui_lightshow::config::Config;

fn init_logging(cfg: &Config) -> Result<()> {
    // The terminal is in raw alternate-screen mode while running, so
    // anything below error level only goes to an explicit log file.
    match &cfg.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_max_level(cfg.log_level.as_filter())
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_max_level(LevelFilter::ERROR)
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cfg = Config::parse();
    if cfg.list_devices {
        tui_lightshow::audio::list_input_devices()?;
        return Ok(());
    }

    init_logging(&cfg)?;
    // Preset panics are caught per frame; route the report through the
    // subscriber instead of printing over the alternate screen.
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(%info, "panic");
    }));
    tui_lightshow::app::run(cfg)
}
