use crate::color::{ColorParseError, Rgb};
use crate::motion::MotionPath;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tui-lightshow",
    version,
    about = "Audio-reactive light show presets rendered in the terminal"
)]
pub struct Config {
    #[arg(long, value_enum, default_value_t = AudioSource::Mic)]
    pub source: AudioSource,

    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    /// Preset index or a case-insensitive name substring.
    #[arg(long)]
    pub preset: Option<String>,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    #[arg(long, default_value_t = 50.0, value_parser = parse_percent)]
    pub speed: f32,

    #[arg(long, default_value_t = 50.0, value_parser = parse_percent)]
    pub size: f32,

    #[arg(long, default_value_t = 100.0, value_parser = parse_percent)]
    pub brightness: f32,

    #[arg(long, default_value_t = 0.0, value_parser = parse_percent)]
    pub strobe: f32,

    #[arg(long, default_value_t = 0.0, value_parser = parse_percent)]
    pub shading: f32,

    #[arg(long, default_value = "#ff0000", value_parser = parse_color)]
    pub color_a: Rgb,

    #[arg(long, default_value = "#0020ff", value_parser = parse_color)]
    pub color_b: Rgb,

    #[arg(long, default_value_t = false)]
    pub multicolor: bool,

    #[arg(long, value_enum, default_value_t = MotionPath::Off)]
    pub motion: MotionPath,

    /// Motion transition speed; higher blends faster.
    #[arg(long, default_value_t = 50.0, value_parser = parse_percent)]
    pub transition: f32,

    /// Enable beat detection.
    #[arg(long, default_value_t = false)]
    pub beat: bool,

    #[arg(long, default_value_t = 0.6, value_parser = parse_unit)]
    pub sensitivity: f32,

    #[arg(long, default_value_t = 120.0)]
    pub cooldown_ms: f64,

    #[arg(long, default_value_t = 1.0)]
    pub mic_gain: f32,

    #[arg(long, default_value_t = false)]
    pub auto_color: bool,

    #[arg(long, default_value_t = false)]
    pub auto_preset: bool,

    /// World units spanning the drawable width; sets the device pixel ratio.
    #[arg(long, default_value_t = 960.0)]
    pub world_width: f32,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AudioSource {
    Mic,
    #[value(alias = "test")]
    Tone,
    #[value(alias = "off")]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> tracing::level_filters::LevelFilter {
        use tracing::level_filters::LevelFilter;
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

fn parse_color(raw: &str) -> Result<Rgb, ColorParseError> {
    Rgb::parse_hex(raw)
}

fn parse_percent(raw: &str) -> Result<f32, String> {
    parse_ranged(raw, 0.0, 100.0)
}

fn parse_unit(raw: &str) -> Result<f32, String> {
    parse_ranged(raw, 0.0, 1.0)
}

fn parse_ranged(raw: &str, lo: f32, hi: f32) -> Result<f32, String> {
    let v: f32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{raw:?} is not a number"))?;
    if !v.is_finite() || v < lo || v > hi {
        return Err(format!("{v} is outside {lo}..={hi}"));
    }
    Ok(v)
}

impl Config {
    /// Resolves `--preset` against the catalog names.
    pub fn preset_index(&self, names: &[&str]) -> Option<usize> {
        let raw = self.preset.as_deref()?.trim();
        if let Ok(idx) = raw.parse::<usize>() {
            return (idx < names.len()).then_some(idx);
        }
        let q = raw.to_ascii_lowercase();
        names
            .iter()
            .position(|n| n.to_ascii_lowercase().contains(&q))
    }
}
