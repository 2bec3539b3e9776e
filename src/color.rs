use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from unbounded channel values, clamping each to 0..=255.
    pub fn clamped(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: clamp_channel(r),
            g: clamp_channel(g),
            b: clamp_channel(b),
        }
    }

    /// Multiplies every channel by `k` (0 = black, 1 = unchanged).
    pub fn scaled(self, k: f32) -> Self {
        let k = if k.is_finite() { k.max(0.0) } else { 0.0 };
        Self::clamped(self.r as f32 * k, self.g as f32 * k, self.b as f32 * k)
    }

    pub fn parse_hex(raw: &str) -> Result<Self, ColorParseError> {
        let s = raw.trim();
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.is_ascii() {
            return Err(ColorParseError::Digit(hex.to_string()));
        }
        if hex.len() != 6 {
            return Err(ColorParseError::Length(hex.len()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| ColorParseError::Digit(hex[i..i + 2].to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    Length(usize),
    Digit(String),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(n) => write!(f, "expected 6 hex digits (#rrggbb), got {n}"),
            Self::Digit(d) => write!(f, "invalid hex pair: {d:?}"),
        }
    }
}

impl std::error::Error for ColorParseError {}

pub const PALETTE: [Rgb; 12] = [
    Rgb::new(255, 0, 0),
    Rgb::new(255, 128, 0),
    Rgb::new(255, 230, 0),
    Rgb::new(128, 255, 0),
    Rgb::new(0, 255, 64),
    Rgb::new(0, 255, 200),
    Rgb::new(0, 160, 255),
    Rgb::new(0, 32, 255),
    Rgb::new(128, 0, 255),
    Rgb::new(255, 0, 200),
    Rgb::new(255, 96, 128),
    Rgb::new(255, 255, 255),
];

/// Euclidean distance in RGB space.
pub fn distance(a: Rgb, b: Rgb) -> f32 {
    let dr = a.r as f32 - b.r as f32;
    let dg = a.g as f32 - b.g as f32;
    let db = a.b as f32 - b.b as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// The palette swatch farthest from `base`. Ties resolve to the earliest swatch.
pub fn contrast_pick(base: Rgb) -> Rgb {
    let mut best = PALETTE[0];
    let mut best_d = -1.0f32;
    for &c in &PALETTE {
        let d = distance(base, c);
        if d > best_d {
            best = c;
            best_d = d;
        }
    }
    best
}

pub fn random_swatch(rng: &mut fastrand::Rng) -> Rgb {
    PALETTE[rng.usize(..PALETTE.len())]
}

/// Which of the two colors element `index` takes: 1 for odd indices when
/// multicolor is on, 0 otherwise.
#[inline]
pub fn alternation_slot(index: usize, multicolor: bool) -> usize {
    usize::from(multicolor && index % 2 == 1)
}

/// Two-color alternation shared by every preset that alternates colors.
#[inline]
pub fn alternate(index: usize, multicolor: bool, a: Rgb, b: Rgb) -> Rgb {
    if alternation_slot(index, multicolor) == 1 { b } else { a }
}

fn clamp_channel(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_and_errors() {
        let c = Rgb::parse_hex("#ff8000").expect("valid hex");
        assert_eq!(c, Rgb::new(255, 128, 0));
        assert_eq!(c.to_hex(), "#ff8000");
        assert_eq!(Rgb::parse_hex("00ff00"), Ok(Rgb::new(0, 255, 0)));
        assert!(matches!(Rgb::parse_hex("#fff"), Err(ColorParseError::Length(3))));
        assert!(matches!(Rgb::parse_hex("#gg0000"), Err(ColorParseError::Digit(_))));
    }

    #[test]
    fn contrast_pick_is_far_from_base() {
        let white = contrast_pick(Rgb::BLACK);
        assert_eq!(white, Rgb::WHITE);
        for &c in &PALETTE {
            let pick = contrast_pick(c);
            assert_ne!(pick, c);
            assert!(distance(pick, c) > 200.0);
        }
    }

    #[test]
    fn clamped_and_scaled_stay_in_range() {
        assert_eq!(Rgb::clamped(-10.0, 300.0, f32::NAN), Rgb::new(0, 255, 0));
        assert_eq!(Rgb::new(200, 100, 50).scaled(0.5), Rgb::new(100, 50, 25));
        assert_eq!(Rgb::new(200, 100, 50).scaled(f32::INFINITY), Rgb::BLACK);
    }
}
