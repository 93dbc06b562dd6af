use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Parses `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.len() != 6 || !s.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        Some(Self(channel(0)?, channel(2)?, channel(4)?))
    }

    /// WCAG relative luminance in [0, 1].
    pub fn luminance(self) -> f64 {
        fn linear(c: u8) -> f64 {
            let c = c as f64 / 255.0;
            if c <= 0.039_28 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linear(self.0) + 0.7152 * linear(self.1) + 0.0722 * linear(self.2)
    }

    fn lerp(start: Rgb, end: Rgb, fraction: f64) -> Rgb {
        let fraction = fraction.clamp(0.0, 1.0);
        let channel =
            |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * fraction + 0.5) as u8;
        Rgb(
            channel(start.0, end.0),
            channel(start.1, end.1),
            channel(start.2, end.2),
        )
    }
}

pub const NEGATIVE_COLOR: Rgb = Rgb(33, 102, 172);
pub const NEUTRAL_COLOR: Rgb = Rgb(247, 247, 247);
pub const POSITIVE_COLOR: Rgb = Rgb(178, 24, 43);

/// Diverging three-anchor scale: `negative` at -1, `neutral` at 0, `positive` at +1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScale {
    pub negative: Rgb,
    pub neutral: Rgb,
    pub positive: Rgb,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            negative: NEGATIVE_COLOR,
            neutral: NEUTRAL_COLOR,
            positive: POSITIVE_COLOR,
        }
    }
}

impl ColorScale {
    pub fn to_rgb(&self, value: f64) -> Rgb {
        if value.is_nan() {
            return self.neutral;
        }
        let clamped = value.clamp(-1.0, 1.0);
        if clamped >= 0.0 {
            Rgb::lerp(self.neutral, self.positive, clamped)
        } else {
            Rgb::lerp(self.negative, self.neutral, 1.0 + clamped)
        }
    }

    pub fn to_hex(&self, value: f64) -> String {
        self.to_rgb(value).to_hex()
    }

    /// Legend stops as `(position in [0, 1], color)` for correlations -1, -0.5, 0, 0.5, 1.
    pub fn legend_stops(&self) -> Vec<(f64, String)> {
        [-1.0, -0.5, 0.0, 0.5, 1.0]
            .into_iter()
            .map(|v: f64| ((v + 1.0) / 2.0, self.to_hex(v)))
            .collect()
    }
}

/// Maps a correlation to a `#rrggbb` color on the default diverging scale.
/// Values outside [-1, 1] are clamped.
pub fn correlation_to_hex(value: f64) -> String {
    ColorScale::default().to_hex(value)
}

pub fn legend_stops() -> Vec<(f64, String)> {
    ColorScale::default().legend_stops()
}
