use std::{fmt, str::FromStr};

use image::Rgb;
use rand::Rng;
use serde::{Deserialize, Deserializer, de};

use crate::error::ConfigError;

/// Text fill color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(pub Rgb<u8>);

impl Color {
    pub const STROKE: Color = Color(Rgb([0x28, 0x28, 0x28]));

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Color(Rgb(rng.random()))
    }

    /// Near-black: every channel below 20.
    pub fn random_dark<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Color(Rgb([
            rng.random_range(0..20),
            rng.random_range(0..20),
            rng.random_range(0..20),
        ]))
    }

    pub fn rgb(&self) -> Rgb<u8> {
        self.0
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "black" => return Ok(Color(Rgb([0, 0, 0]))),
            "white" => return Ok(Color(Rgb([255, 255, 255]))),
            _ => {}
        }
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ConfigError::invalid("color", format!("{s:?} is not #RRGGBB")))?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::invalid("color", format!("{s:?} is not #RRGGBB")));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| ConfigError::invalid("color", e.to_string()))
        };
        Ok(Color(Rgb([channel(0)?, channel(2)?, channel(4)?])))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Rgb([r, g, b]) = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}")
    }
}

/// How each sample's text color is picked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorChoice {
    #[default]
    Random,
    Dark,
    Fixed(Color),
}

impl ColorChoice {
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Color {
        match self {
            ColorChoice::Random => Color::random(rng),
            ColorChoice::Dark => Color::random_dark(rng),
            ColorChoice::Fixed(c) => *c,
        }
    }
}

impl FromStr for ColorChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(ColorChoice::Random),
            "dark" => Ok(ColorChoice::Dark),
            other => other.parse().map(ColorChoice::Fixed),
        }
    }
}

impl<'de> Deserialize<'de> for ColorChoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
