use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use packer::{MAX_TILT_DEGREES, Shape};
use rand::Rng;
use serde::Deserialize;

use crate::{color::ColorChoice, error::ConfigError};

pub const FONT_EXTS: &[&str] = &["ttf", "otf"];
pub const BACKGROUND_EXTS: &[&str] = &["jpg", "jpeg", "png"];

/// Worker pool size. `-1` in config files means every available core.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "i64")]
pub enum WorkerCount {
    Fixed(usize),
    #[default]
    AllAvailable,
}

impl WorkerCount {
    pub fn resolve(self) -> usize {
        match self {
            WorkerCount::Fixed(n) => n,
            WorkerCount::AllAvailable => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl TryFrom<i64> for WorkerCount {
    type Error = ConfigError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        match n {
            -1 => Ok(WorkerCount::AllAvailable),
            n if n >= 1 => Ok(WorkerCount::Fixed(n as usize)),
            n => Err(ConfigError::invalid(
                "num_procs",
                format!("{n} (use -1 for all cores)"),
            )),
        }
    }
}

impl FromStr for WorkerCount {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: i64 = s
            .parse()
            .map_err(|_| ConfigError::invalid("num_procs", format!("{s:?} is not a number")))?;
        n.try_into()
    }
}

/// Per-sample rotation, in whole degrees, shared by every word of a sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RotationRepr")]
pub enum RotationMode {
    #[default]
    None,
    Fixed(i32),
    /// Uniform in `min..max`.
    Random { min: i32, max: i32 },
}

impl RotationMode {
    pub const DEFAULT_RANDOM: RotationMode = RotationMode::Random { min: -15, max: 15 };

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        match *self {
            RotationMode::None => 0,
            RotationMode::Fixed(deg) => deg,
            RotationMode::Random { min, max } if min >= max => min,
            RotationMode::Random { min, max } => rng.random_range(min..max),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RotationRepr {
    Flag(bool),
    Degrees(i32),
    Range { min: i32, max: i32 },
}

impl From<RotationRepr> for RotationMode {
    fn from(repr: RotationRepr) -> Self {
        match repr {
            RotationRepr::Flag(false) | RotationRepr::Degrees(0) => RotationMode::None,
            RotationRepr::Flag(true) => RotationMode::DEFAULT_RANDOM,
            RotationRepr::Degrees(deg) => RotationMode::Fixed(deg),
            RotationRepr::Range { min, max } => RotationMode::Random { min, max },
        }
    }
}

/// Either one file used for every sample or a directory to draw from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Dir(PathBuf),
}

impl Source {
    pub fn from_path(path: &Path, exts: &[&str]) -> Self {
        if has_ext(path, exts) {
            Source::File(path.to_path_buf())
        } else {
            Source::Dir(path.to_path_buf())
        }
    }
}

pub(crate) fn has_ext(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| exts.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub corpus: Option<PathBuf>,
    #[serde(rename = "N")]
    pub n: usize,
    pub num_procs: WorkerCount,
    pub save_interval: usize,
    /// Canvas height, width.
    pub shape: (u32, u32),
    pub min_text_length: usize,
    pub font_dir: PathBuf,
    pub font_size: Option<u32>,
    pub background_image_dir: PathBuf,
    pub color: ColorChoice,
    pub perspective_transform: Option<bool>,
    /// Row, column of the first word.
    pub start_word_xy: Option<(u32, u32)>,
    pub line_space: Option<u32>,
    pub word_space: Option<u32>,
    pub rotate_flag: RotationMode,
    pub sample_with_replace: bool,
    pub out_dir: PathBuf,
    pub seed: Option<u64>,
    /// Mask value behind each word before rotation.
    pub mask_fill: u8,
    /// Gaussian blur applied to glyphs; 0 disables it.
    pub blur_sigma: f32,
    pub image_format: ImageFormat,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            corpus: None,
            n: 100,
            num_procs: WorkerCount::AllAvailable,
            save_interval: 100,
            shape: (512, 512),
            min_text_length: 1,
            font_dir: PathBuf::from("fonts/sin"),
            font_size: None,
            background_image_dir: PathBuf::from("background"),
            color: ColorChoice::Random,
            perspective_transform: None,
            start_word_xy: None,
            line_space: None,
            word_space: None,
            rotate_flag: RotationMode::None,
            sample_with_replace: false,
            out_dir: PathBuf::from("out"),
            seed: None,
            mask_fill: 255,
            blur_sigma: 0.0,
            image_format: ImageFormat::Png,
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.save_interval == 0 {
            return Err(ConfigError::invalid("save_interval", "must be at least 1"));
        }
        if self.canvas_shape().is_empty() {
            return Err(ConfigError::invalid(
                "shape",
                format!("{}x{} has an empty side", self.shape.0, self.shape.1),
            ));
        }
        if self.font_size == Some(0) {
            return Err(ConfigError::invalid("font_size", "must be positive"));
        }
        if let WorkerCount::Fixed(0) = self.num_procs {
            return Err(ConfigError::invalid("num_procs", "must be at least 1"));
        }
        let tilt = |deg: i32| deg.unsigned_abs() <= MAX_TILT_DEGREES;
        match self.rotate_flag {
            RotationMode::Fixed(deg) if !tilt(deg) => {
                return Err(ConfigError::invalid(
                    "rotate_flag",
                    format!("{deg} is not within ±{MAX_TILT_DEGREES}"),
                ));
            }
            RotationMode::Random { min, max } if min > max || !tilt(min) || !tilt(max) => {
                return Err(ConfigError::invalid(
                    "rotate_flag",
                    format!("range {min}..{max} must be ordered and within ±{MAX_TILT_DEGREES}"),
                ));
            }
            _ => {}
        }
        if self.blur_sigma.is_nan() || self.blur_sigma < 0.0 {
            return Err(ConfigError::invalid("blur_sigma", "must be zero or positive"));
        }
        Ok(())
    }

    pub fn canvas_shape(&self) -> Shape {
        Shape::new(self.shape.0, self.shape.1)
    }

    pub fn font_source(&self) -> Source {
        Source::from_path(&self.font_dir, FONT_EXTS)
    }

    pub fn background_source(&self) -> Source {
        Source::from_path(&self.background_image_dir, BACKGROUND_EXTS)
    }
}
