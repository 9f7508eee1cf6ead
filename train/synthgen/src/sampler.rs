use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;
use packer::{PackOptions, Point, Shape};
use rand::Rng;

use crate::{
    color::{Color, ColorChoice},
    config::{BACKGROUND_EXTS, FONT_EXTS, GeneratorConfig, RotationMode, Source, has_ext},
    corpus::Corpus,
    error::ResourceError,
};

pub const FONT_SIZE_RANGE: std::ops::Range<u32> = 20..50;

/// Everything needed to produce one sample.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderParameters {
    pub text: String,
    pub font_path: PathBuf,
    pub font_size: u32,
    pub color: Color,
    pub background_path: PathBuf,
    pub perspective: bool,
    pub start: Option<Point>,
    pub word_spacing: Option<u32>,
    pub line_spacing: Option<u32>,
    pub rotation: RotationMode,
}

impl RenderParameters {
    /// Layout knobs for a canvas of `shape`; unset ones are drawn at pack time.
    pub fn pack_options(&self, shape: Shape) -> PackOptions {
        PackOptions {
            shape,
            start: self.start,
            word_spacing: self.word_spacing,
            line_spacing: self.line_spacing,
        }
    }
}

/// A non-empty set of files to draw from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choices {
    first: PathBuf,
    rest: Vec<PathBuf>,
}

impl Choices {
    pub fn single(path: PathBuf) -> Self {
        Self {
            first: path,
            rest: Vec::new(),
        }
    }

    pub fn new(paths: Vec<PathBuf>) -> Option<Self> {
        let mut paths = paths.into_iter();
        let first = paths.next()?;
        Some(Self {
            first,
            rest: paths.collect(),
        })
    }

    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.first).chain(&self.rest)
    }

    /// Uniform draw. A single file is an explicit override and costs no draw.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &PathBuf {
        if self.rest.is_empty() {
            return &self.first;
        }
        match rng.random_range(0..self.len()) {
            0 => &self.first,
            i => &self.rest[i - 1],
        }
    }
}

/// Font and background files available to the sampler.
#[derive(Clone, Debug)]
pub struct Resources {
    pub fonts: Choices,
    pub backgrounds: Choices,
}

impl Resources {
    pub fn resolve(fonts: &Source, backgrounds: &Source) -> Result<Self, ResourceError> {
        let fonts = expand(fonts, FONT_EXTS)?;
        let backgrounds = expand(backgrounds, BACKGROUND_EXTS)?;
        info!(
            "{} font(s), {} background(s) available",
            fonts.len(),
            backgrounds.len()
        );
        Ok(Self { fonts, backgrounds })
    }
}

fn expand(source: &Source, exts: &[&str]) -> Result<Choices, ResourceError> {
    match source {
        Source::File(path) if path.is_file() => Ok(Choices::single(path.clone())),
        Source::File(path) => Err(ResourceError::Missing(path.clone())),
        Source::Dir(dir) => list_files(dir, exts),
    }
}

/// Files in `dir` with one of `exts`, sorted so draws are reproducible.
pub fn list_files(dir: &Path, exts: &[&str]) -> Result<Choices, ResourceError> {
    if !dir.is_dir() {
        return Err(ResourceError::Missing(dir.to_path_buf()));
    }
    let entries = fs::read_dir(dir).map_err(|source| ResourceError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_ext(p, exts))
        .collect();
    files.sort();
    Choices::new(files).ok_or_else(|| ResourceError::NoMatches {
        dir: dir.to_path_buf(),
        exts: exts.join("/"),
    })
}

/// Fixed values that replace the per-sample random draws.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub font_size: Option<u32>,
    pub color: ColorChoice,
    pub perspective: Option<bool>,
    pub start: Option<Point>,
    pub word_spacing: Option<u32>,
    pub line_spacing: Option<u32>,
    pub rotation: RotationMode,
    pub with_replacement: bool,
}

impl From<&GeneratorConfig> for Overrides {
    fn from(cfg: &GeneratorConfig) -> Self {
        Self {
            font_size: cfg.font_size,
            color: cfg.color,
            perspective: cfg.perspective_transform,
            start: cfg.start_word_xy.map(|(x, y)| Point::new(x, y)),
            word_spacing: cfg.word_space,
            line_spacing: cfg.line_space,
            rotation: cfg.rotate_flag,
            with_replacement: cfg.sample_with_replace,
        }
    }
}

pub struct ParameterSampler {
    resources: Resources,
    overrides: Overrides,
}

impl ParameterSampler {
    pub fn new(resources: Resources, overrides: Overrides) -> Self {
        Self {
            resources,
            overrides,
        }
    }

    /// Draws `n` independent parameter sets, texts included.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        n: usize,
        corpus: &Corpus,
        rng: &mut R,
    ) -> Vec<RenderParameters> {
        let texts = corpus.sample(n, self.overrides.with_replacement, rng);
        texts.into_iter().map(|text| self.draw(text, rng)).collect()
    }

    fn draw<R: Rng + ?Sized>(&self, text: String, rng: &mut R) -> RenderParameters {
        let o = &self.overrides;
        RenderParameters {
            text,
            font_path: self.resources.fonts.pick(rng).clone(),
            font_size: o
                .font_size
                .unwrap_or_else(|| rng.random_range(FONT_SIZE_RANGE)),
            color: o.color.pick(rng),
            background_path: self.resources.backgrounds.pick(rng).clone(),
            perspective: o.perspective.unwrap_or_else(|| rng.random_bool(0.5)),
            start: o.start,
            word_spacing: o.word_spacing,
            line_spacing: o.line_spacing,
            rotation: o.rotation,
        }
    }
}
