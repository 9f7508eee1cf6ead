use std::{
    fs,
    path::{Path, PathBuf},
};

use log::warn;
use rand::{Rng, seq::index};

use crate::error::ResourceError;

/// Lines of source text, already filtered by length.
#[derive(Clone, Debug)]
pub struct Corpus {
    source: PathBuf,
    lines: Vec<String>,
}

impl Corpus {
    /// Reads a newline-delimited file, keeping lines with more than
    /// `min_len` characters.
    pub fn load(path: &Path, min_len: usize) -> Result<Self, ResourceError> {
        if !path.exists() {
            return Err(ResourceError::Missing(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| ResourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::from_lines(path, text.lines(), min_len);
        if corpus.is_empty() {
            return Err(ResourceError::EmptyCorpus(path.to_path_buf()));
        }
        Ok(corpus)
    }

    pub fn from_lines<I, S>(source: impl Into<PathBuf>, lines: I, min_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .filter(|l| l.chars().count() > min_len)
            .collect();
        Self {
            source: source.into(),
            lines,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Draws `n` lines. Asking for more distinct lines than exist falls
    /// back to drawing with replacement.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        n: usize,
        with_replacement: bool,
        rng: &mut R,
    ) -> Vec<String> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut with_replacement = with_replacement;
        if !with_replacement && n > self.len() {
            warn!(
                "requested {n} samples but {} has only {} usable lines; drawing with replacement",
                self.source.display(),
                self.len()
            );
            with_replacement = true;
        }

        if with_replacement {
            (0..n)
                .map(|_| self.lines[rng.random_range(0..self.len())].clone())
                .collect()
        } else {
            index::sample(rng, self.len(), n)
                .into_iter()
                .map(|i| self.lines[i].clone())
                .collect()
        }
    }
}
