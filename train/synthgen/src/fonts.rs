use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

use crate::error::RenderError;

static FONT_CACHE: OnceLock<FontCache> = OnceLock::new();

/// Raw font file, readable both as outlines and as shaping tables.
#[derive(Debug)]
pub struct FontFace {
    path: PathBuf,
    data: Vec<u8>,
}

impl FontFace {
    /// Checks both views parse before accepting the bytes.
    pub fn parse(path: &Path, data: Vec<u8>) -> Result<Self, RenderError> {
        let face = Self {
            path: path.to_path_buf(),
            data,
        };
        face.outlines()?;
        face.tables()?;
        Ok(face)
    }

    pub fn outlines(&self) -> Result<ab_glyph::FontRef<'_>, RenderError> {
        ab_glyph::FontRef::try_from_slice(&self.data).map_err(|_| self.invalid())
    }

    pub fn tables(&self) -> Result<harfrust::FontRef<'_>, RenderError> {
        harfrust::FontRef::new(&self.data).map_err(|_| self.invalid())
    }

    fn invalid(&self) -> RenderError {
        RenderError::InvalidFont {
            path: self.path.clone(),
        }
    }
}

/// Parsed fonts keyed by file path, shared by all workers.
#[derive(Default)]
pub struct FontCache {
    fonts: Mutex<HashMap<PathBuf, Arc<FontFace>>>,
}

impl FontCache {
    pub fn global() -> &'static FontCache {
        FONT_CACHE.get_or_init(FontCache::default)
    }

    pub fn get(&self, path: &Path) -> Result<Arc<FontFace>, RenderError> {
        if let Some(font) = self.lock().get(path) {
            return Ok(font.clone());
        }

        // parse outside the lock; a racing worker just parses twice
        let font = Self::load(path)?;
        self.lock().insert(path.to_path_buf(), font.clone());
        Ok(font)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<FontFace>>> {
        self.fonts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(path: &Path) -> Result<Arc<FontFace>, RenderError> {
        let bytes = std::fs::read(path).map_err(|source| RenderError::FontRead {
            path: path.to_path_buf(),
            source,
        })?;
        FontFace::parse(path, bytes).map(Arc::new)
    }
}
