use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
};

use image::DynamicImage;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::{config::ImageFormat, error::RunError, generator::SampleResult};

/// Output tree: `images/`, `masks/` and a single `labels.json`.
#[derive(Clone, Debug)]
pub struct OutputWriter {
    root: PathBuf,
    format: ImageFormat,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>, format: ImageFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.root.join("images"))?;
        fs::create_dir_all(self.root.join("masks"))
    }

    pub fn image_path(&self, id: &str) -> PathBuf {
        self.root
            .join("images")
            .join(format!("image_{id}.{}", self.format.extension()))
    }

    pub fn mask_path(&self, id: &str) -> PathBuf {
        self.root
            .join("masks")
            .join(format!("mask_{id}.{}", self.format.extension()))
    }

    pub fn labels_path(&self) -> PathBuf {
        self.root.join("labels.json")
    }

    pub fn save_sample(&self, sample: &SampleResult) -> image::ImageResult<()> {
        let id = sample.labels.id.as_str();
        match self.format {
            ImageFormat::Png => sample.image.save(self.image_path(id))?,
            ImageFormat::Jpg => DynamicImage::ImageRgba8(sample.image.clone())
                .to_rgb8()
                .save(self.image_path(id))?,
        }
        sample.mask.save(self.mask_path(id))
    }

    /// Writes every label group as one pretty-printed UTF-8 JSON array.
    /// Non-ASCII text is kept as-is.
    pub fn write_labels<T: Serialize>(&self, labels: &[T]) -> Result<PathBuf, RunError> {
        let path = self.labels_path();
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        let mut ser =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        labels.serialize(&mut ser)?;
        writer.flush()?;
        Ok(path)
    }
}
