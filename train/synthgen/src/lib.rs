//! Synthetic Sinhala text images for OCR and text detection training.
//!
//! Each sample renders a line of corpus text word by word, packs the word
//! bitmaps onto a background photo and emits the composed image, a
//! segmentation mask and per-word bounding boxes.

pub mod batch;
pub mod color;
pub mod config;
pub mod corpus;
pub mod error;
pub mod fonts;
pub mod generator;
pub mod io;
pub mod render;
pub mod sampler;
pub mod shape;

pub use batch::{BatchRunner, LabelAccumulator, RunSummary};
pub use config::{GeneratorConfig, RotationMode, WorkerCount};
pub use corpus::Corpus;
pub use error::{ConfigError, RenderError, ResourceError, RunError};
pub use generator::{SampleId, SampleLabels, SampleOrchestrator, SampleResult};
pub use render::{GlyphRenderer, GlyphStyle, Rasterize};
pub use sampler::{ParameterSampler, RenderParameters};
