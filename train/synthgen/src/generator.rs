use std::fmt;

use image::{GrayImage, RgbaImage};
use log::debug;
use packer::{LabelRecord, PackEnd, Shape};
use rand::Rng;
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    error::RenderError,
    render::{GlyphStyle, Rasterize},
    sampler::RenderParameters,
};

/// Random identifier in UUID v4 layout, drawn from the sample's RNG.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(String);

impl SampleId {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut b: [u8; 16] = rng.random();
        b[6] = (b[6] & 0x0f) | 0x40;
        b[8] = (b[8] & 0x3f) | 0x80;
        let hex: String = b.iter().map(|v| format!("{v:02x}")).collect();
        SampleId(format!(
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Labels of one sample. Serializes as `{"<id>": [records...]}`.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleLabels {
    pub id: SampleId,
    pub records: Vec<LabelRecord>,
}

impl Serialize for SampleLabels {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.id.as_str(), &self.records)?;
        map.end()
    }
}

#[derive(Clone, Debug)]
pub struct SampleResult {
    pub image: RgbaImage,
    pub mask: GrayImage,
    pub labels: SampleLabels,
    pub end: PackEnd,
}

/// Renders and packs one sample at a time.
pub struct SampleOrchestrator<'a, R: Rasterize> {
    rasterizer: &'a R,
    shape: Shape,
    mask_fill: u8,
    blur_sigma: f32,
}

impl<'a, R: Rasterize> SampleOrchestrator<'a, R> {
    pub fn new(rasterizer: &'a R, shape: Shape, mask_fill: u8, blur_sigma: f32) -> Self {
        Self {
            rasterizer,
            shape,
            mask_fill,
            blur_sigma,
        }
    }

    pub fn produce<G: Rng + ?Sized>(
        &self,
        params: &RenderParameters,
        rng: &mut G,
    ) -> Result<SampleResult, RenderError> {
        let id = SampleId::random(rng);
        let style = GlyphStyle {
            font_path: params.font_path.clone(),
            font_size: params.font_size,
            color: params.color,
            mask_fill: self.mask_fill,
            rotation: params.rotation.pick(rng),
            perspective: params.perspective,
            blur_sigma: self.blur_sigma,
        };

        let words = params
            .text
            .split_whitespace()
            .map(|w| self.rasterizer.rasterize(w, &style))
            .collect::<Result<Vec<_>, _>>()?;

        let background = image::open(&params.background_path)
            .map_err(|source| RenderError::Background {
                path: params.background_path.clone(),
                source,
            })?
            .to_rgba8();

        let packed = packer::pack(&words, &background, &params.pack_options(self.shape), rng)?;
        debug!(
            "sample {id}: placed {}/{} words, {:?}",
            packed.labels.len(),
            words.len(),
            packed.end
        );

        Ok(SampleResult {
            image: packed.image,
            mask: packed.mask,
            labels: SampleLabels {
                id,
                records: packed.labels,
            },
            end: packed.end,
        })
    }
}
