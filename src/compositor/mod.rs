//! Meme compositing: scales a source image to a fixed width and burns an
//! outlined caption into its lower edge.
//!
//! Compositing never fails from the caller's point of view. Anything that
//! goes wrong (undecodable input, encoder errors, a panicked worker) yields
//! the original bytes as [`Composite::Passthrough`].

pub mod color;
pub mod layout;
pub mod raster;

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use ab_glyph::FontArc;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::error::{ImageError, LimitError, LimitErrorKind};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Limits};
use rust_embed::Embed;
use thiserror::Error;

use crate::config::CompositorConfig;
use color::{color_or, DEFAULT_FILL, DEFAULT_STROKE};
use layout::{layout_caption, render_caption};
use raster::{FontMeasure, RasterSurface};

#[derive(Embed)]
#[folder = "assets/fonts/"]
struct EmbeddedFonts;

const EMBEDDED_FONT: &str = "DejaVuSans-Bold.ttf";

/// Largest width or height accepted from an uploaded or generated image.
const MAX_SOURCE_SIDE: u32 = 16_384;
/// Decoder allocation ceiling.
const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CompositorError {
    #[error("could not read font {path}: {source}")]
    FontIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("font data is not a usable TrueType/OpenType font")]
    InvalidFont,

    #[error("embedded font {0} is missing")]
    MissingFont(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Composite {
    /// Freshly encoded JPEG with the caption drawn in
    Captioned(Bytes),
    /// The input, untouched
    Passthrough(Bytes),
}

impl Composite {
    pub fn is_captioned(&self) -> bool {
        matches!(self, Composite::Captioned(_))
    }

    pub fn bytes(&self) -> &Bytes {
        match self {
            Composite::Captioned(b) | Composite::Passthrough(b) => b,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Composite::Captioned(b) | Composite::Passthrough(b) => b,
        }
    }

    /// Media type of the result given the media type of the input.
    pub fn mime_type<'a>(&self, original: &'a str) -> &'a str {
        match self {
            Composite::Captioned(_) => "image/jpeg",
            Composite::Passthrough(_) => original,
        }
    }
}

pub struct MemeCompositor {
    font: FontArc,
    output_width: u32,
    jpeg_quality: u8,
    max_output_pixels: u64,
}

impl MemeCompositor {
    pub fn new(font: FontArc, output_width: u32, jpeg_quality: u8) -> Self {
        Self {
            font,
            output_width: output_width.max(1),
            jpeg_quality: jpeg_quality.clamp(1, 100),
            max_output_pixels: CompositorConfig::default().max_output_pixels,
        }
    }

    /// Caps the scaled canvas; larger results fall back to the original bytes.
    pub fn with_max_output_pixels(mut self, max_output_pixels: u64) -> Self {
        self.max_output_pixels = max_output_pixels.max(1);
        self
    }

    pub fn from_config(config: &CompositorConfig) -> Result<Self, CompositorError> {
        let font = match &config.font_path {
            Some(path) => {
                let data = std::fs::read(path).map_err(|source| CompositorError::FontIo {
                    path: path.clone(),
                    source,
                })?;
                tracing::info!("Using caption font {}", path.display());
                FontArc::try_from_vec(data).map_err(|_| CompositorError::InvalidFont)?
            }
            None => embedded_font()?,
        };
        Ok(Self::new(font, config.output_width, config.jpeg_quality)
            .with_max_output_pixels(config.max_output_pixels))
    }

    /// Composites synchronously. Blank captions skip decoding entirely.
    pub fn composite(
        &self,
        base: &[u8],
        caption: Option<&str>,
        fill: Option<&str>,
        stroke: Option<&str>,
    ) -> Composite {
        let caption = match caption.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => c,
            None => return Composite::Passthrough(Bytes::copy_from_slice(base)),
        };

        match self.render(base, caption, fill, stroke) {
            Ok(encoded) => Composite::Captioned(Bytes::from(encoded)),
            Err(e) => {
                tracing::warn!("Compositing failed, returning original image: {}", e);
                Composite::Passthrough(Bytes::copy_from_slice(base))
            }
        }
    }

    /// Composites on the blocking pool.
    pub async fn composite_async(
        self: &Arc<Self>,
        base: Bytes,
        caption: Option<String>,
        fill: Option<String>,
        stroke: Option<String>,
    ) -> Composite {
        let compositor = Arc::clone(self);
        let input = base.clone();
        let task = tokio::task::spawn_blocking(move || {
            compositor.composite(
                &input,
                caption.as_deref(),
                fill.as_deref(),
                stroke.as_deref(),
            )
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Compositor task failed: {}", e);
                Composite::Passthrough(base)
            }
        }
    }

    fn render(
        &self,
        base: &[u8],
        caption: &str,
        fill: Option<&str>,
        stroke: Option<&str>,
    ) -> Result<Vec<u8>, ImageError> {
        let source = decode_limited(base)?;
        let (width, height) = output_size(self.output_width, source.width(), source.height());
        if width as u64 * height as u64 > self.max_output_pixels {
            return Err(ImageError::Limits(LimitError::from_kind(
                LimitErrorKind::DimensionError,
            )));
        }

        let mut canvas = source
            .resize_exact(width, height, FilterType::CatmullRom)
            .to_rgba8();

        let layout = layout_caption(caption, width, height, &FontMeasure::new(&self.font));
        let mut surface = RasterSurface::new(
            &mut canvas,
            &self.font,
            color_or(fill, DEFAULT_FILL),
            color_or(stroke, DEFAULT_STROKE),
        );
        render_caption(&layout, &mut surface);

        let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
        let mut out = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut out, self.jpeg_quality).encode_image(&rgb)?;
        Ok(out.into_inner())
    }
}

/// Canvas size for a fixed output width, keeping the aspect ratio.
pub fn output_size(target_width: u32, src_width: u32, src_height: u32) -> (u32, u32) {
    if src_width == 0 {
        return (target_width, 1);
    }
    let height = (target_width as f64 * src_height as f64 / src_width as f64).round() as u32;
    (target_width, height.max(1))
}

fn decode_limited(base: &[u8]) -> Result<DynamicImage, ImageError> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_SIDE);
    limits.max_image_height = Some(MAX_SOURCE_SIDE);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);

    let mut reader = ImageReader::new(Cursor::new(base)).with_guessed_format()?;
    reader.limits(limits);
    reader.decode()
}

fn embedded_font() -> Result<FontArc, CompositorError> {
    let file = EmbeddedFonts::get(EMBEDDED_FONT)
        .ok_or(CompositorError::MissingFont(EMBEDDED_FONT))?;
    FontArc::try_from_vec(file.data.into_owned()).map_err(|_| CompositorError::InvalidFont)
}
