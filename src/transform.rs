//! Page image transformation.
//!
//! Each page goes through the same fixed sequence: decode (honouring EXIF
//! orientation), flatten to opaque RGB on white, downscale to the height
//! limit, and re-encode lossily. Codec access sits behind [`ImageCodec`] so
//! the pipeline can run against any encoder.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageDecoder, ImageReader, Rgb, RgbImage, Rgba};
use log::debug;

use crate::error::Result;
use crate::generator::page_stem;

/// Decoding and encoding capability used by [`transform`].
pub trait ImageCodec: Send + Sync {
    /// Decodes raw file bytes into an upright image.
    fn decode(&self, raw: &[u8]) -> Result<DynamicImage>;

    /// Encodes an opaque RGB image at `quality` (1-100).
    fn encode(&self, image: &RgbImage, quality: u8) -> Result<Vec<u8>>;

    /// MIME type of the bytes produced by [`ImageCodec::encode`].
    fn media_type(&self) -> &'static str;

    /// File extension matching [`ImageCodec::media_type`], without dot.
    fn extension(&self) -> &'static str;
}

/// Baseline JPEG output backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    fn decode(&self, raw: &[u8]) -> Result<DynamicImage> {
        let reader = ImageReader::new(Cursor::new(raw)).with_guessed_format()?;
        let mut decoder = reader.into_decoder()?;
        let orientation = decoder.orientation()?;
        let mut image = DynamicImage::from_decoder(decoder)?;
        image.apply_orientation(orientation);
        Ok(image)
    }

    fn encode(&self, image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
            encoder.encode_image(image)?;
        }
        Ok(buffer)
    }

    fn media_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn extension(&self) -> &'static str {
        "jpg"
    }
}

/// A page image ready to be embedded in a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedImage {
    pub width: u32,
    pub height: u32,
    /// Encoded image bytes.
    pub data: Vec<u8>,
    pub media_type: &'static str,
    /// Synthetic name derived from the page position, e.g. `page_00001.jpg`.
    pub file_name: String,
}

/// Decodes, normalises, downscales and re-encodes one page.
///
/// # Arguments
///
/// * `codec` - Codec used for both decoding and encoding
/// * `raw` - Raw bytes of the source image
/// * `position` - 0-based page position, used for the synthetic file name
/// * `max_height` - Height limit; taller images are scaled down to exactly this
/// * `quality` - Encoder quality, 1-100
///
/// # Returns
///
/// * `Result<TransformedImage>` - The encoded page, or the codec's decode error
pub fn transform(
    codec: &dyn ImageCodec,
    raw: &[u8],
    position: usize,
    max_height: u32,
    quality: u8,
) -> Result<TransformedImage> {
    let decoded = codec.decode(raw)?;
    let (source_width, source_height) = (decoded.width(), decoded.height());

    let mut rgb = flatten_to_rgb(decoded);

    let (width, height) = scaled_dimensions(source_width, source_height, max_height);
    if (width, height) != (source_width, source_height) {
        rgb = imageops::resize(&rgb, width, height, FilterType::Lanczos3);
    }

    let data = codec.encode(&rgb, quality)?;
    let file_name = format!("{}.{}", page_stem(position), codec.extension());

    debug!(
        "{}: {}x{} -> {}x{} at quality {} ({} bytes)",
        file_name,
        source_width,
        source_height,
        width,
        height,
        quality,
        data.len()
    );

    Ok(TransformedImage {
        width,
        height,
        data,
        media_type: codec.media_type(),
        file_name,
    })
}

/// Computes the output size for an image under a height limit.
///
/// Images at or below `max_height` keep their size. Taller images get
/// exactly `max_height` with the width scaled proportionally and rounded.
pub fn scaled_dimensions(width: u32, height: u32, max_height: u32) -> (u32, u32) {
    if height <= max_height {
        return (width, height);
    }
    let scaled_width = (f64::from(width) * f64::from(max_height) / f64::from(height)).round();
    ((scaled_width as u32).max(1), max_height)
}

/// Converts any colour mode to 8-bit RGB, compositing transparency onto white.
pub fn flatten_to_rgb(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.into_rgb8();
    }

    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
