//! Converts uploaded images into the canonical form sent to the generation
//! backend: a JPEG that fits inside `MAX_WIDTH` x `MAX_HEIGHT`, at a fixed
//! quality, whatever the source format was.

use crate::config::{JPEG_QUALITY, MAX_HEIGHT, MAX_WIDTH};
use crate::error::AnalysisError;
use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, Rgb, RgbImage, Rgba};
use std::fmt::Debug;

/// An image in canonical form
#[derive(Clone)]
pub struct NormalizedImage {
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
}

impl Debug for NormalizedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "NormalizedImage {{ jpeg: <{} bytes>, width: {}, height: {} }}",
            self.jpeg.len(),
            self.width,
            self.height
        )
    }
}

impl NormalizedImage {
    /// Media type of every normalized image
    pub const MIME_TYPE: &'static str = "image/jpeg";

    pub fn as_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The image as base 64 text, for inline transmission
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.jpeg)
    }
}

/// Decode `raw`, shrink it to fit inside the bounds (never enlarging) and
/// re-encode it as JPEG
pub fn normalize(raw: &[u8]) -> Result<NormalizedImage, AnalysisError> {
    let decoded = image::load_from_memory(raw)?;
    let fitted = fit_inside(decoded, MAX_WIDTH, MAX_HEIGHT);

    // JPEG has no alpha channel
    let rgb = if fitted.color().has_alpha() {
        flatten_onto_white(&fitted)
    } else {
        fitted.to_rgb8()
    };
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode(
        rgb.as_raw(),
        width,
        height,
        ColorType::Rgb8,
    )?;

    Ok(NormalizedImage {
        jpeg,
        width,
        height,
    })
}

/// Composite a translucent image over an opaque white background
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let (a, inverse) = (a as u32, 255 - a as u32);
        let blend = |c: u8| ((c as u32 * a + 255 * inverse + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

fn fit_inside(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= max_width && height <= max_height {
        return image;
    }
    image.resize(max_width, max_height, FilterType::Lanczos3)
}


#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    fn format_of(bytes: &[u8]) -> ImageFormat {
        image::guess_format(bytes).unwrap()
    }

    #[test]
    fn test_large_image_is_shrunk() {
        let normalized = normalize(&test_images::jpeg(2000, 1500)).unwrap();
        assert_eq!(normalized.dimensions(), (800, 600));
        assert_eq!(format_of(normalized.as_bytes()), ImageFormat::Jpeg);
    }

    #[test]
    fn test_aspect_ratio_is_kept() {
        let normalized = normalize(&test_images::jpeg(1000, 2000)).unwrap();
        let (width, height) = normalized.dimensions();
        assert_eq!(height, 600);
        assert_eq!(width, 300);
    }

    #[test]
    fn test_small_image_is_not_enlarged() {
        let normalized = normalize(&test_images::jpeg(320, 240)).unwrap();
        assert_eq!(normalized.dimensions(), (320, 240));
    }

    #[test]
    fn test_png_becomes_jpeg() {
        let normalized = normalize(&test_images::png_with_alpha(1024, 768)).unwrap();
        assert_eq!(format_of(normalized.as_bytes()), ImageFormat::Jpeg);
        let (width, height) = normalized.dimensions();
        assert!(width <= MAX_WIDTH && height <= MAX_HEIGHT);
    }

    #[test]
    fn test_alpha_is_blended_onto_white() {
        // (200, 120, 40) at alpha 128 over white
        let normalized = normalize(&test_images::png_with_alpha(32, 32)).unwrap();
        let decoded = image::load_from_memory(normalized.as_bytes())
            .unwrap()
            .to_rgb8();
        let Rgb([r, g, b]) = *decoded.get_pixel(16, 16);
        for (got, want) in [(r, 227u8), (g, 187), (b, 147)] {
            assert!(got.abs_diff(want) <= 4, "got {got}, want about {want}");
        }
    }

    #[test]
    fn test_renormalizing_is_stable() {
        let once = normalize(&test_images::jpeg(1600, 900)).unwrap();
        let twice = normalize(once.as_bytes()).unwrap();
        assert_eq!(once.dimensions(), twice.dimensions());
        assert_eq!(format_of(twice.as_bytes()), ImageFormat::Jpeg);
    }

    #[test]
    fn test_deterministic() {
        let raw = test_images::jpeg(900, 700);
        assert_eq!(
            normalize(&raw).unwrap().as_bytes(),
            normalize(&raw).unwrap().as_bytes()
        );
    }

    #[test]
    fn test_corrupt_image() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AnalysisError::ImageProcessing(_)));
        assert!(err.to_string().starts_with("Image processing failed: "));
    }

    #[test]
    fn test_base64_round_trips_to_same_bytes() {
        let normalized = normalize(&test_images::jpeg(64, 64)).unwrap();
        let decoded = general_purpose::STANDARD
            .decode(normalized.to_base64())
            .unwrap();
        assert_eq!(decoded, normalized.as_bytes());
    }
}
