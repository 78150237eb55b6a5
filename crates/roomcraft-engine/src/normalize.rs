use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use roomcraft_contracts::design::EncodedImage;

use crate::config::StudioConfig;
use crate::error::StudioError;

/// Result of normalizing one image for upload to the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pub image: EncodedImage,
    pub original_size: (u32, u32),
    pub size: (u32, u32),
}

impl NormalizedImage {
    pub fn was_resized(&self) -> bool {
        self.original_size != self.size
    }
}

/// Bounds images to a maximum dimension and re-encodes them as JPEG.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageNormalizer {
    max_dim: u32,
    quality: f32,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::from_config(&StudioConfig::default())
    }
}

impl ImageNormalizer {
    pub fn new(max_dim: u32, quality: f32) -> Self {
        Self {
            max_dim: max_dim.max(1),
            quality: quality.clamp(0.01, 1.0),
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(config.max_image_dim, config.jpeg_quality)
    }

    pub fn max_dim(&self) -> u32 {
        self.max_dim
    }

    /// Reads only the header to report `(width, height)`.
    pub fn read_dimensions(&self, input: &EncodedImage) -> Result<(u32, u32), StudioError> {
        ImageReader::new(Cursor::new(&input.bytes))
            .with_guessed_format()
            .map_err(|err| StudioError::Decode(err.to_string()))?
            .into_dimensions()
            .map_err(|err| StudioError::Decode(err.to_string()))
    }

    pub fn normalize(&self, input: &EncodedImage) -> Result<NormalizedImage, StudioError> {
        if input.is_empty() {
            return Err(StudioError::Decode("image is empty".to_string()));
        }
        let decoded = image::load_from_memory(&input.bytes)
            .map_err(|err| StudioError::Decode(err.to_string()))?;
        let original_size = (decoded.width(), decoded.height());
        let (width, height) = target_dimensions(original_size.0, original_size.1, self.max_dim);

        let mut flattened = flatten_onto_white(&decoded);
        if (width, height) != original_size {
            flattened = image::imageops::resize(&flattened, width, height, FilterType::Lanczos3);
        }

        let quality = (self.quality * 100.0).round().clamp(1.0, 100.0) as u8;
        let bytes = encode_jpeg(flattened, quality)?;

        Ok(NormalizedImage {
            image: EncodedImage::new(bytes, "image/jpeg"),
            original_size,
            size: (width, height),
        })
    }
}

/// Scales `(width, height)` so the longer side is at most `max_dim`,
/// preserving aspect ratio. Images already within bounds are untouched.
pub fn target_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let max_dim = max_dim.max(1);
    let longer = width.max(height);
    if longer <= max_dim || longer == 0 {
        return (width, height);
    }
    let scale = f64::from(max_dim) / f64::from(longer);
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, max_dim);
    if width >= height {
        (max_dim, scaled(height))
    } else {
        (scaled(width), max_dim)
    }
}

/// The input decoded fine, so a failure here is ours, not the user's photo.
fn encode_jpeg(image: RgbImage, quality: u8) -> Result<Vec<u8>, StudioError> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(&DynamicImage::ImageRgb8(image))
        .map_err(|err| StudioError::Other(format!("jpeg encode failed: {err}")))?;
    Ok(bytes)
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend =
            |channel: u8| (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8;
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    flattened
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbImage, Rgba, RgbaImage};
    use roomcraft_contracts::design::EncodedImage;

    use super::{encode_jpeg, target_dimensions, ImageNormalizer};
    use crate::error::StudioError;

    fn png(width: u32, height: u32, pixel: Rgba<u8>) -> anyhow::Result<EncodedImage> {
        let image = RgbaImage::from_pixel(width, height, pixel);
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(EncodedImage::new(bytes, "image/png"))
    }

    #[test]
    fn target_dimensions_bound_the_longer_side() {
        assert_eq!(target_dimensions(2000, 1000, 1024), (1024, 512));
        assert_eq!(target_dimensions(1000, 3000, 1024), (341, 1024));
        assert_eq!(target_dimensions(800, 600, 1024), (800, 600));
        assert_eq!(target_dimensions(1024, 1024, 1024), (1024, 1024));
        assert_eq!(target_dimensions(5000, 1, 1024), (1024, 1));
    }

    #[test]
    fn zero_bound_is_treated_as_one_pixel() {
        assert_eq!(target_dimensions(10, 5, 0), (1, 1));
        assert_eq!(target_dimensions(0, 0, 0), (0, 0));
    }

    #[test]
    fn target_dimensions_keep_aspect_within_a_pixel() {
        for (w, h) in [(4032, 3024), (3000, 1999), (1500, 4000), (1025, 7)] {
            let (tw, th) = target_dimensions(w, h, 1024);
            assert!(tw.max(th) <= 1024);
            let expected_h = f64::from(h) * f64::from(tw) / f64::from(w);
            assert!((f64::from(th) - expected_h).abs() <= 1.0, "{w}x{h} -> {tw}x{th}");
        }
    }

    #[test]
    fn large_png_is_resized_and_reencoded_as_jpeg() -> anyhow::Result<()> {
        let input = png(2000, 1000, Rgba([10, 20, 30, 255]))?;
        let normalized = ImageNormalizer::new(1024, 0.95).normalize(&input)?;
        assert_eq!(normalized.image.mime_type, "image/jpeg");
        assert_eq!(normalized.original_size, (2000, 1000));
        assert_eq!(normalized.size, (1024, 512));
        assert!(normalized.was_resized());

        let decoded = image::load_from_memory(&normalized.image.bytes)?;
        assert_eq!((decoded.width(), decoded.height()), (1024, 512));
        Ok(())
    }

    #[test]
    fn small_image_keeps_dimensions() -> anyhow::Result<()> {
        let input = png(300, 200, Rgba([200, 100, 50, 255]))?;
        let normalized = ImageNormalizer::default().normalize(&input)?;
        assert_eq!(normalized.size, (300, 200));
        assert!(!normalized.was_resized());
        assert_eq!(normalized.image.mime_type, "image/jpeg");
        Ok(())
    }

    #[test]
    fn transparency_is_flattened_onto_white() -> anyhow::Result<()> {
        let input = png(16, 16, Rgba([0, 0, 0, 0]))?;
        let normalized = ImageNormalizer::default().normalize(&input)?;
        let decoded = image::load_from_memory(&normalized.image.bytes)?.to_rgb8();
        let pixel = decoded.get_pixel(8, 8);
        assert!(pixel.0.iter().all(|channel| *channel > 240), "{pixel:?}");
        Ok(())
    }

    #[test]
    fn reads_dimensions_from_header() -> anyhow::Result<()> {
        let input = png(640, 480, Rgba([1, 2, 3, 255]))?;
        assert_eq!(ImageNormalizer::default().read_dimensions(&input)?, (640, 480));
        Ok(())
    }

    #[test]
    fn encode_failure_is_not_reported_as_unreadable_input() {
        // JPEG cannot hold a side longer than 65535 pixels.
        let too_wide = RgbImage::new(70_000, 1);
        let err = match encode_jpeg(too_wide, 90) {
            Ok(_) => panic!("expected encode failure"),
            Err(err) => err,
        };
        assert!(matches!(err, StudioError::Other(_)), "{err:?}");
        assert!(err.user_message().starts_with("Error: jpeg encode failed"));
    }

    #[test]
    fn undecodable_bytes_are_a_decode_error() {
        let normalizer = ImageNormalizer::default();
        let garbage = EncodedImage::new(b"not an image".to_vec(), "image/png");
        assert!(matches!(
            normalizer.normalize(&garbage),
            Err(StudioError::Decode(_))
        ));
        assert!(matches!(
            normalizer.normalize(&EncodedImage::new(Vec::new(), "image/png")),
            Err(StudioError::Decode(_))
        ));
    }
}
