use crate::core::config::AvatarConfig;
use crate::core::error::CompressError;
use base64::{engine::general_purpose, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

const JPEG_MIME: &str = "image/jpeg";

/// Base64 inflates payloads by roughly 4/3; the extra slack covers the URI prefix
const BASE64_OVERHEAD: f64 = 1.37;

const MIN_QUALITY: u8 = 30;
const QUALITY_STEP: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality in percent
    pub quality: u8,
    pub max_size_kb: u64,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_width: 512,
            max_height: 512,
            quality: 85,
            max_size_kb: 200,
        }
    }
}

impl From<&AvatarConfig> for CompressOptions {
    fn from(config: &AvatarConfig) -> Self {
        Self {
            max_width: config.max_width,
            max_height: config.max_height,
            quality: config.quality,
            max_size_kb: config.max_size_kb,
        }
    }
}

pub fn needs_compression(size_bytes: u64, max_size_kb: u64) -> bool {
    size_bytes > max_size_kb.saturating_mul(1024)
}

/// Output size for an image, preserving aspect ratio.
///
/// Images already within both bounds are left alone.
pub fn target_dimensions(width: u32, height: u32, options: &CompressOptions) -> (u32, u32) {
    if width <= options.max_width && height <= options.max_height {
        return (width, height);
    }

    let ratio = f64::min(
        options.max_width as f64 / width as f64,
        options.max_height as f64 / height as f64,
    );

    let scale = |edge: u32| ((edge as f64 * ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Downscale and re-encode an image as a JPEG data URI.
///
/// Quality is lowered in steps of ten while the result exceeds the size
/// budget, stopping once it falls to 30 or below, so the output may still be
/// larger than `max_size_kb` for very noisy images.
pub fn compress_image(bytes: &[u8], options: &CompressOptions) -> Result<String, CompressError> {
    let image = image::load_from_memory(bytes).map_err(CompressError::Decode)?;

    if image.width() == 0 || image.height() == 0 {
        return Err(CompressError::EmptyImage);
    }

    let (width, height) = target_dimensions(image.width(), image.height(), options);
    let image = if (width, height) == (image.width(), image.height()) {
        image
    } else {
        image.resize_exact(width, height, FilterType::Triangle)
    };

    let budget = options.max_size_kb as f64 * 1024.0 * BASE64_OVERHEAD;
    let mut quality = options.quality.clamp(1, 100);
    let mut data_uri = encode_jpeg(&image, quality)?;

    while data_uri.len() as f64 > budget && quality > MIN_QUALITY {
        quality = quality.saturating_sub(QUALITY_STEP).max(1);
        data_uri = encode_jpeg(&image, quality)?;
    }

    debug!(
        width,
        height,
        quality,
        size = data_uri.len(),
        "Image compressed"
    );

    Ok(data_uri)
}

/// Wrap already-small file contents as a data URI without re-encoding
pub fn file_to_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<String, CompressError> {
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();

    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .map_err(CompressError::Encode)?;

    Ok(file_to_data_uri(&buf, JPEG_MIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32, noisy: bool) -> Vec<u8> {
        let mut seed: u32 = 0x9e37_79b9;
        let img = RgbImage::from_fn(width, height, |x, y| {
            if noisy {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                let [r, g, b, _] = seed.to_le_bytes();
                image::Rgb([r, g, b])
            } else {
                image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
            }
        });

        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn decode(data_uri: &str) -> DynamicImage {
        let payload = data_uri.strip_prefix("data:image/jpeg;base64,").unwrap();
        let bytes = general_purpose::STANDARD.decode(payload).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_needs_compression_boundary() {
        assert!(!needs_compression(200 * 1024, 200));
        assert!(needs_compression(200 * 1024 + 1, 200));
        assert!(!needs_compression(0, 0));
        assert!(needs_compression(1, 0));
        assert!(!needs_compression(u64::MAX, u64::MAX));
        assert!(!needs_compression(u64::MAX, u64::MAX / 1024 + 1));
    }

    #[test]
    fn test_target_dimensions() {
        let opts = CompressOptions::default();

        assert_eq!(target_dimensions(100, 50, &opts), (100, 50));
        assert_eq!(target_dimensions(512, 512, &opts), (512, 512));
        assert_eq!(target_dimensions(1024, 512, &opts), (512, 256));
        assert_eq!(target_dimensions(600, 2000, &opts), (154, 512));
        assert_eq!(target_dimensions(5000, 1, &opts), (512, 1));
    }

    #[test]
    fn test_large_image_is_scaled_down() {
        let uri = compress_image(&png(1024, 768, false), &CompressOptions::default()).unwrap();

        assert!(uri.starts_with("data:image/jpeg;base64,"));
        let out = decode(&uri);
        assert_eq!((out.width(), out.height()), (512, 384));
    }

    #[test]
    fn test_small_image_keeps_dimensions() {
        let out = decode(&compress_image(&png(100, 50, false), &CompressOptions::default()).unwrap());
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn test_quality_drops_for_tight_budget() {
        let bytes = png(256, 256, true);
        let generous = compress_image(&bytes, &CompressOptions { max_size_kb: 10_000, ..Default::default() }).unwrap();
        let tight = compress_image(&bytes, &CompressOptions { max_size_kb: 1, ..Default::default() }).unwrap();

        assert!(tight.len() < generous.len());
    }

    #[test]
    fn test_rejects_non_images() {
        assert!(matches!(
            compress_image(b"definitely not an image", &CompressOptions::default()),
            Err(CompressError::Decode(_))
        ));
    }

    #[test]
    fn test_file_to_data_uri() {
        assert_eq!(file_to_data_uri(b"hi", "image/png"), "data:image/png;base64,aGk=");
    }
}
