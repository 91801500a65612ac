//! # Image Loading and Decoding
//!
//! Reads image files for measurement and for PDF embedding. JPEG files pass
//! through without re-encoding (PDF embeds them with DCTDecode). PNG and
//! WebP are decoded to RGB pixels plus an optional alpha channel used as an
//! SMask.

use std::io::Cursor;
use std::path::Path;

use crate::error::QuireError;

/// A loaded image ready for PDF embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded as-is.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// RGB pixels, `width * height * 3` bytes, and alpha when any pixel is
    /// not opaque.
    Decoded { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

/// Pixel dimensions of the image at `path`, read from its header.
pub fn image_size(path: &Path) -> Result<(u32, u32), QuireError> {
    if !path.exists() {
        return Err(QuireError::ImageNotFound {
            path: path.display().to_string(),
        });
    }
    image::image_dimensions(path).map_err(|e| QuireError::Image(format!("{}: {}", path.display(), e)))
}

/// Read and prepare the image at `path` for embedding.
pub fn load_image(path: &Path) -> Result<LoadedImage, QuireError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => QuireError::ImageNotFound {
            path: path.display().to_string(),
        },
        _ => QuireError::Io(e),
    })?;
    decode_image_bytes(&bytes)
}

fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, QuireError> {
    if data.len() < 4 {
        return Err(QuireError::Image("image data too short".to_string()));
    }
    if is_jpeg(data) {
        decode_jpeg(data)
    } else {
        decode_pixels(data)
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

/// Dimensions and color space only; the pixels stay compressed.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, QuireError> {
    let (width, height) = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| QuireError::Image(format!("JPEG format detection: {}", e)))?
        .into_dimensions()
        .map_err(|e| QuireError::Image(format!("JPEG dimensions: {}", e)))?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: detect_jpeg_color_space(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Walk the JPEG markers to the start-of-frame segment and read the
/// component count. Defaults to RGB.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2;
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            return if data[i + 9] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            };
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    JpegColorSpace::DeviceRGB
}

fn decode_pixels(data: &[u8]) -> Result<LoadedImage, QuireError> {
    let img = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| QuireError::Image(format!("format detection: {}", e)))?
        .decode()
        .map_err(|e| QuireError::Image(format!("decode: {}", e)))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
    }
    let transparent = alpha.iter().any(|a| *a != 255);

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: transparent.then_some(alpha),
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(w: u32, h: u32, alpha: u8) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(w, h, |_, _| image::Rgba([255, 0, 0, alpha]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), w, h, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    #[test]
    fn test_is_jpeg() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_jpeg(&[0xFF]));
    }

    #[test]
    fn test_too_short_data() {
        assert!(matches!(decode_image_bytes(&[0x00, 0x01]), Err(QuireError::Image(_))));
    }

    #[test]
    fn test_unrecognized_data() {
        assert!(decode_image_bytes(&[0x00, 0x01, 0x02, 0x03, 0x04]).is_err());
    }

    #[test]
    fn test_decode_opaque_png() {
        let loaded = decode_image_bytes(&png_bytes(1, 1, 255)).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (1, 1));
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert!(alpha.is_none());
            }
            _ => panic!("PNG should decode to pixels"),
        }
    }

    #[test]
    fn test_decode_png_with_alpha() {
        let loaded = decode_image_bytes(&png_bytes(1, 1, 128)).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { alpha, .. } => assert_eq!(alpha.as_deref(), Some(&[128u8][..])),
            _ => panic!("PNG should decode to pixels"),
        }
    }

    #[test]
    fn test_jpeg_passes_through() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();

        let loaded = decode_image_bytes(&buf).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 2));
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert!(data.starts_with(&[0xFF, 0xD8]));
                assert_eq!(*color_space, JpegColorSpace::DeviceRGB);
            }
            _ => panic!("JPEG should stay compressed"),
        }
    }

    #[test]
    fn test_image_size_from_file() {
        let path = std::env::temp_dir().join(format!("quire-size-{}.png", std::process::id()));
        std::fs::write(&path, png_bytes(3, 2, 255)).unwrap();
        assert_eq!(image_size(&path).unwrap(), (3, 2));
        assert_eq!(load_image(&path).unwrap().width_px, 3);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/nonexistent/quire/missing.png");
        assert!(matches!(image_size(path), Err(QuireError::ImageNotFound { .. })));
        assert!(matches!(load_image(path), Err(QuireError::ImageNotFound { .. })));
    }
}
