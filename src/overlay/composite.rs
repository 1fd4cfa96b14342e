use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Alpha-blends `layer` over the decoded source at the origin and re-encodes
/// the result as JPEG.
pub fn composite_jpeg(source: &[u8], layer: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let base =
        image::load_from_memory(source).with_context(|| "failed to decode source image")?;
    let mut canvas = base.to_rgba8();
    image::imageops::overlay(&mut canvas, layer, 0, 0);
    encode_jpeg(DynamicImage::ImageRgba8(canvas), quality)
}

pub fn encode_jpeg(image: DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .with_context(|| "failed to encode JPEG")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb(color));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn opaque_layer_pixels_replace_source() {
        let source = png_bytes(32, 32, [0, 0, 0]);
        let mut layer = RgbaImage::new(32, 32);
        for y in 0..16 {
            for x in 0..32 {
                layer.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let jpeg = composite_jpeg(&source, &layer, DEFAULT_JPEG_QUALITY).expect("composite");
        assert_eq!(image::guess_format(&jpeg).expect("format"), ImageFormat::Jpeg);

        let decoded = image::load_from_memory(&jpeg).expect("decode").to_rgb8();
        assert_eq!(decoded.dimensions(), (32, 32));
        assert!(decoded.get_pixel(16, 4).0[0] > 200);
        assert!(decoded.get_pixel(16, 28).0[0] < 50);
    }

    #[test]
    fn transparent_layer_keeps_source() {
        let source = png_bytes(8, 8, [200, 30, 30]);
        let jpeg = composite_jpeg(&source, &RgbaImage::new(8, 8), 90).expect("composite");
        let decoded = image::load_from_memory(&jpeg).expect("decode").to_rgb8();
        let pixel = decoded.get_pixel(4, 4).0;
        assert!(pixel[0] > 170 && pixel[1] < 70);
    }

    #[test]
    fn undecodable_source_is_an_error() {
        let err = composite_jpeg(b"nope", &RgbaImage::new(1, 1), 80).unwrap_err();
        assert!(err.to_string().contains("failed to decode source image"));
    }
}
