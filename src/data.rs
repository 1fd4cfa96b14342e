use anyhow::{Context, Result};
use std::io::Cursor;
use std::path::Path;

pub const JPEG_MIME: &str = "image/jpeg";

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub name: Option<String>,
}

impl ImageAttachment {
    pub fn from_bytes(bytes: Vec<u8>, name: Option<&str>) -> Self {
        let mime = sniff_image_mime(&bytes).unwrap_or(JPEG_MIME).to_string();
        Self {
            bytes,
            mime,
            name: name.map(|value| value.to_string()),
        }
    }

    pub fn data_url(&self, encoded: &str) -> String {
        format!("data:{};base64,{}", self.mime, encoded)
    }
}

pub fn load_image(path: &Path) -> Result<ImageAttachment> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read image file: {}", path.display()))?;
    let name = path.file_name().and_then(|value| value.to_str());
    Ok(ImageAttachment::from_bytes(bytes, name))
}

fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    let kind = infer::get(bytes)?;
    let detected = kind.mime_type();
    if detected.starts_with("image/") {
        Some(detected)
    } else {
        None
    }
}

/// Reads the dimensions from the image header without decoding pixels.
pub fn read_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}
