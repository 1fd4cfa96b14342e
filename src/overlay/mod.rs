mod composite;
mod font;
mod layout;
mod render;

use anyhow::Result;

pub use composite::{composite_jpeg, encode_jpeg, DEFAULT_JPEG_QUALITY};
pub use font::{FontBook, ResolvedFace};
pub use layout::{
    derive_geometry, line_positions, stroke_color_for, wrap_text, OverlayGeometry,
    LINE_HEIGHT_RATIO, MAX_WIDTH_RATIO,
};
pub use render::{build_text_layer_svg, rasterize_svg};

pub struct RenderedOverlay {
    pub jpeg: Vec<u8>,
    pub lines: Vec<String>,
}

/// Wraps `text` to the geometry's width budget, draws it on a transparent
/// layer sized to the image, and composites the layer onto `source`.
pub fn render_overlay(
    fonts: &FontBook,
    source: &[u8],
    width: u32,
    height: u32,
    text: &str,
    geometry: &OverlayGeometry,
    quality: u8,
) -> Result<RenderedOverlay> {
    let face = fonts.resolve(geometry.font_family, geometry.generic_family);
    let font_size = geometry.font_size as f32;
    let lines = wrap_text(text, geometry.max_width as f32, |candidate| {
        fonts.measure_text_width_px(candidate, font_size, face.as_ref())
    });
    let installed_family = face.as_ref().map(ResolvedFace::family);
    let svg = build_text_layer_svg(width, height, &lines, geometry, installed_family);
    let layer = rasterize_svg(&svg, fonts)?;
    let jpeg = composite_jpeg(source, &layer, quality)?;
    Ok(RenderedOverlay { jpeg, lines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::smart_placement;
    use crate::settings::Settings;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    const BACKGROUND: [u8; 3] = [30, 60, 90];

    fn installed_fonts() -> Option<FontBook> {
        let book = FontBook::load(&Settings::default()).expect("load fonts");
        if book.face_count() == 0 {
            eprintln!("no system fonts installed; skipping drawn-text check");
            return None;
        }
        Some(book)
    }

    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb(BACKGROUND));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    fn around_title() -> impl Iterator<Item = (u32, u32)> {
        (100..300).flat_map(|x| (55..125).map(move |y| (x, y)))
    }

    #[test]
    fn missing_style_font_still_resolves_an_installed_face() {
        let Some(fonts) = installed_fonts() else {
            return;
        };
        let face = fonts
            .resolve("No Such Family 7f3a", crate::styles::GenericFamily::Cursive)
            .expect("fallback face");
        assert!(!face.family().is_empty());
    }

    #[test]
    fn text_layer_has_stroke_and_fill_pixels() {
        let Some(fonts) = installed_fonts() else {
            return;
        };
        let geometry = derive_geometry(&smart_placement("SALE", "bold", 400, 300), 400, 300);
        let face = fonts
            .resolve(geometry.font_family, geometry.generic_family)
            .expect("face");
        let svg = build_text_layer_svg(
            400,
            300,
            &["SALE".to_string()],
            &geometry,
            Some(face.family()),
        );
        let layer = rasterize_svg(&svg, &fonts).expect("rasterize");

        let pixels: Vec<_> = around_title().map(|(x, y)| layer.get_pixel(x, y).0).collect();
        let yellow = pixels
            .iter()
            .filter(|[r, g, b, a]| *a == 255 && *r > 200 && *g > 200 && *b < 80)
            .count();
        let white = pixels
            .iter()
            .filter(|[r, g, b, a]| *a > 128 && *r > 180 && *g > 180 && *b > 180)
            .count();
        assert!(yellow > 100, "yellow fill pixels: {}", yellow);
        assert!(white > 20, "white stroke pixels: {}", white);
    }

    #[test]
    fn rendered_jpeg_differs_from_source_at_the_text() {
        let Some(fonts) = installed_fonts() else {
            return;
        };
        let geometry = derive_geometry(&smart_placement("SALE", "bold", 400, 300), 400, 300);
        let rendered = render_overlay(
            &fonts,
            &solid_png(400, 300),
            400,
            300,
            "SALE",
            &geometry,
            DEFAULT_JPEG_QUALITY,
        )
        .expect("render");
        assert_eq!(rendered.lines, vec!["SALE"]);

        let output = image::load_from_memory(&rendered.jpeg)
            .expect("decode")
            .to_rgb8();
        let changed = around_title()
            .filter(|&(x, y)| {
                let pixel = output.get_pixel(x, y).0;
                pixel
                    .iter()
                    .zip(BACKGROUND)
                    .map(|(got, was)| (*got as i32 - was as i32).abs())
                    .sum::<i32>()
                    > 90
            })
            .count();
        let yellowish = around_title()
            .filter(|&(x, y)| {
                let [r, g, b] = output.get_pixel(x, y).0;
                r > 180 && g > 180 && b < 120
            })
            .count();
        assert!(changed > 500, "changed pixels: {}", changed);
        assert!(yellowish > 50, "yellow pixels: {}", yellowish);
        // Outside the text block the source is untouched.
        let corner = output.get_pixel(5, 295).0;
        assert!(corner
            .iter()
            .zip(BACKGROUND)
            .all(|(got, was)| (*got as i32 - was as i32).abs() < 12));
    }
}
