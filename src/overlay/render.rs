use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use resvg::render;
use tiny_skia::Pixmap;
use usvg::{Options, Tree};

use super::font::FontBook;
use super::layout::{line_positions, OverlayGeometry};

/// SVG for a transparent layer of `width`x`height` with each line drawn twice:
/// an outline pass, then a fill pass on top. `installed_family` is the face the
/// font book resolved; it goes right after the style's own family.
pub fn build_text_layer_svg(
    width: u32,
    height: u32,
    lines: &[String],
    geometry: &OverlayGeometry,
    installed_family: Option<&str>,
) -> String {
    let mut families = vec![format!("'{}'", geometry.font_family)];
    if let Some(installed) = installed_family.filter(|name| *name != geometry.font_family) {
        families.push(format!("'{}'", installed));
    }
    families.push(geometry.generic_family.as_css().to_string());
    let family = escape_xml(&families.join(", "));
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));

    let positions = line_positions(geometry.y, lines.len(), geometry.line_height);
    for (line, y) in lines.iter().zip(positions) {
        let escaped = escape_xml(line);
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-family="{family}" font-size="{size}" font-weight="bold" text-anchor="middle" dominant-baseline="middle" fill="none" stroke="{stroke}" stroke-width="{stroke_width}">{text}</text>"#,
            x = geometry.x,
            y = y,
            family = family,
            size = geometry.font_size,
            stroke = geometry.stroke_color,
            stroke_width = geometry.stroke_width,
            text = escaped
        ));
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-family="{family}" font-size="{size}" font-weight="bold" text-anchor="middle" dominant-baseline="middle" fill="{fill}">{text}</text>"#,
            x = geometry.x,
            y = y,
            family = family,
            size = geometry.font_size,
            fill = escape_xml(&geometry.text_color),
            text = escaped
        ));
    }

    svg.push_str("</svg>");
    svg
}

/// Rasterizes an SVG into straight-alpha RGBA pixels.
pub fn rasterize_svg(svg: &str, fonts: &FontBook) -> Result<RgbaImage> {
    let options = Options {
        fontdb: fonts.database(),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse text layer SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty SVG size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);

    let mut data = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(size.width(), size.height(), data)
        .ok_or_else(|| anyhow!("failed to build image buffer from SVG"))
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::layout::derive_geometry;
    use crate::placement::smart_placement;

    fn geometry() -> OverlayGeometry {
        derive_geometry(&smart_placement("SALE", "bold", 400, 300), 400, 300)
    }

    #[test]
    fn stroke_pass_precedes_fill_pass() {
        let svg = build_text_layer_svg(400, 300, &["SALE".to_string()], &geometry(), None);
        let stroke = svg.find(r#"stroke="white""#).expect("stroke pass");
        let fill = svg.find(r##"fill="#FFFF00""##).expect("fill pass");
        assert!(stroke < fill);
        assert!(svg.contains(r#"x="200" y="90""#));
        assert!(svg.contains("&apos;Arial Black&apos;, sans-serif"));
        assert_eq!(svg.matches("<text ").count(), 2);
    }

    #[test]
    fn installed_family_follows_style_family() {
        let svg = build_text_layer_svg(
            400,
            300,
            &["SALE".to_string()],
            &geometry(),
            Some("DejaVu Sans"),
        );
        assert!(svg.contains("&apos;Arial Black&apos;, &apos;DejaVu Sans&apos;, sans-serif"));

        let svg = build_text_layer_svg(
            400,
            300,
            &["SALE".to_string()],
            &geometry(),
            Some("Arial Black"),
        );
        assert!(svg.contains(r#"font-family="&apos;Arial Black&apos;, sans-serif""#));
    }

    #[test]
    fn text_is_escaped() {
        let svg = build_text_layer_svg(10, 10, &["<b>&\"".to_string()], &geometry(), None);
        assert!(svg.contains("&lt;b&gt;&amp;&quot;"));
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn multi_line_blocks_are_centered() {
        let lines = vec!["BIG".to_string(), "SALE".to_string()];
        let svg = build_text_layer_svg(400, 300, &lines, &geometry(), None);
        assert!(svg.contains(r#"y="61""#));
        assert!(svg.contains(r#"y="120""#));
    }

    #[test]
    fn empty_layer_rasterizes_transparent() {
        let svg = build_text_layer_svg(16, 8, &[], &geometry(), None);
        let layer = rasterize_svg(&svg, &FontBook::empty()).expect("rasterize");
        assert_eq!(layer.dimensions(), (16, 8));
        assert!(layer.pixels().all(|pixel| pixel.0[3] == 0));
    }
}
