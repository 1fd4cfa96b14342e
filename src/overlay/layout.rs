use serde::Serialize;

use crate::placement::PlacementPlan;
use crate::styles::{self, GenericFamily};

pub const MIN_FONT_SIZE: u32 = 12;
pub const MIN_STROKE_WIDTH: u32 = 2;
pub const LINE_HEIGHT_RATIO: f64 = 1.1;
pub const MAX_WIDTH_RATIO: f64 = 0.8;

/// Pixel geometry for one overlay, derived from a plan and the image size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayGeometry {
    pub font_size: u32,
    pub x: i64,
    pub y: i64,
    pub text_color: String,
    pub stroke_color: &'static str,
    pub stroke_width: u32,
    pub max_width: u32,
    pub line_height: u32,
    pub font_family: &'static str,
    pub generic_family: GenericFamily,
}

pub fn derive_geometry(plan: &PlacementPlan, width: u32, height: u32) -> OverlayGeometry {
    let style = styles::style_or_default(&plan.font_key);
    let size_percent = non_zero_or(plan.font_size_percent, 0.15);
    let font_size = ((height as f64 * size_percent).floor() as u32).max(MIN_FONT_SIZE);
    let x = (width as f64 * non_zero_or(plan.x_percent, 0.5)).floor() as i64;
    let y = (height as f64 * non_zero_or(plan.y_percent, 0.5)).floor() as i64;
    let text_color = if plan.color.trim().is_empty() {
        "#FFFFFF".to_string()
    } else {
        plan.color.clone()
    };
    let stroke_color = stroke_color_for(&text_color);
    let stroke_width = (font_size / 15).max(MIN_STROKE_WIDTH);
    let max_width = (width as f64 * MAX_WIDTH_RATIO).floor() as u32;
    let line_height = (font_size as f64 * LINE_HEIGHT_RATIO).floor() as u32;

    OverlayGeometry {
        font_size,
        x,
        y,
        text_color,
        stroke_color,
        stroke_width,
        max_width,
        line_height,
        font_family: style.font_family,
        generic_family: style.generic_family,
    }
}

/// White text gets a black outline; everything else a white one.
pub fn stroke_color_for(text_color: &str) -> &'static str {
    let lower = text_color.trim().to_ascii_lowercase();
    if lower == "#ffffff" || lower == "#fff" {
        "black"
    } else {
        "white"
    }
}

fn non_zero_or(value: f64, fallback: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        fallback
    } else {
        value
    }
}

/// Greedy word wrap: a word joins the current line while the measured line
/// stays within `max_width`. A lone word wider than the budget keeps its own line.
pub fn wrap_text<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if measure(&candidate) > max_width && !current.is_empty() {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Baseline-middle y for each line, with the block centered on `y`.
pub fn line_positions(y: i64, line_count: usize, line_height: u32) -> Vec<i64> {
    if line_count == 0 {
        return Vec::new();
    }
    let line_height = line_height as i64;
    let start_y = y - ((line_count as i64 - 1) * line_height) / 2;
    (0..line_count as i64)
        .map(|index| start_y + index * line_height)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::smart_placement;

    fn fixed_width(text: &str) -> f32 {
        text.chars().count() as f32 * 10.0
    }

    #[test]
    fn wrapped_lines_fit_unless_single_word() {
        let text = "the quick brown fox jumps over the lazy dog extraordinarily quickly";
        for max_width in [35.0, 60.0, 90.0, 150.0, 400.0] {
            let lines = wrap_text(text, max_width, fixed_width);
            assert!(!lines.is_empty());
            for line in &lines {
                let single_word = !line.contains(' ');
                assert!(
                    fixed_width(line) <= max_width || single_word,
                    "{line:?} exceeds {max_width}"
                );
            }
            assert_eq!(lines.join(" "), text);
        }
    }

    #[test]
    fn wrap_breaks_greedily() {
        let lines = wrap_text("aa bb cc dd", 50.0, fixed_width);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
        let lines = wrap_text("supercalifragilistic is long", 50.0, fixed_width);
        assert_eq!(lines, vec!["supercalifragilistic", "is", "long"]);
    }

    #[test]
    fn wrap_collapses_whitespace_and_handles_empty() {
        assert_eq!(wrap_text("  SALE \n now\t", 500.0, fixed_width), vec!["SALE now"]);
        assert!(wrap_text("   ", 500.0, fixed_width).is_empty());
    }

    #[test]
    fn line_block_is_centered_on_y() {
        assert_eq!(line_positions(90, 1, 59), vec![90]);
        assert_eq!(line_positions(90, 2, 59), vec![61, 120]);
        assert_eq!(line_positions(100, 3, 20), vec![80, 100, 120]);
        assert!(line_positions(100, 0, 20).is_empty());
    }

    #[test]
    fn bold_geometry_on_400_by_300() {
        let plan = smart_placement("SALE", "bold", 400, 300);
        let geometry = derive_geometry(&plan, 400, 300);
        assert_eq!(geometry.x, 200);
        assert_eq!(geometry.y, 90);
        assert_eq!(geometry.font_size, 54);
        assert_eq!(geometry.line_height, 59);
        assert_eq!(geometry.stroke_width, 3);
        assert_eq!(geometry.stroke_color, "white");
        assert_eq!(geometry.max_width, 320);
        assert_eq!(geometry.font_family, "Arial Black");
    }

    #[test]
    fn small_images_keep_minimum_sizes() {
        let plan = smart_placement("hi", "retro", 50, 40);
        let geometry = derive_geometry(&plan, 50, 40);
        assert_eq!(geometry.font_size, MIN_FONT_SIZE);
        assert_eq!(geometry.stroke_width, MIN_STROKE_WIDTH);
    }

    #[test]
    fn unknown_font_key_uses_modern_family() {
        let mut plan = smart_placement("x", "modern", 100, 100);
        plan.font_key = "gothic".to_string();
        plan.color = "#fff".to_string();
        let geometry = derive_geometry(&plan, 100, 100);
        assert_eq!(geometry.font_family, "Segoe UI");
        assert_eq!(geometry.stroke_color, "black");
    }
}
