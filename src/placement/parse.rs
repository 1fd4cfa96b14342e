use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use super::PlacementPlan;
use crate::styles::DEFAULT_STYLE;

pub const DEFAULT_X_PERCENT: f64 = 0.5;
pub const DEFAULT_Y_PERCENT: f64 = 0.5;
pub const DEFAULT_FONT_SIZE_PERCENT: f64 = 0.15;
pub const MIN_FONT_SIZE_PERCENT: f64 = 0.08;
pub const MAX_FONT_SIZE_PERCENT: f64 = 0.25;
pub const FALLBACK_COLOR: &str = "#FFFFFF";

/// Turns model output into a plan: strips code fences, takes the outermost
/// `{...}` span, then clamps and validates each field. Any JSON value other
/// than `null` is accepted; fields a non-object lacks take their defaults.
pub fn parse_plan_response(response: &str, style: &str) -> Result<PlacementPlan> {
    let json_str = extract_json_object(response);
    let analysis: Value = serde_json::from_str(json_str)
        .with_context(|| "failed to parse placement JSON from model output")?;
    if analysis.is_null() {
        return Err(anyhow!("model output is JSON null"));
    }
    Ok(plan_from_value(&analysis, style))
}

fn extract_json_object(response: &str) -> &str {
    let mut trimmed = response.trim();
    if trimmed.contains("```") {
        trimmed = strip_fence_markers(trimmed);
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn strip_fence_markers(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.trim_end();
    text.strip_suffix("```").unwrap_or(text).trim()
}

pub(crate) fn plan_from_value(analysis: &Value, style: &str) -> PlacementPlan {
    let x_percent = number_field(analysis, "x_percent").unwrap_or(DEFAULT_X_PERCENT);
    let y_percent = number_field(analysis, "y_percent").unwrap_or(DEFAULT_Y_PERCENT);
    let font_size_percent =
        number_field(analysis, "font_size_percent").unwrap_or(DEFAULT_FONT_SIZE_PERCENT);
    let color = analysis
        .get("color")
        .and_then(Value::as_str)
        .filter(|color| is_hex_color(color))
        .unwrap_or(FALLBACK_COLOR)
        .to_string();
    let font_key = analysis
        .get("font_key")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .or_else(|| Some(style.trim()).filter(|key| !key.is_empty()))
        .unwrap_or(DEFAULT_STYLE)
        .to_string();

    PlacementPlan {
        x_percent: x_percent.clamp(0.0, 1.0),
        y_percent: y_percent.clamp(0.0, 1.0),
        font_size_percent: font_size_percent.clamp(MIN_FONT_SIZE_PERCENT, MAX_FONT_SIZE_PERCENT),
        color,
        font_key,
    }
}

/// Missing, null, non-numeric, NaN and zero values all count as absent.
fn number_field(value: &Value, key: &str) -> Option<f64> {
    let raw = value.get(key)?;
    let number = match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if number.is_finite() && number != 0.0 {
        Some(number)
    } else {
        None
    }
}

/// `#RRGGBB`, hex digits in either case.
pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.chars().all(|ch| ch.is_ascii_hexdigit())
}
