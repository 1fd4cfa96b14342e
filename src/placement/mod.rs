use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tera::{Context as TeraContext, Tera};
use tracing::{debug, info};

use crate::data::ImageAttachment;
use crate::providers::Provider;
use crate::styles;

pub mod parse;

pub use parse::parse_plan_response;

const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("templates/system_prompt.tera");

/// Where and how to draw the text, as fractions of the image size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementPlan {
    pub x_percent: f64,
    pub y_percent: f64,
    pub font_size_percent: f64,
    pub color: String,
    pub font_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
    Ai,
    Heuristic,
}

impl PlanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanSource::Ai => "ai",
            PlanSource::Heuristic => "heuristic",
        }
    }
}

/// Static per-style placement. `text`, `width` and `height` are accepted so the
/// signature matches the AI path; the table alone decides the result.
pub fn smart_placement(_text: &str, style: &str, _width: u32, _height: u32) -> PlacementPlan {
    let config = styles::style_or_default(style);
    PlacementPlan {
        x_percent: config.x,
        y_percent: config.y,
        font_size_percent: config.size,
        color: config.color.to_string(),
        font_key: config.key.to_string(),
    }
}

pub fn render_system_prompt(text: &str, style: &str, width: u32, height: u32) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("text", text);
    context.insert("style", style);
    context.insert("width", &width);
    context.insert("height", &height);
    let prompt = Tera::one_off(SYSTEM_PROMPT_TEMPLATE, &context, false)
        .with_context(|| "failed to render placement system prompt")?;
    Ok(prompt.trim_end().to_string())
}

pub fn render_user_prompt(text: &str) -> String {
    format!(
        "Analyze the image and place text: \"{}\" in the BEST empty area.",
        text
    )
}

/// Asks the vision model for a plan. Any transport, status or parse failure
/// comes back as a single error for the caller to fall back on.
pub async fn analyze_image_with_ai<P: Provider>(
    provider: P,
    image: &ImageAttachment,
    text: &str,
    style: &str,
    width: u32,
    height: u32,
) -> Result<PlacementPlan> {
    let started = Instant::now();
    let system_prompt = render_system_prompt(text, style, width, height)?;
    let response = provider
        .append_system_input(system_prompt)
        .append_user_input(render_user_prompt(text))
        .append_user_data(image.clone())
        .complete()
        .await?;
    info!(
        "[{}ms] placement response received (model {})",
        started.elapsed().as_millis(),
        response.model.as_deref().unwrap_or("unknown")
    );
    if let Some(usage) = response.usage.as_ref() {
        debug!(
            "token usage: prompt={:?} completion={:?} total={:?}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }
    parse_plan_response(&response.content, style)
}
