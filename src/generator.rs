use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::data::{self, ImageAttachment};
use crate::overlay::{self, FontBook, OverlayGeometry};
use crate::placement::{self, PlacementPlan, PlanSource};
use crate::providers::{OpenRouter, Provider};
use crate::settings::Settings;
use crate::styles::DEFAULT_STYLE;

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub image: Option<Vec<u8>>,
    pub image_name: Option<String>,
    pub text: String,
    pub style: String,
}

#[derive(Debug, Clone)]
pub struct GenerateOutput {
    pub jpeg: Vec<u8>,
    pub plan: PlacementPlan,
    pub source: PlanSource,
    pub geometry: OverlayGeometry,
    pub lines: Vec<String>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    BadRequest(String),
    Internal(String),
}

impl GenerateError {
    pub fn message(&self) -> &str {
        match self {
            GenerateError::BadRequest(message) | GenerateError::Internal(message) => message,
        }
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for GenerateError {}

impl From<anyhow::Error> for GenerateError {
    fn from(err: anyhow::Error) -> Self {
        GenerateError::Internal(format!("{:#}", err))
    }
}

/// Runs the overlay pipeline for one request. Holds only immutable state, so a
/// single instance serves every request.
#[derive(Clone)]
pub struct Generator<P: Provider> {
    settings: Settings,
    fonts: FontBook,
    provider: Option<P>,
}

impl Generator<OpenRouter> {
    pub fn from_settings(settings: Settings, fonts: FontBook, api_key: Option<String>) -> Self {
        let provider = api_key.map(|key| OpenRouter::from_settings(key, &settings));
        Self::new(settings, fonts, provider)
    }
}

impl<P: Provider> Generator<P> {
    pub fn new(settings: Settings, fonts: FontBook, provider: Option<P>) -> Self {
        Self {
            settings,
            fonts,
            provider,
        }
    }

    pub fn ai_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateOutput, GenerateError> {
        let started = Instant::now();
        let elapsed = || started.elapsed().as_millis();

        let text = request.text.trim().to_string();
        let bytes = match request.image {
            Some(bytes) if !bytes.is_empty() && !text.is_empty() => bytes,
            _ => {
                warn!("[{}ms] missing image or text", elapsed());
                return Err(GenerateError::BadRequest("Missing data".to_string()));
            }
        };
        let style = Some(request.style.trim())
            .filter(|style| !style.is_empty())
            .unwrap_or(DEFAULT_STYLE)
            .to_string();
        info!("[{}ms] image & text received", elapsed());

        let (width, height) = match data::read_dimensions(&bytes) {
            Some(dimensions) => dimensions,
            None => {
                warn!("[{}ms] image size undetermined; assuming 800x600", elapsed());
                (data::DEFAULT_WIDTH, data::DEFAULT_HEIGHT)
            }
        };
        info!("[{}ms] image metadata: {}x{}", elapsed(), width, height);

        let image = ImageAttachment::from_bytes(bytes, request.image_name.as_deref());
        let (plan, source) = self
            .resolve_plan(&image, &text, &style, width, height)
            .await;
        info!(
            "[{}ms] {} placement: x={:.1}%, y={:.1}%, size={:.1}%, color={}",
            elapsed(),
            source.as_str(),
            plan.x_percent * 100.0,
            plan.y_percent * 100.0,
            plan.font_size_percent * 100.0,
            plan.color
        );

        let geometry = overlay::derive_geometry(&plan, width, height);
        debug!("overlay geometry: {:?}", geometry);

        let fonts = self.fonts.clone();
        let quality = self.settings.jpeg_quality;
        let render_geometry = geometry.clone();
        let source_bytes = image.bytes;
        let rendered = tokio::task::spawn_blocking(move || {
            overlay::render_overlay(
                &fonts,
                &source_bytes,
                width,
                height,
                &text,
                &render_geometry,
                quality,
            )
        })
        .await
        .map_err(|err| GenerateError::Internal(format!("render task failed: {}", err)))??;
        info!(
            "[{}ms] final image created ({} bytes, {} line(s))",
            elapsed(),
            rendered.jpeg.len(),
            rendered.lines.len()
        );

        Ok(GenerateOutput {
            jpeg: rendered.jpeg,
            plan,
            source,
            geometry,
            lines: rendered.lines,
            width,
            height,
        })
    }

    /// AI placement when a provider is configured, otherwise (or on any AI
    /// failure) the static per-style placement.
    pub async fn resolve_plan(
        &self,
        image: &ImageAttachment,
        text: &str,
        style: &str,
        width: u32,
        height: u32,
    ) -> (PlacementPlan, PlanSource) {
        match self.provider.clone() {
            Some(provider) => {
                info!("attempting AI placement");
                match placement::analyze_image_with_ai(provider, image, text, style, width, height)
                    .await
                {
                    Ok(plan) => return (plan, PlanSource::Ai),
                    Err(err) => warn!("AI placement failed: {:#}", err),
                }
            }
            None => debug!("no API key configured; skipping AI placement"),
        }
        (
            placement::smart_placement(text, style, width, height),
            PlanSource::Heuristic,
        )
    }
}
