use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod data;
pub mod generator;
pub mod logging;
pub mod overlay;
pub mod placement;
pub mod providers;
pub mod server;
pub mod settings;
pub mod styles;

pub use generator::{GenerateError, GenerateOutput, GenerateRequest, Generator};
pub use placement::{PlacementPlan, PlanSource};
pub use providers::{OpenRouter, Provider, ProviderUsage};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings_path: Option<String>,
    pub key: Option<String>,
    pub no_ai: bool,
}

#[derive(Debug, Clone)]
pub struct RenderJob {
    pub data: String,
    pub text: String,
    pub style: String,
    pub output: Option<String>,
}

pub fn build_generator(config: &Config) -> Result<(settings::Settings, Generator<OpenRouter>)> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let fonts = overlay::FontBook::load(&settings)?;
    let key = if config.no_ai {
        None
    } else {
        settings::resolve_api_key(&settings, config.key.as_deref())
    };
    if key.is_none() && !config.no_ai {
        tracing::warn!(
            "{} not set; AI placement disabled",
            settings.ai_api_key_env
        );
    }
    let generator = Generator::from_settings(settings.clone(), fonts, key);
    Ok((settings, generator))
}

pub async fn serve(config: &Config, addr: Option<String>) -> Result<()> {
    let (settings, generator) = build_generator(config)?;
    let addr = addr
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| settings.server_addr.clone());
    let state = server::ServerState {
        settings,
        generator,
    };
    server::run_server(state, addr).await
}

/// Renders one overlay from a file on disk and writes the JPEG next to it
/// unless `job.output` says otherwise.
pub async fn run(config: &Config, job: RenderJob) -> Result<String> {
    let (_, generator) = build_generator(config)?;
    render_file(&generator, job).await
}

pub async fn render_file<P: Provider>(generator: &Generator<P>, job: RenderJob) -> Result<String> {
    let input = PathBuf::from(&job.data);
    let image = data::load_image(&input)?;
    let output_path = job
        .output
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output_path(&input));

    let request = GenerateRequest {
        image: Some(image.bytes),
        image_name: image.name,
        text: job.text,
        style: job.style,
    };
    let output = generator
        .generate(request)
        .await
        .map_err(|err| anyhow!("{}", err))?;
    std::fs::write(&output_path, &output.jpeg)
        .with_context(|| format!("failed to write output: {}", output_path.display()))?;
    info!("wrote {}", output_path.display());

    Ok(format!(
        "{} ({}x{}, {} placement, {} line(s), {} bytes)",
        output_path.display(),
        output.width,
        output.height,
        output.source.as_str(),
        output.lines.len(),
        output.jpeg.len()
    ))
}

pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|value| value.to_str())
        .filter(|value| !value.is_empty())
        .unwrap_or("image");
    input.with_file_name(format!("{}.overlay.jpg", stem))
}

pub fn format_styles() -> String {
    styles::all_styles()
        .iter()
        .map(|style| format!("{}\t{}\t{}", style.key, style.label, style.font_family))
        .collect::<Vec<_>>()
        .join("\n")
}
