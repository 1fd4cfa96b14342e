use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub body_limit_mb: usize,
    pub ai_base_url: String,
    pub ai_model: String,
    pub ai_temperature: f32,
    pub ai_max_tokens: u32,
    pub ai_timeout_secs: Option<u64>,
    pub ai_api_key_env: String,
    pub jpeg_quality: u8,
    pub font_path: Option<String>,
    pub font_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:3000".to_string(),
            body_limit_mb: 20,
            ai_base_url: "https://openrouter.ai/api/v1".to_string(),
            ai_model: "nvidia/nemotron-nano-12b-v2-vl:free".to_string(),
            ai_temperature: 0.1,
            ai_max_tokens: 2048,
            ai_timeout_secs: None,
            ai_api_key_env: "OPENROUTER_API_KEY".to_string(),
            jpeg_quality: 80,
            font_path: None,
            font_dir: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    ai: Option<AiSettings>,
    render: Option<RenderSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    body_limit_mb: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct AiSettings {
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    api_key_env: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderSettings {
    jpeg_quality: Option<u8>,
    font_path: Option<String>,
    font_dir: Option<String>,
}

/// Loads the embedded defaults, then `./settings.toml`, `./settings.local.toml`
/// and finally `extra_path`, each layer overriding the fields it sets.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse embedded settings")?;
    settings.merge(defaults);

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            settings.merge_file(&path)?;
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        let parsed: SettingsFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = non_empty(server.addr) {
                self.server_addr = addr;
            }
            if let Some(limit) = server.body_limit_mb {
                if limit > 0 {
                    self.body_limit_mb = limit;
                }
            }
        }
        if let Some(ai) = incoming.ai {
            if let Some(base_url) = non_empty(ai.base_url) {
                self.ai_base_url = base_url.trim_end_matches('/').to_string();
            }
            if let Some(model) = non_empty(ai.model) {
                self.ai_model = model;
            }
            if let Some(temperature) = ai.temperature {
                if temperature >= 0.0 {
                    self.ai_temperature = temperature;
                }
            }
            if let Some(max_tokens) = ai.max_tokens {
                if max_tokens > 0 {
                    self.ai_max_tokens = max_tokens;
                }
            }
            if let Some(timeout) = ai.timeout_secs {
                self.ai_timeout_secs = if timeout > 0 { Some(timeout) } else { None };
            }
            if let Some(name) = non_empty(ai.api_key_env) {
                self.ai_api_key_env = name;
            }
        }
        if let Some(render) = incoming.render {
            if let Some(quality) = render.jpeg_quality {
                self.jpeg_quality = quality.clamp(1, 100);
            }
            if let Some(path) = non_empty(render.font_path) {
                self.font_path = Some(path);
            }
            if let Some(dir) = non_empty(render.font_dir) {
                self.font_dir = Some(dir);
            }
        }
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }
}

/// Picks the explicit key first, then the environment variable named by
/// `ai_api_key_env`. Blank values count as absent.
pub fn resolve_api_key(settings: &Settings, explicit: Option<&str>) -> Option<String> {
    if let Some(key) = explicit.map(str::trim).filter(|key| !key.is_empty()) {
        return Some(key.to_string());
    }
    std::env::var(&settings.ai_api_key_env)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
