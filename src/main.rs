use std::io::{self, IsTerminal, Read};

use anyhow::{anyhow, Result};
use clap::Parser;

use llm_text_overlay_rust::{Config, RenderJob};

#[derive(Parser, Debug)]
#[command(
    name = "llm-text-overlay-rust",
    version,
    about = "Overlay text onto images, placed by a vision model or per-style defaults"
)]
struct Cli {
    /// Run the HTTP server (optionally on ADDR, default from settings)
    #[arg(long = "server", value_name = "ADDR")]
    server: Option<Option<String>>,

    /// Image file to draw on
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Text to overlay (read from stdin when omitted)
    #[arg(short = 't', long = "text")]
    text: Option<String>,

    /// Style key (bold, modern, scifi, horror, handwritten, retro, elegant)
    #[arg(short = 's', long = "style", default_value = "modern")]
    style: String,

    /// Output JPEG path (default: <input>.overlay.jpg)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// API key (overrides the environment variable)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Skip AI placement even when a key is available
    #[arg(long = "no-ai")]
    no_ai: bool,

    /// Show available style keys and exit
    #[arg(long = "show-styles")]
    show_styles: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    llm_text_overlay_rust::logging::init(cli.verbose)?;

    if cli.show_styles {
        println!("{}", llm_text_overlay_rust::format_styles());
        return Ok(());
    }

    let config = Config {
        settings_path: cli.read_settings.clone(),
        key: cli.key.clone(),
        no_ai: cli.no_ai,
    };

    if let Some(addr) = cli.server {
        return llm_text_overlay_rust::serve(&config, addr).await;
    }

    let data = cli
        .data
        .ok_or_else(|| anyhow!("--data is required unless --server or --show-styles is used"))?;
    let text = match cli.text {
        Some(text) => text,
        None => read_stdin_text()?,
    };
    let job = RenderJob {
        data,
        text,
        style: cli.style,
        output: cli.output,
    };
    let summary = llm_text_overlay_rust::run(&config, job).await?;
    println!("{}", summary);
    Ok(())
}

fn read_stdin_text() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(anyhow!("no text given; pass --text or pipe it on stdin"));
    }
    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(buffer)
}
