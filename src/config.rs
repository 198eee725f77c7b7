use anyhow::bail;
use chrono::TimeDelta;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

const ENV_API_KEY: &str = "GEMINI_API_KEY";

#[derive(Parser, Debug)]
#[command(
    name = "postcraft",
    about = "A self-hosted assistant for writing, refining and scheduling social posts"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub compositor: CompositorConfig,
    pub library: LibraryConfig,
    pub reminder: ReminderConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub text_model: String,
    pub thinking_model: String,
    pub image_model: String,
    pub thinking_budget: u32,
    pub timeout_secs: u64,
    /// Language the generated posts are written in
    pub language: String,
    /// Chance that a draft produced from a quick-query suggestion gets an image
    pub suggestion_image_chance: f64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CompositorConfig {
    pub output_width: u32,
    pub jpeg_quality: u8,
    /// TTF/OTF file used for captions instead of the embedded font
    pub font_path: Option<PathBuf>,
    /// Upper bound on width * height of the scaled canvas
    pub max_output_pixels: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LibraryConfig {
    pub max_items: usize,
    pub max_upload_bytes: usize,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ReminderConfig {
    pub interval_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: String::new(),
            text_model: "gemini-2.5-flash".to_string(),
            thinking_model: "gemini-2.5-pro".to_string(),
            image_model: "imagen-4.0-generate-001".to_string(),
            thinking_budget: 32768,
            timeout_secs: 120,
            language: "it".to_string(),
            suggestion_image_chance: 0.7,
        }
    }
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            output_width: 1024,
            jpeg_quality: 90,
            font_path: None,
            max_output_pixels: 1024 * 16_384,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            max_items: 20,
            max_upload_bytes: 8 * 1024 * 1024,
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self { interval_hours: 72 }
    }
}

impl ReminderConfig {
    /// `None` when the configured hours are not a positive, representable span.
    pub fn interval(&self) -> Option<TimeDelta> {
        if self.interval_hours <= 0 {
            return None;
        }
        TimeDelta::try_hours(self.interval_hours)
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        config.ai.api_key = resolve_api_key(&config.ai.api_key);

        if config.reminder.interval().is_none() {
            bail!(
                "reminder.interval_hours must be a positive number of hours, got {}",
                config.reminder.interval_hours
            );
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("postcraft.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(".postcraft")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("postcraft.db"))
    }
}

/// An explicit key in the config file wins over the environment.
pub fn resolve_api_key(explicit_key: &str) -> String {
    let trimmed = explicit_key.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    std::env::var(ENV_API_KEY)
        .ok()
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}
