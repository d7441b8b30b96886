use anyhow::{Context, Result};
use directories::UserDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

// ── Top-level config ──────────────────────────────────────────────

/// Top-level ToolBox configuration, loaded from `config.toml`.
///
/// Resolution order: `TOOLBOX_CONFIG_DIR` env → `~/.toolbox/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub convert: ConvertConfig,

    #[serde(default)]
    pub compress: CompressConfig,

    #[serde(default)]
    pub shortener: ShortenerConfig,

    #[serde(default)]
    pub qr: QrConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        Self {
            config_path: home.join(".toolbox").join("config.toml"),
            gateway: GatewayConfig::default(),
            chat: ChatConfig::default(),
            convert: ConvertConfig::default(),
            compress: CompressConfig::default(),
            shortener: ShortenerConfig::default(),
            qr: QrConfig::default(),
        }
    }
}

// ── Gateway ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayConfig {
    /// Gateway port (default: 3000)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Allow binding to non-localhost addresses (default: false)
    #[serde(default)]
    pub allow_public_bind: bool,
    /// Largest accepted upload, in bytes (default: 50 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Per-request timeout in seconds (default: 120)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
            allow_public_bind: false,
            max_upload_bytes: default_max_upload_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ── Chat relay ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatConfig {
    /// API key for the hosted chat model. Overridden by `TOOLBOX_CHAT_API_KEY` or `COHERE_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL of the chat API (default: https://api.cohere.ai)
    #[serde(default = "default_chat_api_url")]
    pub api_url: String,
    /// Model name sent upstream (default: command-r)
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Sampling temperature, 0.0–2.0 (default: 0.7)
    #[serde(default = "default_chat_temperature")]
    pub temperature: f64,
    /// Upper bound on generated tokens (default: 300)
    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
    /// Upstream request timeout in seconds (default: 60)
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_chat_api_url() -> String {
    "https://api.cohere.ai".into()
}

fn default_chat_model() -> String {
    "command-r".into()
}

fn default_chat_temperature() -> f64 {
    0.7
}

fn default_chat_max_tokens() -> u32 {
    300
}

fn default_upstream_timeout_secs() -> u64 {
    60
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_chat_api_url(),
            model: default_chat_model(),
            temperature: default_chat_temperature(),
            max_tokens: default_chat_max_tokens(),
            timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

// ── Converter ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConvertConfig {
    /// LibreOffice binary used for office formats (default: soffice)
    #[serde(default = "default_soffice_bin")]
    pub soffice_bin: String,
    /// Poppler rasterizer used for pdf → jpg/png (default: pdftoppm)
    #[serde(default = "default_pdftoppm_bin")]
    pub pdftoppm_bin: String,
    /// Parent directory for per-request workspaces (default: system temp dir)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Timeout for a single external conversion process, in seconds (default: 90)
    #[serde(default = "default_process_timeout_secs")]
    pub process_timeout_secs: u64,
}

fn default_soffice_bin() -> String {
    "soffice".into()
}

fn default_pdftoppm_bin() -> String {
    "pdftoppm".into()
}

fn default_process_timeout_secs() -> u64 {
    90
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            soffice_bin: default_soffice_bin(),
            pdftoppm_bin: default_pdftoppm_bin(),
            temp_dir: None,
            process_timeout_secs: default_process_timeout_secs(),
        }
    }
}

// ── Compressor ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompressConfig {
    /// Lowest JPEG quality the bisection may try (default: 10)
    #[serde(default = "default_min_quality")]
    pub min_quality: u8,
    /// Highest JPEG quality the bisection may try (default: 90)
    #[serde(default = "default_max_quality")]
    pub max_quality: u8,
    /// Maximum bisection rounds (default: 7)
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_min_quality() -> u8 {
    10
}

fn default_max_quality() -> u8 {
    90
}

fn default_iterations() -> u32 {
    7
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            min_quality: default_min_quality(),
            max_quality: default_max_quality(),
            iterations: default_iterations(),
        }
    }
}

// ── Link and QR services ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShortenerConfig {
    /// Base URL of the shortening service (default: https://cleanuri.com)
    #[serde(default = "default_shortener_api_url")]
    pub api_url: String,
    /// Upstream request timeout in seconds (default: 60)
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_shortener_api_url() -> String {
    "https://cleanuri.com".into()
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            api_url: default_shortener_api_url(),
            timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QrConfig {
    /// QR rendering endpoint (default: https://api.qrserver.com/v1/create-qr-code/)
    #[serde(default = "default_qr_api_url")]
    pub api_url: String,
}

fn default_qr_api_url() -> String {
    "https://api.qrserver.com/v1/create-qr-code/".into()
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            api_url: default_qr_api_url(),
        }
    }
}

// ── Loading and persistence ───────────────────────────────────────

fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".toolbox"))
}

fn resolve_config_dir() -> Result<PathBuf> {
    match std::env::var("TOOLBOX_CONFIG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir.trim())),
        _ => default_config_dir(),
    }
}

fn is_local_host(host: &str) -> bool {
    matches!(host.trim(), "127.0.0.1" | "localhost" | "::1" | "[::1]")
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    pub async fn load_or_init() -> Result<Self> {
        let config_dir = resolve_config_dir()?;
        Self::load_or_init_in(&config_dir).await
    }

    /// Load `config.toml` from `config_dir`, writing defaults first when it does not exist.
    pub async fn load_or_init_in(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("config.toml");

        fs::create_dir_all(config_dir).await.with_context(|| {
            format!("Failed to create config directory: {}", config_dir.display())
        })?;

        let initialized = if config_path.exists() {
            false
        } else {
            let mut fresh = Config::default();
            fresh.config_path = config_path.clone();
            fresh.save().await?;

            // The file may hold an API key.
            #[cfg(unix)]
            {
                use std::{fs::Permissions, os::unix::fs::PermissionsExt};
                let _ = fs::set_permissions(&config_path, Permissions::from_mode(0o600)).await;
            }
            true
        };

        let contents = fs::read_to_string(&config_path)
            .await
            .context("Failed to read config file")?;
        let mut config: Config =
            toml::from_str(&contents).context("Failed to parse config file")?;
        config.config_path = config_path;

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!(
            path = %config.config_path.display(),
            initialized,
            "Config loaded"
        );
        Ok(config)
    }

    /// Validate values that would otherwise fail at request time.
    pub fn validate(&self) -> Result<()> {
        if self.gateway.host.trim().is_empty() {
            anyhow::bail!("gateway.host must not be empty");
        }
        if !self.gateway.allow_public_bind && !is_local_host(&self.gateway.host) {
            anyhow::bail!(
                "gateway.host = {} is not a loopback address; set gateway.allow_public_bind = true to expose the gateway",
                self.gateway.host
            );
        }
        if self.gateway.max_upload_bytes == 0 {
            anyhow::bail!("gateway.max_upload_bytes must be greater than 0");
        }
        if self.gateway.request_timeout_secs == 0 {
            anyhow::bail!("gateway.request_timeout_secs must be greater than 0");
        }

        if !(0.0..=2.0).contains(&self.chat.temperature) {
            anyhow::bail!("chat.temperature must be between 0.0 and 2.0");
        }
        if self.chat.api_url.trim().is_empty() {
            anyhow::bail!("chat.api_url must not be empty");
        }
        if self.chat.model.trim().is_empty() {
            anyhow::bail!("chat.model must not be empty");
        }

        if self.compress.min_quality == 0 || self.compress.max_quality > 100 {
            anyhow::bail!("compress quality bounds must lie within 1..=100");
        }
        if self.compress.min_quality > self.compress.max_quality {
            anyhow::bail!("compress.min_quality must not exceed compress.max_quality");
        }
        if self.compress.iterations == 0 {
            anyhow::bail!("compress.iterations must be greater than 0");
        }

        if self.convert.soffice_bin.trim().is_empty() || self.convert.pdftoppm_bin.trim().is_empty()
        {
            anyhow::bail!("convert binaries must not be empty");
        }
        if self.convert.process_timeout_secs == 0 {
            anyhow::bail!("convert.process_timeout_secs must be greater than 0");
        }

        if self.shortener.api_url.trim().is_empty() {
            anyhow::bail!("shortener.api_url must not be empty");
        }
        if self.qr.api_url.trim().is_empty() {
            anyhow::bail!("qr.api_url must not be empty");
        }

        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        // Chat key: TOOLBOX_CHAT_API_KEY wins over the provider's own COHERE_API_KEY.
        if let Some(key) =
            non_empty_env("TOOLBOX_CHAT_API_KEY").or_else(|| non_empty_env("COHERE_API_KEY"))
        {
            self.chat.api_key = Some(key);
        }

        if let Some(model) = non_empty_env("TOOLBOX_CHAT_MODEL") {
            self.chat.model = model;
        }

        if let Some(host) = non_empty_env("TOOLBOX_HOST") {
            self.gateway.host = host;
        }

        if let Some(port) = non_empty_env("TOOLBOX_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid TOOLBOX_PORT"),
            }
        }

        if let Some(bin) = non_empty_env("TOOLBOX_SOFFICE_BIN") {
            self.convert.soffice_bin = bin;
        }

        if let Some(bin) = non_empty_env("TOOLBOX_PDFTOPPM_BIN") {
            self.convert.pdftoppm_bin = bin;
        }
    }

    /// Write the config atomically: temp file in the same directory, then rename.
    pub async fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;

        fs::create_dir_all(parent_dir).await.with_context(|| {
            format!("Failed to create config directory: {}", parent_dir.display())
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("config.toml");
        let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));

        let mut temp_file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("Failed to create temp config {}", temp_path.display()))?;
        temp_file
            .write_all(toml_str.as_bytes())
            .await
            .context("Failed to write temp config")?;
        temp_file
            .sync_all()
            .await
            .context("Failed to flush temp config")?;
        drop(temp_file);

        if let Err(e) = fs::rename(&temp_path, &self.config_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e).with_context(|| {
                format!("Failed to replace config {}", self.config_path.display())
            });
        }

        Ok(())
    }
}
