use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "relay.toml";
pub const DEFAULT_MODEL: &str = "gpt-5";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2000;
pub const DEFAULT_CONTEXT_LIMIT: usize = 15;
pub const DEFAULT_CHUNK_SIZE: usize = 6000;
pub const DEFAULT_PDF_CHAR_BUDGET: usize = 4000;
pub const DEFAULT_MAP_DELAY_MS: u64 = 1000;
pub const DEFAULT_IMAGE_MAX_DIMENSION: u32 = 512;
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 25 * 1024 * 1024; // Discord's upload cap

/// Top-level config (relay.toml + RELAY_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub image: ImageConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// The only channel the bot listens and replies in.
    pub allowed_channel_id: u64,
    /// Attachments larger than this are ignored.
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Number of most recent non-system turns forwarded with each request.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
    /// Maximum characters per document fragment before map-reduce kicks in.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_pdf_char_budget")]
    pub pdf_char_budget: usize,
    /// Wait between consecutive map-phase calls, in milliseconds.
    #[serde(default = "default_map_delay_ms")]
    pub map_delay_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            context_limit: DEFAULT_CONTEXT_LIMIT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pdf_char_budget: DEFAULT_PDF_CHAR_BUDGET,
            map_delay_ms: DEFAULT_MAP_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Longest edge, in pixels, after thumbnailing.
    #[serde(default = "default_image_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_IMAGE_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub openai: OpenAiProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiProviderConfig {
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

/// Display-name prefixes that are stripped to find the person behind a name.
///
/// Order matters: the first prefix that matches wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_prefixes")]
    pub prefixes: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            prefixes: default_identity_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_history_path")]
    pub history_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_max_output_tokens() -> u32 {
    DEFAULT_MAX_OUTPUT_TOKENS
}
fn default_context_limit() -> usize {
    DEFAULT_CONTEXT_LIMIT
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_pdf_char_budget() -> usize {
    DEFAULT_PDF_CHAR_BUDGET
}
fn default_map_delay_ms() -> u64 {
    DEFAULT_MAP_DELAY_MS
}
fn default_image_max_dimension() -> u32 {
    DEFAULT_IMAGE_MAX_DIMENSION
}
fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}
fn default_max_attachment_bytes() -> u64 {
    DEFAULT_MAX_ATTACHMENT_BYTES
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_identity_prefixes() -> Vec<String> {
    ["매니저_", "교육생_", "멘토_", "운영자_"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}
fn default_history_path() -> String {
    "user_histories.json".to_string()
}

impl RelayConfig {
    /// Load config from a TOML file with RELAY_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `RELAY_DISCORD__BOT_TOKEN`.
    /// Falls back to `./relay.toml` when no path is given.
    pub fn load(config_path: Option<&Path>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

        let config: RelayConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("RELAY_").split("__"))
            .extract()
            .map_err(|e| crate::error::RelayError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        use crate::error::RelayError;

        if self.discord.bot_token.trim().is_empty() {
            return Err(RelayError::Config("discord.bot_token is empty".to_string()));
        }
        if self.providers.openai.api_key.trim().is_empty() {
            return Err(RelayError::Config(
                "providers.openai.api_key is empty".to_string(),
            ));
        }
        if self.agent.chunk_size == 0 {
            return Err(RelayError::Config(
                "agent.chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay inserted between consecutive map-phase model calls.
    pub fn map_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.agent.map_delay_ms)
    }
}
