use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "HOOKRELAY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/hookrelay.toml";
const ENV_PREFIX: &str = "HOOKRELAY";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load(path_override: Option<PathBuf>) -> Result<Config, ConfigError> {
    // Missing .env is the normal case outside development
    let _ = dotenvy::dotenv();

    let config_path = path_override
        .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;
    load_secrets(&mut config);

    Ok(config)
}

/// Load secrets from environment variables into config
/// Secrets are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config) {
    if let Ok(token) = env::var("SLACK_BOT_TOKEN") {
        config.notifier.bot_token = Some(token);
    }
    if let Ok(channel) = env::var("SLACK_CHANNEL_ID") {
        config.notifier.channel_id = Some(channel);
    }
    if let Ok(url) = env::var("SLACK_WEBHOOK_URL") {
        config.notifier.webhook_url = Some(url);
    }

    // Tunnel launchers export the public URL under this name
    if config.server.public_url.is_none() {
        if let Ok(url) = env::var("PUBLIC_URL") {
            config.server.public_url = Some(url);
        }
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // HOOKRELAY__SERVER__BIND_ADDR -> server.bind_addr
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
