use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Client configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub callback_port: u16,
    pub token_file: PathBuf,
    pub handoff_success_delay: Duration,
    pub handoff_failure_delay: Duration,
    pub recently_played_limit: u32,
    pub discover_limit: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_base_url = env::var("MOODTUNE_API_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.into());

        let callback_port = parse_or("CALLBACK_PORT", 5173);

        let token_file = match env::var("MOODTUNE_TOKEN_FILE") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_token_file()?,
        };

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            callback_port,
            token_file,
            handoff_success_delay: Duration::from_millis(parse_or("HANDOFF_SUCCESS_DELAY_MS", 1000)),
            handoff_failure_delay: Duration::from_millis(parse_or("HANDOFF_FAILURE_DELAY_MS", 2000)),
            recently_played_limit: parse_or("RECENTLY_PLAYED_LIMIT", 20),
            discover_limit: parse_or("DISCOVER_LIMIT", 20),
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn default_token_file() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!("no data directory; set MOODTUNE_TOKEN_FILE"))?;
    Ok(dir.join("moodtune").join("token"))
}
