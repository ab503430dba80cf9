use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "OPENAI_MODEL";
pub const ENV_RESPONSES_URL: &str = "OPENAI_RESPONSES_URL";
pub const ENV_TIMEOUT_SECS: &str = "OPENAI_TIMEOUT_SECS";
pub const ENV_HOST: &str = "CHAT_RELAY_HOST";
pub const ENV_PORT: &str = "PORT";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_RESPONSES_URL: &str = "https://api.openai.com/v1/responses";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Command line and environment surface of the relay
#[derive(Debug, Clone, Parser)]
#[command(name = "chat-relay", version, about)]
pub struct Cli {
    /// OpenAI API key. The server starts without one, but every chat request fails.
    #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model identifier sent upstream
    #[arg(long, env = ENV_MODEL, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Full URL of the Responses endpoint
    #[arg(long, env = ENV_RESPONSES_URL, default_value = DEFAULT_RESPONSES_URL)]
    pub responses_url: Url,

    /// Upstream request timeout in seconds
    #[arg(long, env = ENV_TIMEOUT_SECS, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    #[arg(long, env = ENV_HOST, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(short, long, env = ENV_PORT, default_value_t = 3000)]
    pub port: u16,
}

impl Cli {
    /// Socket address the server binds to
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", addr, e))
    }

    pub fn into_config(self) -> Config {
        Config {
            api_key: self.api_key,
            model: self.model,
            responses_url: self.responses_url,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Everything a chat request needs from the outside world.
///
/// Built once at startup and handed to the router, so tests can point it at a
/// fake upstream instead of touching process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub responses_url: Url,
    pub timeout: Duration,
}

impl Config {
    /// Config with the default model and timeout
    pub fn new(api_key: Option<String>, responses_url: Url) -> Self {
        Config {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            responses_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// The configured key, treating blank values as missing
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
