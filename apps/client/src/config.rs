use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Name of the credential field the login endpoint expects.
/// Server deployments disagree on this, so it is read from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Email,
    Username,
}

impl LoginField {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginField::Email => "email",
            LoginField::Username => "username",
        }
    }
}

impl std::str::FromStr for LoginField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(LoginField::Email),
            "username" => Ok(LoginField::Username),
            other => bail!("FURSA_LOGIN_FIELD must be 'email' or 'username', got '{other}'"),
        }
    }
}

/// Client configuration loaded from environment variables.
/// Fails at startup if the API base URL is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub login_field: LoginField,
    pub token_path: PathBuf,
    pub http_timeout: Option<Duration>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let login_field = match std::env::var("FURSA_LOGIN_FIELD") {
            Ok(v) => v.parse()?,
            Err(_) => LoginField::default(),
        };

        let token_path = match std::env::var("FURSA_TOKEN_PATH") {
            Ok(p) => PathBuf::from(p),
            Err(_) => default_token_path()?,
        };

        let http_timeout = match std::env::var("FURSA_HTTP_TIMEOUT_SECS") {
            Ok(v) => Some(Duration::from_secs(
                v.parse::<u64>()
                    .context("FURSA_HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            )),
            Err(_) => None,
        };

        Ok(Config {
            api_base_url: normalize_base_url(&require_env("FURSA_API_BASE_URL")?),
            login_field,
            token_path,
            http_timeout,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Builds a config for an explicit base URL, keeping every other default.
    pub fn with_base_url(base_url: &str, token_path: PathBuf) -> Self {
        Config {
            api_base_url: normalize_base_url(base_url),
            login_field: LoginField::default(),
            token_path,
            http_timeout: None,
            rust_log: "info".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn default_token_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Could not determine the user config directory")?;
    Ok(dir.join("fursa").join("session.json"))
}

pub(crate) fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
