//! Process configuration, read from the environment (and `.env`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Prefix of the download URLs handed back to clients
    pub public_base_url: String,
    pub converter_bin: Option<String>,
    pub conversion_timeout: Duration,
    pub max_concurrent_conversions: usize,
    pub fonts_dir: PathBuf,
    /// Age after which generated files are deleted; zero keeps them forever
    pub output_ttl: Duration,
    pub cleanup_interval: Duration,
    /// `["*"]` allows any origin
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            workers: None,
            templates_dir: PathBuf::from("./templates"),
            output_dir: env::temp_dir(),
            public_base_url: "http://localhost:8000".to_string(),
            converter_bin: None,
            conversion_timeout: Duration::from_secs(60),
            max_concurrent_conversions: 2,
            fonts_dir: PathBuf::from("./fonts"),
            output_ttl: Duration::from_secs(24 * 60 * 60),
            cleanup_interval: Duration::from_secs(10 * 60),
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

fn parse<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{name} must be a number, got '{raw}'"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` uses the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let get = |name: &str| non_empty(lookup(name));

        if let Some(host) = get("HOST") {
            config.host = host;
        }
        if let Some(raw) = get("PORT") {
            config.port = parse("PORT", &raw)?;
        }
        if let Some(raw) = get("WORKERS") {
            let workers: usize = parse("WORKERS", &raw)?;
            if workers == 0 {
                bail!("WORKERS must be at least 1");
            }
            config.workers = Some(workers);
        }
        if let Some(dir) = get("TEMPLATES_DIR") {
            config.templates_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }
        config.converter_bin = get("CONVERTER_BIN");
        if let Some(raw) = get("CONVERSION_TIMEOUT_SECS") {
            let secs: u64 = parse("CONVERSION_TIMEOUT_SECS", &raw)?;
            if secs == 0 {
                bail!("CONVERSION_TIMEOUT_SECS must be greater than zero");
            }
            config.conversion_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = get("MAX_CONCURRENT_CONVERSIONS") {
            let max: usize = parse("MAX_CONCURRENT_CONVERSIONS", &raw)?;
            if max == 0 {
                bail!("MAX_CONCURRENT_CONVERSIONS must be at least 1");
            }
            config.max_concurrent_conversions = max;
        }
        if let Some(dir) = get("FONTS_DIR") {
            config.fonts_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get("OUTPUT_TTL_SECS") {
            config.output_ttl = Duration::from_secs(parse("OUTPUT_TTL_SECS", &raw)?);
        }
        if let Some(raw) = get("CLEANUP_INTERVAL_SECS") {
            let secs: u64 = parse("CLEANUP_INTERVAL_SECS", &raw)?;
            if secs == 0 {
                bail!("CLEANUP_INTERVAL_SECS must be greater than zero");
            }
            config.cleanup_interval = Duration::from_secs(secs);
        }
        if let Some(raw) = get("CORS_ALLOWED_ORIGINS") {
            config.cors_allowed_origins = raw
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }

        Ok(config)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.iter().any(|o| o == "*")
    }

    /// Public URL under which `/download/{name}` serves a generated file.
    pub fn download_url(&self, name: &str) -> String {
        format!("{}/download/{}", self.public_base_url, name)
    }
}
