use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};
use url::Url;

/// How each published state is written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => bail!("Invalid TD_OUTPUT '{}', expected text or json", other),
        }
    }
}

pub struct Config {
    pub api_url: Url,
    pub socket_url: Url,
    pub request_timeout: Duration,
    pub reconnect_delay: Duration,
    pub reconnect_delay_max: Duration,
    pub output: OutputFormat,
    pub once: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = parse_url(
            "TD_API_URL",
            &var("TD_API_URL").unwrap_or_else(|| "http://localhost:3000".into()),
        )?;
        let socket_url = match var("TD_SOCKET_URL") {
            Some(raw) => parse_url("TD_SOCKET_URL", &raw)?,
            None => api_url.clone(),
        };
        let request_timeout =
            parse_millis("TD_REQUEST_TIMEOUT_MS", var("TD_REQUEST_TIMEOUT_MS"), 30000)?;
        let reconnect_delay =
            parse_millis("TD_RECONNECT_DELAY_MS", var("TD_RECONNECT_DELAY_MS"), 1000)?;
        let reconnect_delay_max = parse_millis(
            "TD_RECONNECT_DELAY_MAX_MS",
            var("TD_RECONNECT_DELAY_MAX_MS"),
            5000,
        )?;
        if reconnect_delay_max < reconnect_delay {
            bail!("TD_RECONNECT_DELAY_MAX_MS must not be smaller than TD_RECONNECT_DELAY_MS");
        }
        let output = var("TD_OUTPUT")
            .map(|raw| raw.parse::<OutputFormat>())
            .transpose()?
            .unwrap_or_default();
        let once = var("TD_ONCE")
            .map(|raw| parse_flag("TD_ONCE", &raw))
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            api_url,
            socket_url,
            request_timeout,
            reconnect_delay,
            reconnect_delay_max,
            output,
            once,
        })
    }
}

fn parse_url(key: &str, raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid {} '{}'", key, raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Invalid {} '{}': expected an http or https URL", key, raw);
    }
    Ok(url)
}

fn parse_millis(key: &str, raw: Option<String>, default_ms: u64) -> anyhow::Result<Duration> {
    let ms = match raw {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Invalid {} '{}'", key, raw))?,
        None => default_ms,
    };
    if ms == 0 {
        bail!("{} must be greater than zero", key);
    }
    Ok(Duration::from_millis(ms))
}

fn parse_flag(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("Invalid {} '{}', expected true or false", key, raw),
    }
}
