//! Handles configuration for the server, typically pulling from structured environment variables.

use std::{collections::HashMap, net::Ipv4Addr, num::NonZeroU32, time::Duration};

use url::Url;

use crate::error::{ServerError, ServerResult};

/// Default location of the SII taxpayer lookup.
const DEFAULT_SII_URL: &str = "https://zeus.sii.cl/";

/// Default location of the Banco Central statistics site.
const DEFAULT_BCENTRAL_URL: &str = "https://si3.bcentral.cl/";

/// Default location of the CoinMarketCap listings.
const DEFAULT_COINMARKETCAP_URL: &str = "https://coinmarketcap.com/";

/// Default location of the MeteoChile climatology site.
const DEFAULT_METEOCHILE_URL: &str = "https://climatologia.meteochile.gob.cl/";

/// Default time allowed for a single upstream request.
const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// The main configuration struct for the server.
#[derive(Debug)]
pub struct Config {
    /// Configuration for the server module.
    pub server: ServerConfig,
    /// Configuration for rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Configuration for the response cache.
    pub cache: CacheConfig,
    /// Configuration for the scraped upstream sites.
    pub upstream: UpstreamConfig,
    /// Configuration for log output.
    pub log: LogConfig,
}

impl Config {
    /// Constructs a `Config` instance by loading settings from a hashmap of environment variables.
    ///
    /// # Errors
    /// Returns a `ServerError` if any required environment variable is missing or invalid.
    pub fn from_env(env: &HashMap<String, String>) -> ServerResult<Self> {
        Ok(Self {
            server: ServerConfig::from_env(env)?,
            rate_limit: RateLimitConfig::from_env(env)?,
            cache: CacheConfig::from_env(env)?,
            upstream: UpstreamConfig::from_env(env)?,
            log: LogConfig::from_env(env)?,
        })
    }
}

/// Configuration specific to the global server module.
#[derive(Debug)]
pub struct ServerConfig {
    /// The host to bind the server to.
    pub host: Ipv4Addr,
    /// The port to bind the server to.
    pub port: u16,
}

impl ServerConfig {
    /// Constructs a `ServerConfig` instance by loading `SERVER__HOST` and `SERVER__PORT`.
    ///
    /// # Errors
    /// Returns a `ServerError` if any of the required environment variables are missing or invalid.
    pub fn from_env(env: &HashMap<String, String>) -> ServerResult<Self> {
        let host = required(env, "SERVER__HOST")?
            .parse::<Ipv4Addr>()
            .map_err(|e| invalid(env, "SERVER__HOST", e))?;

        let port = required(env, "SERVER__PORT")?
            .parse::<u16>()
            .map_err(|e| invalid(env, "SERVER__PORT", e))?;

        Ok(Self { host, port })
    }
}

/// Configuration for rate limiting.
#[derive(Debug)]
pub struct RateLimitConfig {
    /// The size of the rate limit bucket.
    /// [`NonZeroU32`] is due to internal limitation on variable size in rate limiting library.
    pub bucket_size: NonZeroU32,
    /// The duration to wait before adding 1 request to the bucket.
    pub duration_between_refill: Duration,
}

impl RateLimitConfig {
    /// Constructs a `RateLimitConfig` from `RATE_LIMIT__BUCKET_SIZE` and
    /// `RATE_LIMIT__REFILL_INTERVAL`.
    ///
    /// The interval must specify units: `s`, `m`, `h`, `d`. For example, `1h`.
    ///
    /// # Errors
    /// Returns a `ServerError` if any of the required environment variables are missing or invalid.
    pub fn from_env(env: &HashMap<String, String>) -> ServerResult<Self> {
        let bucket_size: NonZeroU32 = required(env, "RATE_LIMIT__BUCKET_SIZE")?
            .parse::<u32>()
            .map_err(|e| invalid(env, "RATE_LIMIT__BUCKET_SIZE", e))?
            .try_into()
            .map_err(|_| invalid(env, "RATE_LIMIT__BUCKET_SIZE", "Size must be non-zero"))?;

        let duration_between_refill = parse_time(
            required(env, "RATE_LIMIT__REFILL_INTERVAL")?,
            "RATE_LIMIT__REFILL_INTERVAL",
        )?;

        if duration_between_refill.is_zero() {
            return Err(invalid(
                env,
                "RATE_LIMIT__REFILL_INTERVAL",
                "Interval must be non-zero",
            ));
        }

        Ok(Self {
            bucket_size,
            duration_between_refill,
        })
    }
}

/// Configuration for the in-memory response cache.
#[derive(Debug)]
pub struct CacheConfig {
    /// How long a cached response is served before it is fetched again.
    pub time_to_live: Duration,
    /// How often expired responses are evicted.
    pub book_keeping_interval: Duration,
}

impl CacheConfig {
    /// Constructs a `CacheConfig` from `CACHE__TIME_TO_LIVE` and `CACHE__BOOK_KEEPING_INTERVAL`.
    ///
    /// # Errors
    /// Returns a `ServerError` if any of the required environment variables are missing or invalid.
    pub fn from_env(env: &HashMap<String, String>) -> ServerResult<Self> {
        let time_to_live = parse_time(
            required(env, "CACHE__TIME_TO_LIVE")?,
            "CACHE__TIME_TO_LIVE",
        )?;

        let book_keeping_interval = parse_time(
            required(env, "CACHE__BOOK_KEEPING_INTERVAL")?,
            "CACHE__BOOK_KEEPING_INTERVAL",
        )?;

        if book_keeping_interval.is_zero() {
            return Err(invalid(
                env,
                "CACHE__BOOK_KEEPING_INTERVAL",
                "Interval must be non-zero",
            ));
        }

        Ok(Self {
            time_to_live,
            book_keeping_interval,
        })
    }
}

/// Where the scraped sites live and how long to wait for them.
#[derive(Debug)]
pub struct UpstreamConfig {
    /// Base URL of the SII, `https://zeus.sii.cl/` unless overridden.
    pub sii_url: Url,
    /// Base URL of the Banco Central, `https://si3.bcentral.cl/` unless overridden.
    pub bcentral_url: Url,
    /// Base URL of CoinMarketCap, `https://coinmarketcap.com/` unless overridden.
    pub coinmarketcap_url: Url,
    /// Base URL of MeteoChile, `https://climatologia.meteochile.gob.cl/` unless overridden.
    pub meteochile_url: Url,
    /// Timeout applied to every upstream request.
    pub timeout: Duration,
}

impl UpstreamConfig {
    /// Constructs an `UpstreamConfig` from the optional `UPSTREAM__SII_URL`,
    /// `UPSTREAM__BCENTRAL_URL`, `UPSTREAM__COINMARKETCAP_URL`, `UPSTREAM__METEOCHILE_URL` and
    /// `UPSTREAM__TIMEOUT`.
    ///
    /// Base URLs must be `http` or `https`, a trailing slash is added when missing so relative
    /// paths resolve below them.
    ///
    /// # Errors
    /// Returns a `ServerError` if any of the provided environment variables are invalid.
    pub fn from_env(env: &HashMap<String, String>) -> ServerResult<Self> {
        let sii_url = parse_base_url(
            optional(env, "UPSTREAM__SII_URL").unwrap_or(DEFAULT_SII_URL),
            "UPSTREAM__SII_URL",
        )?;

        let bcentral_url = parse_base_url(
            optional(env, "UPSTREAM__BCENTRAL_URL").unwrap_or(DEFAULT_BCENTRAL_URL),
            "UPSTREAM__BCENTRAL_URL",
        )?;

        let coinmarketcap_url = parse_base_url(
            optional(env, "UPSTREAM__COINMARKETCAP_URL").unwrap_or(DEFAULT_COINMARKETCAP_URL),
            "UPSTREAM__COINMARKETCAP_URL",
        )?;

        let meteochile_url = parse_base_url(
            optional(env, "UPSTREAM__METEOCHILE_URL").unwrap_or(DEFAULT_METEOCHILE_URL),
            "UPSTREAM__METEOCHILE_URL",
        )?;

        let timeout = optional(env, "UPSTREAM__TIMEOUT")
            .map(|value| parse_time(value, "UPSTREAM__TIMEOUT"))
            .transpose()?
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT);

        Ok(Self {
            sii_url,
            bcentral_url,
            coinmarketcap_url,
            meteochile_url,
            timeout,
        })
    }
}

/// The format log lines are written in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable single line output.
    #[default]
    Compact,
    /// One JSON object per line, for log collectors.
    Json,
}

/// Configuration for log output. Filtering is left to `RUST_LOG`.
#[derive(Debug)]
pub struct LogConfig {
    /// The format to write logs in.
    pub format: LogFormat,
}

impl LogConfig {
    /// Constructs a `LogConfig` from the optional `LOG__FORMAT`, either `compact` or `json`.
    ///
    /// # Errors
    /// Returns a `ServerError` if the format is not recognised.
    pub fn from_env(env: &HashMap<String, String>) -> ServerResult<Self> {
        let format = match optional(env, "LOG__FORMAT").map(str::to_lowercase).as_deref() {
            None | Some("compact") => LogFormat::Compact,
            Some("json") => LogFormat::Json,
            Some(got) => {
                return Err(invalid(
                    env,
                    "LOG__FORMAT",
                    format!("Unsupported format: {got}"),
                ));
            }
        };

        Ok(Self { format })
    }
}

/// Fetch a variable that must be present and non-empty.
fn required<'a>(env: &'a HashMap<String, String>, name: &'static str) -> ServerResult<&'a str> {
    optional(env, name).ok_or(ServerError::MissingEnvVar(name))
}

/// Fetch a variable, treating an empty value as absent.
fn optional<'a>(env: &'a HashMap<String, String>, name: &'static str) -> Option<&'a str> {
    env.get(name).map(String::as_str).filter(|s| !s.is_empty())
}

/// Build an [`ServerError::InvalidEnvVar`] for a variable that was present but unusable.
fn invalid(
    env: &HashMap<String, String>,
    name: &'static str,
    reason: impl ToString,
) -> ServerError {
    ServerError::InvalidEnvVar(
        name,
        env.get(name).cloned().unwrap_or_default(),
        reason.to_string(),
    )
}

/// Parses an `http` or `https` URL to be used as the base of relative upstream paths.
fn parse_base_url(url_str: &str, variable_name: &'static str) -> ServerResult<Url> {
    let mut url = Url::parse(url_str).map_err(|e| {
        ServerError::InvalidEnvVar(variable_name, url_str.to_string(), e.to_string())
    })?;

    if !["http", "https"].contains(&url.scheme()) {
        return Err(ServerError::InvalidEnvVar(
            variable_name,
            url_str.to_string(),
            "Invalid URL scheme".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Parses a time string with units (e.g., `1h`, `30m`, `300s`) into a Duration.
///
/// Supported units:
/// - `s` for seconds
/// - `m` for minutes (60 seconds)
/// - `h` for hours (3600 seconds)
/// - `d` for days (86400 seconds)
///
/// # Errors
/// Returns a `ServerError` if the string cannot be parsed or contains an unsupported unit.
fn parse_time(time_str: &str, variable_name: &'static str) -> ServerResult<Duration> {
    let trimmed = time_str.trim();
    let split = trimmed
        .char_indices()
        .last()
        .map(|(index, _)| index)
        .ok_or_else(|| {
            ServerError::InvalidEnvVar(
                variable_name,
                time_str.to_string(),
                "Length too short".to_string(),
            )
        })?;
    let (value, unit) = trimmed.split_at(split);

    let value: u64 = value.parse::<u64>().map_err(|e| {
        ServerError::InvalidEnvVar(variable_name, time_str.to_string(), e.to_string())
    })?;

    let multiplier: u64 = match unit.to_lowercase().as_str() {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        got => {
            return Err(ServerError::InvalidEnvVar(
                variable_name,
                time_str.to_string(),
                format!("Unsupported unit: {got}"),
            ));
        }
    };

    let seconds = value.checked_mul(multiplier).ok_or_else(|| {
        ServerError::InvalidEnvVar(
            variable_name,
            time_str.to_string(),
            "Time overflow".to_string(),
        )
    })?;

    Ok(Duration::from_secs(seconds))
}



#[cfg(test)]
mod test_cache_config {
    use super::*;

    fn base_valid_env() -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("CACHE__TIME_TO_LIVE".to_string(), "10m".to_string());
        env.insert(
            "CACHE__BOOK_KEEPING_INTERVAL".to_string(),
            "30s".to_string(),
        );
        env
    }

    #[test]
    fn test_cache_config_from_env() {
        let env = base_valid_env();
        let CacheConfig {
            time_to_live,
            book_keeping_interval,
        } = CacheConfig::from_env(&env).expect("Failed to load CacheConfig");

        assert_eq!(time_to_live, Duration::from_secs(10 * 60));
        assert_eq!(book_keeping_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_missing_cache_time_to_live() {
        let mut env = base_valid_env();
        env.remove("CACHE__TIME_TO_LIVE");

        let err = CacheConfig::from_env(&env);

        assert_eq!(
            err.expect_err("Should fail due to missing variable").to_string(),
            "Missing environment variable: CACHE__TIME_TO_LIVE"
        );
    }

    #[test]
    fn test_invalid_cache_units() {
        let mut env = base_valid_env();
        env.insert("CACHE__TIME_TO_LIVE".to_string(), "10w".to_string());

        let err = CacheConfig::from_env(&env);

        assert_eq!(
            err.expect_err("Should fail due to unknown unit").to_string(),
            "Invalid environment variable: CACHE__TIME_TO_LIVE: 10w, failed due to: Unsupported unit: w"
        );

        env.insert("CACHE__TIME_TO_LIVE".to_string(), "1.5h".to_string());
        let err = CacheConfig::from_env(&env);

        assert_eq!(
            err.expect_err("Should fail due to float value").to_string(),
            "Invalid environment variable: CACHE__TIME_TO_LIVE: 1.5h, failed due to: invalid digit found in string"
        );
    }

    #[test]
    fn test_zero_book_keeping_interval() {
        let mut env = base_valid_env();
        env.insert("CACHE__BOOK_KEEPING_INTERVAL".to_string(), "0s".to_string());

        let err = CacheConfig::from_env(&env);

        assert_eq!(
            err.expect_err("Should fail due to zero interval").to_string(),
            "Invalid environment variable: CACHE__BOOK_KEEPING_INTERVAL: 0s, failed due to: Interval must be non-zero"
        );
    }
}
