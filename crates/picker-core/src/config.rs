//! Service configuration.
//!
//! Loaded from `PICKER_*` environment variables; this is the canonical
//! runtime configuration path. Secrets are redacted from `Debug` output.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default Google Sheets API endpoint.
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
/// Default Scryfall API endpoint.
pub const DEFAULT_SCRYFALL_BASE_URL: &str = "https://api.scryfall.com";

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_MAX_RESERVATIONS: usize = 5;
const DEFAULT_SCRYFALL_RETRY_TOTAL: u32 = 3;
const DEFAULT_SCRYFALL_BACKOFF_MS: u64 = 1000;

/// Configuration for the picker service.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode.
    ///
    /// When enabled the service may run without sheet credentials (using
    /// the in-memory backend) and accepts base-URL overrides for tests.
    pub debug: bool,

    /// Identifier of the Google Sheet holding the card pool.
    pub sheet_id: Option<String>,

    /// Static bearer token used for Sheets API calls.
    ///
    /// Token minting (service-account exchange) happens outside the
    /// process; the service only carries the resulting token.
    pub sheets_token: Option<String>,

    /// Sheets API base URL override (debug/tests only).
    pub sheets_base_url: Option<String>,

    /// TTL for the sheet snapshot cache, in seconds.
    pub cache_ttl_secs: u64,

    /// Maximum reservations allowed per user across all colors.
    pub max_reservations: usize,

    /// Directory where fetched card images are cached.
    pub image_cache_dir: PathBuf,

    /// URL returned when no image can be resolved.
    pub placeholder_image_url: String,

    /// Scryfall API base URL override (debug/tests only).
    pub scryfall_base_url: Option<String>,

    /// Total attempts for failed Scryfall read requests.
    pub scryfall_retry_total: u32,

    /// Base backoff between Scryfall retries, in milliseconds.
    pub scryfall_backoff_ms: u64,

    /// Shared secret required by the administrative reset endpoint.
    pub admin_secret: Option<String>,

    /// CORS allowed origins. `["*"]` allows all origins (development only);
    /// an empty list disables CORS entirely.
    pub cors_allowed_origins: Vec<String>,

    /// Max age for CORS preflight caching, in seconds.
    pub cors_max_age_seconds: u64,

    /// Directory holding the frontend build to serve, if any.
    pub static_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_port", &self.http_port)
            .field("debug", &self.debug)
            .field("sheet_id", &self.sheet_id)
            .field(
                "sheets_token",
                &self.sheets_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("sheets_base_url", &self.sheets_base_url)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("max_reservations", &self.max_reservations)
            .field("image_cache_dir", &self.image_cache_dir)
            .field("placeholder_image_url", &self.placeholder_image_url)
            .field("scryfall_base_url", &self.scryfall_base_url)
            .field("scryfall_retry_total", &self.scryfall_retry_total)
            .field("scryfall_backoff_ms", &self.scryfall_backoff_ms)
            .field(
                "admin_secret",
                &self.admin_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("cors_max_age_seconds", &self.cors_max_age_seconds)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            debug: false,
            sheet_id: None,
            sheets_token: None,
            sheets_base_url: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_reservations: DEFAULT_MAX_RESERVATIONS,
            image_cache_dir: PathBuf::from("image_cache"),
            placeholder_image_url: "/images/placeholder.jpg".to_string(),
            scryfall_base_url: None,
            scryfall_retry_total: DEFAULT_SCRYFALL_RETRY_TOTAL,
            scryfall_backoff_ms: DEFAULT_SCRYFALL_BACKOFF_MS,
            admin_secret: None,
            cors_allowed_origins: Vec::new(),
            cors_max_age_seconds: 3600,
            static_dir: None,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `PICKER_HTTP_PORT`
    /// - `PICKER_DEBUG`
    /// - `PICKER_SHEET_ID`
    /// - `PICKER_SHEETS_TOKEN`
    /// - `PICKER_SHEETS_BASE_URL` (debug only)
    /// - `PICKER_CACHE_TTL_SECS`
    /// - `PICKER_MAX_RESERVATIONS`
    /// - `PICKER_IMAGE_CACHE_DIR`
    /// - `PICKER_PLACEHOLDER_IMAGE_URL`
    /// - `PICKER_SCRYFALL_BASE_URL` (debug only)
    /// - `PICKER_SCRYFALL_RETRY_TOTAL`
    /// - `PICKER_SCRYFALL_BACKOFF_MS`
    /// - `PICKER_ADMIN_SECRET`
    /// - `PICKER_CORS_ALLOWED_ORIGINS` (comma-separated, or `*`)
    /// - `PICKER_CORS_MAX_AGE_SECONDS`
    /// - `PICKER_STATIC_DIR`
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable is present but cannot
    /// be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("PICKER_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("PICKER_DEBUG")? {
            config.debug = debug;
        }
        config.sheet_id = env_string("PICKER_SHEET_ID");
        config.sheets_token = env_string("PICKER_SHEETS_TOKEN");
        config.sheets_base_url = env_string("PICKER_SHEETS_BASE_URL");
        if let Some(ttl) = env_u64("PICKER_CACHE_TTL_SECS")? {
            config.cache_ttl_secs = ttl;
        }
        if let Some(max) = env_usize("PICKER_MAX_RESERVATIONS")? {
            if max == 0 {
                return Err(Error::config(
                    "PICKER_MAX_RESERVATIONS must be greater than 0",
                ));
            }
            config.max_reservations = max;
        }
        if let Some(dir) = env_string("PICKER_IMAGE_CACHE_DIR") {
            config.image_cache_dir = PathBuf::from(dir);
        }
        if let Some(url) = env_string("PICKER_PLACEHOLDER_IMAGE_URL") {
            config.placeholder_image_url = url;
        }
        config.scryfall_base_url = env_string("PICKER_SCRYFALL_BASE_URL");
        if let Some(total) = env_u32("PICKER_SCRYFALL_RETRY_TOTAL")? {
            config.scryfall_retry_total = total;
        }
        if let Some(backoff) = env_u64("PICKER_SCRYFALL_BACKOFF_MS")? {
            config.scryfall_backoff_ms = backoff;
        }
        config.admin_secret = env_string("PICKER_ADMIN_SECRET");
        if let Some(origins) = env_string("PICKER_CORS_ALLOWED_ORIGINS") {
            config.cors_allowed_origins = parse_cors_allowed_origins(&origins);
        }
        if let Some(max_age) = env_u64("PICKER_CORS_MAX_AGE_SECONDS")? {
            config.cors_max_age_seconds = max_age;
        }
        config.static_dir = env_string("PICKER_STATIC_DIR").map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns an error when production (non-debug) configuration is
    /// incomplete or carries debug-only overrides.
    pub fn validate(&self) -> Result<()> {
        if !self.debug {
            if self.sheet_id.is_none() {
                return Err(Error::config(
                    "PICKER_SHEET_ID is required when PICKER_DEBUG=false",
                ));
            }
            if self.sheets_token.is_none() {
                return Err(Error::config(
                    "PICKER_SHEETS_TOKEN is required when PICKER_DEBUG=false",
                ));
            }
            if self.sheets_base_url.is_some() {
                return Err(Error::config(
                    "PICKER_SHEETS_BASE_URL is only allowed when PICKER_DEBUG=true",
                ));
            }
            if self.scryfall_base_url.is_some() {
                return Err(Error::config(
                    "PICKER_SCRYFALL_BASE_URL is only allowed when PICKER_DEBUG=true",
                ));
            }
        }
        Ok(())
    }

    /// Returns the cache TTL as a `Duration`.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Returns the effective Sheets API base URL.
    #[must_use]
    pub fn sheets_base_url(&self) -> &str {
        self.sheets_base_url
            .as_deref()
            .unwrap_or(DEFAULT_SHEETS_BASE_URL)
    }

    /// Returns the effective Scryfall API base URL.
    #[must_use]
    pub fn scryfall_base_url(&self) -> &str {
        self.scryfall_base_url
            .as_deref()
            .unwrap_or(DEFAULT_SCRYFALL_BASE_URL)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u16>()
        .map(Some)
        .map_err(|e| Error::config(format!("{name} must be a u16: {e}")))
}

fn env_u32(name: &str) -> Result<Option<u32>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u32>()
        .map(Some)
        .map_err(|e| Error::config(format!("{name} must be a u32: {e}")))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::config(format!("{name} must be a u64: {e}")))
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<usize>()
        .map(Some)
        .map_err(|e| Error::config(format!("{name} must be a usize: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::config(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}

fn parse_cors_allowed_origins(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed == "*" {
        return vec!["*".to_string()];
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debug_config() -> Config {
        Config {
            debug: true,
            ..Config::default()
        }
    }

    #[test]
    fn parse_bool_accepts_common_forms() {
        assert!(parse_bool("TEST", "true").unwrap());
        assert!(parse_bool("TEST", "YES").unwrap());
        assert!(!parse_bool("TEST", "0").unwrap());
        assert!(parse_bool("TEST", "maybe").is_err());
    }

    #[test]
    fn cors_origins_parse_star_and_lists() {
        assert_eq!(parse_cors_allowed_origins("*"), vec!["*".to_string()]);
        assert_eq!(
            parse_cors_allowed_origins("https://a.example, https://b.example,"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(parse_cors_allowed_origins("  ").is_empty());
    }

    #[test]
    fn validate_requires_sheet_credentials_outside_debug() {
        let err = Config::default().validate().unwrap_err();
        let Error::Config { message } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(message.contains("PICKER_SHEET_ID"));
    }

    #[test]
    fn validate_rejects_base_url_overrides_outside_debug() {
        let config = Config {
            sheet_id: Some("sheet".to_string()),
            sheets_token: Some("token".to_string()),
            sheets_base_url: Some("http://127.0.0.1:9".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_allows_bare_debug_config() {
        debug_config().validate().unwrap();
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = Config {
            sheets_token: Some("super-secret".to_string()),
            admin_secret: Some("hunter2".to_string()),
            ..debug_config()
        };
        let dbg = format!("{config:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("super-secret"));
        assert!(!dbg.contains("hunter2"));
    }
}
