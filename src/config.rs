//! Palmread configuration. The constants are fixed at compile time; the
//! `ServiceConfig` is layered from defaults, an optional `palmread.toml` and
//! the environment, once, at startup.

use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File};
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// Default `tracing` filter when `RUST_LOG` is unset
pub const RUST_LOG: &str = "palmread=debug,actix_web=info,actix_server=info";

/// Name of the multipart field carrying the palm image
pub const UPLOAD_FIELD: &str = "palmImage";

/// Largest accepted upload, in bytes (10 MiB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Normalized images fit inside `MAX_WIDTH` x `MAX_HEIGHT`
pub const MAX_WIDTH: u32 = 800;
pub const MAX_HEIGHT: u32 = 600;

/// JPEG quality of the canonical image form
pub const JPEG_QUALITY: u8 = 85;

/// Bound on each call to the generation backend
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_VISION_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro-vision:generateContent";
pub const DEFAULT_TEXT_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

/// The raw, deserialized settings
#[derive(Debug, Deserialize)]
struct Settings {
    gemini_api_key: Option<String>,
    gemini_vision_url: String,
    gemini_text_url: String,
    bind_address: String,
    port: u16,
}

/// Process-wide service configuration. Read-only once built.
#[derive(Clone)]
pub struct ServiceConfig {
    api_key: Option<String>,
    vision_url: String,
    text_url: String,
    timeout: Duration,
    bind_address: String,
    port: u16,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ServiceConfig {{ api_key: {}, vision_url: {:?}, text_url: {:?}, timeout: {:?}, bind: {}:{} }}",
            if self.api_key.is_some() { "<set>" } else { "<unset>" },
            self.vision_url,
            self.text_url,
            self.timeout,
            self.bind_address,
            self.port
        )
    }
}

impl ServiceConfig {
    /// Build a config directly, e.g. against mock endpoints
    pub fn new(api_key: Option<String>, vision_url: String, text_url: String) -> Self {
        ServiceConfig {
            api_key: api_key.filter(|key| !key.is_empty()),
            vision_url,
            text_url,
            timeout: UPSTREAM_TIMEOUT,
            bind_address: DEFAULT_BIND_ADDRESS.into(),
            port: DEFAULT_PORT,
        }
    }

    /// Load from `palmread.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        let builder = Self::defaults()?
            .add_source(File::with_name("palmread").required(false))
            .add_source(Environment::default());
        Self::build(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("gemini_vision_url", DEFAULT_VISION_URL)?
            .set_default("gemini_text_url", DEFAULT_TEXT_URL)?
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("port", DEFAULT_PORT as i64)?)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        let mut config = Self::new(
            settings.gemini_api_key,
            settings.gemini_vision_url,
            settings.gemini_text_url,
        );
        config.bind_address = settings.bind_address;
        config.port = settings.port;
        Ok(config)
    }

    /// Override the upstream timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn vision_url(&self) -> &str {
        &self.vision_url
    }

    pub fn text_url(&self) -> &str {
        &self.text_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn bind_address(&self) -> (&str, u16) {
        (&self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::config::FileFormat;

    fn from_toml(toml: &str) -> ServiceConfig {
        let builder = ServiceConfig::defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml));
        ServiceConfig::build(builder).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("");
        assert_eq!(config.api_key(), None);
        assert_eq!(config.vision_url(), DEFAULT_VISION_URL);
        assert_eq!(config.text_url(), DEFAULT_TEXT_URL);
        assert_eq!(config.timeout(), UPSTREAM_TIMEOUT);
        assert_eq!(config.bind_address(), ("0.0.0.0", 3000));
    }

    #[test]
    fn test_file_overrides() {
        let config = from_toml(
            r#"
            gemini_api_key = "secret"
            gemini_vision_url = "http://localhost:9000/vision"
            port = 8080
            "#,
        );
        assert_eq!(config.api_key(), Some("secret"));
        assert_eq!(config.vision_url(), "http://localhost:9000/vision");
        assert_eq!(config.text_url(), DEFAULT_TEXT_URL);
        assert_eq!(config.bind_address(), ("0.0.0.0", 8080));
    }

    #[test]
    fn test_empty_key_is_unset() {
        let config = from_toml(r#"gemini_api_key = """#);
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn test_debug_hides_key() {
        let config = ServiceConfig::new(Some("secret".into()), "a".into(), "b".into());
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<set>"));
    }
}
