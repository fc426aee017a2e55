use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

use crate::error::JambleError;

pub const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1/";

/// Process-wide configuration, loaded on first access.
///
/// Layering (later wins): built-in defaults, `config.toml` in the working
/// directory, then `JAMBLE_*` environment variables with `__` as the section
/// separator (e.g. `JAMBLE_BASIC__JWT_SECRET`).
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::figment()
        .extract()
        .unwrap_or_else(|e| panic!("FATAL: invalid configuration: {e}"))
});

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub spotify: SpotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
    /// HMAC secret for session tokens. Startup fails when empty.
    pub jwt_secret: String,
    pub jwt_ttl_secs: u64,
    pub bcrypt_cost: u32,
    /// Key material for the encrypted OAuth cookies; at least 64 bytes.
    /// A random key is generated per process when unset.
    pub cookie_secret: Option<String>,
    /// Drop the `Secure` attribute on OAuth cookies (plain-http development).
    pub insecure_cookie: bool,
    /// Where the OAuth callback sends the mobile app, token attached.
    pub deep_link_url: String,
    pub proxy: Option<Url>,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite://jamble.sqlite".to_string(),
            loglevel: "info".to_string(),
            jwt_secret: String::new(),
            jwt_ttl_secs: 3600,
            bcrypt_cost: 10,
            cookie_secret: None,
            insecure_cookie: false,
            deep_link_url: "jamble://auth".to_string(),
            proxy: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub scopes: Vec<String>,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:8000/api/auth/spotify/callback".to_string(),
            auth_url: SPOTIFY_AUTH_URL.to_string(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            api_base_url: SPOTIFY_API_BASE_URL.to_string(),
            scopes: vec![
                "user-read-email".to_string(),
                "user-read-private".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("JAMBLE_").split("__"))
    }

    /// Reject settings that would only fail later, mid-request.
    pub fn validate(&self) -> Result<(), JambleError> {
        if self.basic.jwt_secret.trim().is_empty() {
            return Err(JambleError::Config(
                "basic.jwt_secret must be set (JAMBLE_BASIC__JWT_SECRET)".to_string(),
            ));
        }
        if !(4..=31).contains(&self.basic.bcrypt_cost) {
            return Err(JambleError::Config(format!(
                "basic.bcrypt_cost must be between 4 and 31 (got {})",
                self.basic.bcrypt_cost
            )));
        }
        if let Some(secret) = self.basic.cookie_secret.as_ref()
            && secret.len() < 64
        {
            return Err(JambleError::Config(
                "basic.cookie_secret must be at least 64 bytes".to_string(),
            ));
        }
        Url::parse(&self.basic.deep_link_url)?;
        Url::parse(&self.spotify.redirect_uri)?;
        Url::parse(&self.spotify.auth_url)?;
        Url::parse(&self.spotify.token_url)?;
        Url::parse(&self.spotify.api_base_url)?;
        Ok(())
    }
}
