use super::endpoints::{SpotifyEndpoints, SpotifyOauth2Client, build_oauth2_client, into_tokens};
use crate::config::SpotifyConfig;
use crate::error::JambleError;
use crate::types::{SpotifyProfile, SpotifyTokens};

use oauth2::{AuthorizationCode, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RefreshToken, Scope};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Service layer composing the Spotify OAuth operations.
#[derive(Clone)]
pub struct SpotifyOauthService {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    oauth: SpotifyOauth2Client,
    api_base: Url,
    scopes: Vec<String>,
}

impl SpotifyOauthService {
    /// Create a new service with a preconfigured HTTP client.
    pub fn new(cfg: &SpotifyConfig, proxy: Option<&Url>) -> Result<Self, JambleError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("jamble/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            // the token endpoint must not be followed through redirects
            .redirect(reqwest::redirect::Policy::none());
        if let Some(proxy_url) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        let http = builder.build()?;

        let mut api_base = Url::parse(&cfg.api_base_url)?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                oauth: build_oauth2_client(cfg)?,
                api_base,
                scopes: cfg.scopes.clone(),
            }),
        })
    }

    /// Authorize URL plus the CSRF state it embeds.
    pub fn authorize_url(&self, challenge: PkceCodeChallenge) -> (Url, CsrfToken) {
        self.inner
            .oauth
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.inner.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(challenge)
            .url()
    }

    pub async fn exchange_code(
        &self,
        code: AuthorizationCode,
        verifier: PkceCodeVerifier,
    ) -> Result<SpotifyTokens, JambleError> {
        let resp = self
            .inner
            .oauth
            .exchange_code(code)
            .set_pkce_verifier(verifier)
            .request_async(&self.inner.http)
            .await?;
        info!("Spotify authorization code exchanged");
        Ok(into_tokens(&resp, None))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<SpotifyTokens, JambleError> {
        let resp = self
            .inner
            .oauth
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.inner.http)
            .await?;
        info!("Spotify access token refreshed");
        Ok(into_tokens(&resp, Some(refresh_token)))
    }

    pub async fn fetch_profile(&self, access_token: &str) -> Result<SpotifyProfile, JambleError> {
        SpotifyEndpoints::fetch_profile(&self.inner.http, &self.inner.api_base, access_token).await
    }

    /// Fetch the profile; on a 401 refresh once and try again.
    ///
    /// The second element carries the new tokens when a refresh happened so
    /// the caller can persist them.
    pub async fn fetch_profile_with_refresh(
        &self,
        tokens: &SpotifyTokens,
    ) -> Result<(SpotifyProfile, Option<SpotifyTokens>), JambleError> {
        match self.fetch_profile(&tokens.access_token).await {
            Ok(profile) => Ok((profile, None)),
            Err(JambleError::UpstreamStatus(StatusCode::UNAUTHORIZED)) => {
                let Some(refresh_token) = tokens.refresh_token.as_deref() else {
                    return Err(JambleError::UpstreamStatus(StatusCode::UNAUTHORIZED));
                };
                warn!("Spotify access token rejected; refreshing once");
                let refreshed = self.refresh(refresh_token).await?;
                let profile = self.fetch_profile(&refreshed.access_token).await?;
                Ok((profile, Some(refreshed)))
            }
            Err(e) => Err(e),
        }
    }
}
