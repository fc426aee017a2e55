use crate::config::SpotifyConfig;
use crate::error::JambleError;
use crate::types::{SpotifyProfile, SpotifyTokens};

use oauth2::{
    AuthUrl, Client as OAuth2Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
    RedirectUrl, StandardRevocableToken, TokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenResponse,
    },
};
use tracing::{debug, info};
use url::Url;

/// Stateless calls against the Spotify Web API.
pub(super) struct SpotifyEndpoints;

impl SpotifyEndpoints {
    /// `GET {api_base}me` with the given access token.
    ///
    /// A non-success status comes back as `UpstreamStatus` so callers can
    /// tell an expired token (401) from anything else.
    pub(super) async fn fetch_profile(
        http_client: &reqwest::Client,
        api_base: &Url,
        access_token: &str,
    ) -> Result<SpotifyProfile, JambleError> {
        let resp = http_client
            .get(api_base.join("me")?)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            debug!(status = %status, "Spotify profile request rejected");
            return Err(JambleError::UpstreamStatus(status));
        }
        let profile: SpotifyProfile = resp.json().await?;
        info!(
            spotify_id = profile.id.as_deref().unwrap_or("<none>"),
            "Fetched Spotify profile"
        );
        Ok(profile)
    }
}

/// Build the Spotify OAuth2 client from configuration.
pub(super) fn build_oauth2_client(cfg: &SpotifyConfig) -> Result<SpotifyOauth2Client, JambleError> {
    let client = OAuth2Client::new(ClientId::new(cfg.client_id.clone()))
        .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
        .set_auth_uri(AuthUrl::new(cfg.auth_url.clone())?)
        .set_token_uri(TokenUrl::new(cfg.token_url.clone())?)
        .set_redirect_uri(RedirectUrl::new(cfg.redirect_uri.clone())?);
    Ok(client)
}

/// Flatten an OAuth2 token response. `fallback_refresh` is kept when Spotify
/// does not rotate the refresh token.
pub(super) fn into_tokens(
    resp: &BasicTokenResponse,
    fallback_refresh: Option<&str>,
) -> SpotifyTokens {
    SpotifyTokens {
        access_token: resp.access_token().secret().clone(),
        refresh_token: resp
            .refresh_token()
            .map(|t| t.secret().clone())
            .or_else(|| fallback_refresh.map(str::to_string)),
        expires_in: resp.expires_in().map(|d| d.as_secs()),
    }
}

pub(super) type SpotifyOauth2Client = OAuth2Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
