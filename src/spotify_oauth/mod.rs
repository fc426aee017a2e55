//! Spotify OAuth: authorization code + PKCE, profile lookup, account resolution.

mod endpoints;
pub mod linking;
pub mod service;

pub use linking::{LinkOutcome, resolve_account};
pub use service::SpotifyOauthService;
