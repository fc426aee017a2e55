pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod spotify_oauth;
pub mod types;

pub use error::JambleError;
pub use spotify_oauth::SpotifyOauthService;
