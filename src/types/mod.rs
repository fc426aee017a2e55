pub mod post;
pub mod spotify;
pub mod user;
pub mod validate;

pub use post::{FeedPost, Post, PostAuthor, PostId, PostType};
pub use spotify::{SpotifyProfile, SpotifyTokens};
pub use user::{AccountOrigin, AccountView, Identity, Profile, PublicUser, SpotifyLink, User, UserId};
