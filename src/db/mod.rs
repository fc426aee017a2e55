//! Database module: models, schema and stores for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: pool setup and schema bootstrap
//! - `users.rs` / `posts.rs`: the two stores
//! - `tickets.rs`: single-use Spotify link tickets

pub mod models;
pub mod posts;
pub mod schema;
pub mod sqlite;
pub mod tickets;
pub mod users;

pub use models::{DbPost, DbUser};
pub use posts::{FeedQuery, NewPost, PostStore};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, connect};
pub use tickets::LinkTicketStore;
pub use users::{NewUser, UserStore};
