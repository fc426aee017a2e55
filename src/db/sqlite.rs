use crate::db::schema::SQLITE_INIT;
use crate::error::JambleError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::info;

pub type SqlitePool = Pool<Sqlite>;

/// Open the pool and make sure the schema exists.
///
/// In-memory databases are per connection in SQLite, so they get a single
/// connection that never idles out.
pub async fn connect(database_url: &str) -> Result<SqlitePool, JambleError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
    let mut pool_opts = SqlitePoolOptions::new();
    if in_memory {
        pool_opts = pool_opts
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = pool_opts.connect_with(connect_opts).await?;
    init_schema(&pool).await?;
    info!(database_url = %database_url, in_memory, "database ready");
    Ok(pool)
}

/// Initialize the schema by executing the bundled DDL.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), JambleError> {
    // execute multiple statements one by one; sqlx::query takes a single statement
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
