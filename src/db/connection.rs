use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::filter::unicode_lower_utils;

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
pub type SqlitePooledConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const MEMORY_URL: &str = ":memory:";

/// Per-connection setup. WAL lets listing reads run while a scrape job is
/// writing; the busy timeout makes competing writers wait instead of failing.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        // busy_timeout goes first: switching to WAL needs a lock another
        // connection may be holding.
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)?;

        unicode_lower_utils::register_impl(conn, |text: String| text.to_lowercase())
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn init_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    // Every connection to `:memory:` opens its own empty database.
    let pool_size = if config.url.trim() == MEMORY_URL {
        1
    } else {
        config.pool_size
    };
    let pool = build_pool(&config.url, pool_size, Duration::from_secs(config.timeout_seconds))?;
    tracing::info!(url = %config.url, pool_size, "database ready");
    Ok(pool)
}

/// Single-connection in-memory database for tests and throwaway runs.
pub fn memory_pool() -> Result<SqlitePool> {
    build_pool(MEMORY_URL, 1, Duration::from_secs(5))
}

fn build_pool(url: &str, max_size: u32, timeout: Duration) -> Result<SqlitePool> {
    let manager = ConnectionManager::<SqliteConnection>::new(url.trim());
    let pool = Pool::builder()
        .max_size(max_size.max(1))
        .connection_timeout(timeout)
        .connection_customizer(Box::new(ConnectionOptions { busy_timeout: timeout }))
        .build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;
    Ok(pool)
}

fn run_migrations(conn: &mut SqliteConnection) -> Result<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| AppError::Migration(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::prelude::*;
    use diesel::sql_types::BigInt;

    #[derive(QueryableByName)]
    struct Pragma {
        #[diesel(sql_type = BigInt)]
        timeout: i64,
    }

    #[test]
    fn memory_url_shares_one_database() {
        let config = DatabaseConfig {
            url: MEMORY_URL.to_string(),
            pool_size: 4,
            timeout_seconds: 2,
        };
        let pool = init_pool(&config).unwrap();
        assert_eq!(pool.max_size(), 1);

        // migrations ran on the only connection, so the tables are visible
        let mut conn = pool.get().unwrap();
        let count: i64 = crate::db::schema::products::table
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn connections_wait_for_locks() {
        let pool = memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let pragma: Pragma = diesel::sql_query("PRAGMA busy_timeout")
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(pragma.timeout, 5000);
    }

    #[test]
    fn unicode_lower_is_registered() {
        let pool = memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let lowered: String = diesel::select(crate::filter::unicode_lower("ÇANTA Deri"))
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(lowered, "çanta deri");
    }
}
