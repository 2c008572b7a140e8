pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, DbPool};

#[cfg(test)]
pub(crate) mod test_support {
    use scoopy_core::config::DatabaseConfig;

    use crate::{connect, migrations, DbPool};

    /// A single-connection in-memory database. One connection is the
    /// point: with `sqlite::memory:` every new connection would open
    /// its own blank database.
    pub(crate) async fn memory_pool() -> DbPool {
        let config =
            DatabaseConfig { max_connections: 1, ..DatabaseConfig::with_url("sqlite::memory:") };
        connect(&config).await.expect("connect")
    }

    pub(crate) async fn migrated_pool() -> DbPool {
        let pool = memory_pool().await;
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }
}
