use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use grantline_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Open a pool using the application's database settings.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use grantline_core::config::DatabaseConfig;

    use super::connect;

    #[tokio::test]
    async fn connect_honors_the_configured_settings() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            timeout_secs: 5,
        };
        let pool = connect(&config).await.expect("pool should connect");

        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .expect("pragma query");
        assert_eq!(foreign_keys, 1);

        let one: i64 =
            sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.expect("scalar query");
        assert_eq!(one, 1);
    }
}
