use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::config::Config;

pub type Database = Pool<Postgres>;

/// Connects to the backend database with the pool limits from `config`.
pub async fn create_database_pool(
    database_url: &str,
    config: &Config,
) -> Result<Database, sqlx::Error> {
    let pool = pool_options(config).connect(database_url).await?;

    // Test the connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    log::info!(
        "Connected to backend database (max {} connections)",
        config.db_max_connections
    );
    Ok(pool)
}

fn pool_options(config: &Config) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_limits_come_from_config() {
        let config = Config {
            db_max_connections: 3,
            db_acquire_timeout_secs: 7,
            ..Config::default()
        };

        let options = pool_options(&config);

        assert_eq!(options.get_max_connections(), 3);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(7));
    }
}
