use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Thin wrapper around a Postgres pool providing connection setup.
#[derive(Clone)]
pub struct StoreClient {
    pub(crate) pool: PgPool,
}

impl StoreClient {
    /// Connect to Postgres with the given connection string.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Liveness probe used by the health endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Get a reference to the underlying pool.
    pub fn inner(&self) -> &PgPool {
        &self.pool
    }
}
