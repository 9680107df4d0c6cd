use anyhow::anyhow;
use bb8_postgres::bb8::{Pool, PooledConnection};
use bb8_postgres::tokio_postgres::NoTls;
use bb8_postgres::PostgresConnectionManager;
use tracing::warn;

pub mod notifications_repo;
pub mod profiles_repo;
pub mod reservations_repo;
pub mod stalls_repo;
pub mod users_repo;

pub const RETRY_LIMIT: usize = 5;

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;
pub type PgConnection<'a> = PooledConnection<'a, PostgresConnectionManager<NoTls>>;

pub(crate) async fn get_postgres_connection(pool: &PgPool) -> anyhow::Result<PgConnection<'_>> {
    for _ in 0..RETRY_LIMIT {
        match pool.get().await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                warn!("Failed to retrieve postgres connection due to: {}, retrying in 3s", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(3)).await;
                continue;
            }
        }
    }

    Err(anyhow!("Failed to retrieve a valid connection from postgres pool, BAILING"))
}
