use std::sync::Arc;

use bb8_postgres::bb8::Pool;
use bb8_postgres::tokio_postgres::NoTls;
use bb8_postgres::PostgresConnectionManager;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::controller::{AppState, ReservationPolicy};

pub mod auth;
pub mod config;
pub mod controller;
pub mod errors;
pub mod helpers;
pub mod models;
pub mod repositories;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::parse();

    let manager =
        PostgresConnectionManager::new_from_stringlike(config.database_url.clone(), NoTls)?;
    let postgres_connection = Pool::builder().build(manager).await?;
    info!("Connected to postgres in {} mode", config.environment);

    let app_state = AppState {
        postgres_connection,
        token_keys: Arc::new(TokenKeys::new(&config.jwt_secret, config.token_ttl_hours)),
        reservation_policy: ReservationPolicy {
            max_stalls_per_vendor: config.max_stalls_per_vendor,
        },
    };

    controller::serve(app_state, &config).await
}
