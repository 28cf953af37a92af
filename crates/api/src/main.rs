//! Vetly API server binary

use vetly_api::{routes, AppState, Config};
use vetly_billing::StripeClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let config = Config::from_env()?;

    let pool = vetly_shared::db::create_pool(&config.database_url).await?;
    vetly_shared::db::run_migrations(&pool).await?;

    let stripe = StripeClient::from_env()?;

    let bind_address = config.bind_address.clone();
    let state = AppState::new(pool, config, stripe);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "Vetly API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
