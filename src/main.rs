use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskflow::{config::Config, create_app, db, session::SessionProvider, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,taskflow=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::establish_connection(&config.database_url).await?;
    let sessions = SessionProvider::new(pool.clone(), &config.secret_key, config.token_ttl);

    let app = create_app(AppState { pool, sessions });

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
