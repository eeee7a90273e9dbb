use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use proctor_backend::{
    config::{get_config, init_config, LogFormat},
    database::pool::{create_pool, run_migrations},
    routes,
    session::{ClientDisplayMode, SystemClock},
    store::{memory::MemoryStore, Stores},
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const RETENTION_PRUNE_EVERY: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    let stores = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            info!("Connected to PostgreSQL, migrations applied");
            Stores::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            Stores::in_memory(Arc::new(MemoryStore::new()))
        }
    };

    let app_state = AppState::new(
        stores,
        Arc::new(ClientDisplayMode),
        Arc::new(SystemClock),
        config.engine.clone(),
    );

    {
        let sessions = app_state.session_service.clone();
        let every = config.engine.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                sessions.sweep().await;
            }
        });
    }

    if let Some(months) = config.result_retention_months {
        let results = app_state.result_service.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = results.prune_older_than(months).await {
                    tracing::error!(error = %e, "Scheduled result prune failed");
                }
                tokio::time::sleep(RETENTION_PRUNE_EVERY).await;
            }
        });
    }

    let app = routes::app_router(app_state, config);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
