use anyhow::Context;
use checkin_service::config::Config;
use checkin_service::ledger::{LedgerStore, MemoryLedgerStore, RedisLedgerStore};
use checkin_service::roster::{FallbackRoster, FileRosterSource, RedisRosterSource, RosterSource};
use checkin_service::{create_app, observability, shutdown, storage, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    observability::init_tracing(&config);

    info!("Starting check-in service");

    if config.signing_key.is_none() {
        warn!("QR_SIGNING_SECRET is not set; token routes will answer 503");
    }
    if config.admin_secret.is_none() {
        warn!("ADMIN_SECRET is not set; roster and ledger admin routes are open");
    }

    let (roster_source, ledger_store) = build_stores(&config).await?;
    let state = AppState::new(config, roster_source, ledger_store);

    if let Err(e) = state.load_roster().await {
        warn!(error = %e, "Could not load roster from any source, starting empty");
    }

    let addr = state.config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Check-in service listening");

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn build_stores(
    config: &Config,
) -> anyhow::Result<(Arc<dyn RosterSource>, Arc<dyn LedgerStore>)> {
    let cache: Arc<dyn RosterSource> = Arc::new(FileRosterSource::new(&config.roster_cache_path));

    let Some(url) = &config.redis_url else {
        info!(path = %config.roster_cache_path.display(), "No REDIS_URL, using local roster file");
        let ledger: Arc<dyn LedgerStore> = Arc::new(MemoryLedgerStore::new());
        return Ok((cache, ledger));
    };

    match storage::connect(url).await {
        Ok(conn) => {
            let primary = Arc::new(RedisRosterSource::new(conn.clone(), config.roster_key.clone()));
            let roster: Arc<dyn RosterSource> = Arc::new(FallbackRoster::new(primary, cache));
            let ledger: Arc<dyn LedgerStore> = if config.ledger_persist {
                info!(key = %config.ledger_key, "Persisting verification ledger in Redis");
                Arc::new(RedisLedgerStore::new(conn, config.ledger_key.clone()))
            } else {
                Arc::new(MemoryLedgerStore::new())
            };
            Ok((roster, ledger))
        }
        Err(e) if config.ledger_persist => {
            Err(e).context("LEDGER_PERSIST is set but Redis is unreachable")
        }
        Err(e) => {
            warn!(error = %e, "Redis unreachable, serving roster from local cache");
            let roster: Arc<dyn RosterSource> = Arc::new(FallbackRoster::cache_only(cache));
            let ledger: Arc<dyn LedgerStore> = Arc::new(MemoryLedgerStore::new());
            Ok((roster, ledger))
        }
    }
}
