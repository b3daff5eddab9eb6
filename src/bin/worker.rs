use anyhow::Result;
use gazette::{
    config::Config,
    fetcher::FeedClient,
    ingest::{IngestSettings, IngestTrigger, Ingestor},
    repositories::{PgArticleStore, PgSourceStore, PgTagStore},
};
use std::sync::Arc;
use tokio::{
    signal,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = Config::from_env()?;

    // Create database connection pool
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database_max_connections())
        .connect(config.database_url())
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    let ingestor = Ingestor::new(
        Arc::new(PgSourceStore::new(pool.clone())),
        Arc::new(PgArticleStore::new(pool.clone())),
        Arc::new(PgTagStore::new(pool.clone())),
        Arc::new(FeedClient::new()?),
        IngestSettings {
            feed_timeout: config.feed_timeout(),
            store_timeout: config.store_timeout(),
            concurrency: config.fetch_concurrency(),
        },
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            info!("Received shutdown signal, initiating graceful shutdown...");
            shutdown.cancel();
        });
    }

    info!(
        "Worker started - interval: {:?}, budget: {:?}, concurrency: {}",
        config.fetch_interval(),
        config.ingest_budget(),
        config.fetch_concurrency()
    );

    let mut ticker = interval(config.fetch_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let handle = IngestTrigger::spawn(ingestor.clone(), config.ingest_budget());
        let run_token = handle.cancellation_token();
        let run = handle.wait();
        tokio::pin!(run);

        let finished = tokio::select! {
            result = &mut run => Some(result),
            _ = shutdown.cancelled() => None,
        };
        let result = match finished {
            Some(result) => result,
            None => {
                info!("Shutdown during ingest run, letting started sources finish");
                run_token.cancel();
                run.await
            }
        };

        match result {
            Ok(outcome) => info!(
                inserted = outcome.inserted(),
                failures = outcome.failures(),
                skipped = outcome.skipped(),
                "Scheduled ingest run complete"
            ),
            Err(e) => error!("Scheduled ingest run failed: {}", e),
        }
    }

    info!("Worker stopped");
    Ok(())
}
