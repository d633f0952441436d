mod cli;

use crate::cli::{GeneratorArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use wormhole_analytics::{ClickRecorder, RecorderConfig};
use wormhole_core::{CodeReusePolicy, LinkStore, Shortener};
use wormhole_gateway::{App, AppState};
use wormhole_generator::{CodeSettings, RandomGenerator, SeqGenerator};
use wormhole_redirector::{CachedRepository, MokaUrlCache, Redirector, RedirectorService};
use wormhole_shortener::{resume_sequence, ShortenerConfig, ShortenerService};
use wormhole_storage::{
    BoundedRepository, InMemoryRepository, MySqlRepository, MySqlSettings, RetryPolicy,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();

    let _telemetry = wormhole_telemetry::init(
        "wormhole-gateway",
        config.log_format.into(),
        config.otlp_endpoint.as_deref(),
    )?;

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        generator = ?config.generator,
        code_reuse_policy = ?config.code_reuse_policy,
        "starting gateway server"
    );

    let store = open_store(&config).await?;

    let settings = CodeSettings::builder()
        .alphabet(config.code_alphabet.clone())
        .length(config.code_length)
        .prefix(config.generator_prefix.clone())
        .build();
    let shortener_config = ShortenerConfig::builder()
        .max_attempts(config.max_attempts)
        .max_url_length(config.max_url_length)
        .build();
    let shortener: Arc<dyn Shortener> = match config.generator {
        GeneratorArg::Random => Arc::new(ShortenerService::with_config(
            Arc::clone(&store),
            RandomGenerator::new(settings).context("invalid code settings")?,
            shortener_config,
        )),
        GeneratorArg::Seq => {
            let generator = SeqGenerator::with_offset(settings, config.generator_offset)
                .context("invalid code settings")?;
            resume_sequence(&generator, &*store)
                .await
                .context("failed to resume the code sequence")?;
            Arc::new(ShortenerService::with_config(
                Arc::clone(&store),
                generator,
                shortener_config,
            ))
        }
    };

    let recorder = ClickRecorder::spawn(
        Arc::clone(&store),
        RecorderConfig::builder()
            .queue_capacity(config.click_queue_capacity)
            .build(),
    );

    let redirector: Arc<dyn Redirector> = if config.cache_capacity == 0 {
        Arc::new(RedirectorService::new(Arc::clone(&store), recorder.clone()))
    } else {
        let cache = match config.cache_ttl_seconds {
            0 => MokaUrlCache::with_capacity(config.cache_capacity),
            ttl => MokaUrlCache::with_ttl(config.cache_capacity, Duration::from_secs(ttl)),
        };
        Arc::new(RedirectorService::new(
            CachedRepository::new(Arc::clone(&store), cache),
            recorder.clone(),
        ))
    };

    let state = AppState::new(
        shortener,
        redirector,
        recorder.clone(),
        config.public_base_url,
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(
        listener,
        App::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("http server failed")?;

    info!("http server stopped, draining click queue");
    recorder.shutdown().await;

    Ok(())
}

async fn open_store(config: &CLI) -> anyhow::Result<Arc<dyn LinkStore>> {
    let policy = CodeReusePolicy::from(config.code_reuse_policy);
    let timeout = Duration::from_millis(config.store_timeout_ms);
    let retry = RetryPolicy::builder().timeout(timeout).build();

    match config.storage {
        StorageBackendArg::InMemory => Ok(Arc::new(BoundedRepository::new(
            InMemoryRepository::with_policy(policy),
            retry,
        ))),
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let settings = MySqlSettings::builder()
                .acquire_timeout(timeout)
                .policy(policy)
                .build();
            let repository = MySqlRepository::connect(dsn, settings)
                .await
                .context("failed to connect to mysql")?;
            repository
                .migrate()
                .await
                .context("failed to apply mysql migrations")?;
            Ok(Arc::new(BoundedRepository::new(repository, retry)))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
