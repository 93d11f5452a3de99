//! Render worker binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use render_db::{connect, run_migrations, JobRepository, ProjectRepository, RenditionRepository};
use render_media::{check_ffmpeg, check_ffprobe, Fetcher};
use render_queue::{ProgressChannel, RenderQueue};
use render_storage::ObjectStore;
use render_worker::http::AppState;
use render_worker::{AppConfig, Controller, Publisher, RenditionGenerator};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT").map(|v| v.to_lowercase() == "json").unwrap_or(false);
    let env_filter = EnvFilter::from_default_env().add_directive("render_worker=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry().with(fmt::layer().json()).with(env_filter).init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true).with_file(false).with_line_number(false))
            .with(env_filter)
            .init();
    }

    info!("Starting render-worker");

    if let Err(e) = check_ffmpeg() {
        error!("ffmpeg not available on PATH: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = check_ffprobe() {
        error!("ffprobe not available on PATH: {}", e);
        std::process::exit(1);
    }

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match connect(&config.db).await {
        Ok(p) => p,
        Err(e) => {
            error!("failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = run_migrations(&pool).await {
        error!("failed to run migrations: {}", e);
        std::process::exit(1);
    }

    let jobs = JobRepository::new(pool.clone());
    let projects = ProjectRepository::new(pool.clone());
    let renditions_repo = RenditionRepository::new(pool.clone());

    let queue = match RenderQueue::new(config.queue.clone()) {
        Ok(q) => Arc::new(q),
        Err(e) => {
            error!("failed to create render queue: {}", e);
            std::process::exit(1);
        }
    };

    let redis_client = match redis::Client::open(config.queue.redis_url.as_str()) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to create redis client for progress channel: {}", e);
            std::process::exit(1);
        }
    };
    let progress = ProgressChannel::new(redis_client);

    let storage = ObjectStore::new(config.storage.clone());

    let fetcher = match Fetcher::new() {
        Ok(f) => f.with_concurrency(config.worker.asset_concurrency),
        Err(e) => {
            error!("failed to create asset fetcher: {}", e);
            std::process::exit(1);
        }
    };

    let publisher = Publisher::new(storage.clone(), renditions_repo);

    let controller = Arc::new(Controller::new(
        jobs.clone(),
        projects,
        storage,
        progress,
        fetcher.clone(),
        publisher.clone(),
        std::path::PathBuf::from(&config.worker.work_dir),
        config.worker.presign_expiry,
    ));

    let busy = render_worker::BusyFlag::new();

    let rendition_generator = Arc::new(RenditionGenerator::new(
        fetcher,
        publisher,
        std::path::PathBuf::from(&config.worker.work_dir),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let acquirer = render_worker::Acquirer::new(
        queue.clone(),
        jobs,
        controller,
        busy.clone(),
        config.worker.poll_interval,
        config.worker.claim_interval,
        config.worker.claim_min_idle,
    );

    let acquirer_handle = tokio::spawn(async move {
        if let Err(e) = acquirer.run(shutdown_rx).await {
            error!("acquirer exited with error: {}", e);
        }
    });

    let state = AppState {
        queue,
        busy,
        rendition_generator,
        shared_secret: config.worker.shared_secret.map(|s| s.into()),
    };
    let app = render_worker::http::create_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.worker.http_port).parse().expect("invalid bind address");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("HTTP surface listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("http server error: {}", e);
        }
    });

    tokio::signal::ctrl_c().await.ok();
    info!("received shutdown signal, draining");
    shutdown_tx.send(true).ok();

    if tokio::time::timeout(config.worker.shutdown_timeout, acquirer_handle).await.is_err() {
        error!("acquirer did not drain within the shutdown timeout, exiting anyway");
    }
    server_handle.abort();

    info!("render-worker shutdown complete");
}
