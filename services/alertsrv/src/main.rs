//! Alert Service (alertsrv)
//!
//! Polls alert feeds, notifies subscribers through Telegram and serves the
//! admin API until SIGINT/SIGTERM.

use alert_engine::{
    init_schema, AlertSource, AlertStore, ConvertRasterizer, FakeAlertInjector,
    FallbackAlertSource, MapArtifactStore, MapRenderCache, NotificationFanout,
    ReconciliationEngine, SubscriptionLedger,
};
use alertsrv::{
    api::routes::create_router, AppConfig, AppState, HttpAlertProvider, TelegramTransport,
};
use anyhow::{Context, Result};
use clap::Parser;
use common::{logging, shutdown::wait_for_shutdown, SqliteClient};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "alertsrv - alert reconciliation and notification service")]
struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", default_value = alertsrv::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the admin API bind address
    #[arg(long, env = "ALERTSRV_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.service.bind = bind;
    }

    let mut log_config = config.logging.clone();
    log_config.service_name = config.service.name.clone();
    logging::init_with_config(log_config).context("Failed to initialize logging")?;

    info!("Starting {} service", config.service.name);

    let sqlite = SqliteClient::new(&config.database.path)
        .await
        .with_context(|| format!("Failed to open database {:?}", config.database.path))?;
    let pool = sqlite.pool().clone();
    init_schema(&pool)
        .await
        .context("Failed to initialize database schema")?;

    // Alert feeds, in priority order
    let mut providers: Vec<Arc<dyn AlertSource>> =
        Vec::with_capacity(config.providers.urls.len());
    for url in &config.providers.urls {
        let provider = HttpAlertProvider::new(url.as_str(), config.fetch_timeout())
            .with_context(|| format!("Invalid alert provider {}", url))?;
        info!("Alert provider: {}", provider.name());
        providers.push(Arc::new(provider));
    }
    let source = Arc::new(FallbackAlertSource::new(providers)?);

    let transport = Arc::new(TelegramTransport::new(
        &config.telegram.api_base,
        &config.telegram.bot_token,
        config.telegram.upload_chat_id,
        config.telegram_timeout(),
    )?);

    let alerts = AlertStore::new(pool.clone());
    let ledger = SubscriptionLedger::new(pool.clone());
    let fakes = Arc::new(FakeAlertInjector::new());

    let fanout = NotificationFanout::new(ledger.clone(), transport.clone())
        .with_template(config.notifications.templates.clone())
        .with_concurrency(config.notifications.concurrency)
        .with_send_timeout(config.send_timeout());

    let engine = Arc::new(
        ReconciliationEngine::new(source, alerts.clone(), ledger.clone(), fanout)
            .with_fake_alerts(Arc::clone(&fakes)),
    );

    let rasterizer = ConvertRasterizer::new(&config.maps.work_dir)
        .with_program(config.maps.rasterizer.clone())
        .with_width(config.maps.width);
    let maps = MapRenderCache::new(
        MapArtifactStore::new(pool),
        &config.maps.template_path,
        Arc::new(rasterizer),
        transport,
    );

    let shutdown_token = CancellationToken::new();
    let engine_handle =
        Arc::clone(&engine).start(config.tick_interval(), shutdown_token.child_token());

    let state = AppState {
        service_name: config.service.name.clone(),
        engine,
        alerts,
        ledger,
        maps,
        fakes,
    };
    let app = create_router(state);

    let addr: SocketAddr = config
        .service
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.service.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("API server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let server_token = shutdown_token.clone();
    let server_handle = tokio::spawn(async move {
        let shutdown = async move { server_token.cancelled().await };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("Server error: {}", e);
        }
    });

    wait_for_shutdown().await;
    shutdown_token.cancel();

    // An in-flight tick finishes before the loop exits
    engine_handle.shutdown().await;
    if let Err(e) = server_handle.await {
        error!("Server task terminated abnormally: {}", e);
    }

    info!("{} stopped", config.service.name);
    Ok(())
}
