#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use devwatch_service::database::initialize_pool;
use devwatch_service::monitoring::build_prober;
use devwatch_service::pool::open_pool;
use devwatch_service::{Config, LibsqlDeviceRepository, RefreshScheduler, StatusRefresher};
use logger::{LogFormat, LogOptions, init_tracing};
use tracing::info;

mod error;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use error::AppError;
use state::AppState;

/// Device liveness monitor: periodic probes plus HTTP triggers
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single refresh cycle and exit
    #[arg(long)]
    once: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_config(cli.config.as_ref())?;
    config.apply_env_overrides()?;
    config.validate()?;

    if cli.print_config {
        print!("{config}");
        return Ok(());
    }

    init_tracing(&LogOptions {
        format: LogFormat::from_name(&config.log.format),
        utc_offset: config.log_offset(),
        level: None,
    });

    let refresher = build_refresher(&config).await?;

    if cli.once {
        let report = refresher.refresh().await?;
        info!(
            devices = report.devices_found,
            checked = report.checked(),
            online = report.online(),
            "Refresh finished"
        );
        return Ok(());
    }

    let scheduler = config.schedule.enabled.then(|| {
        info!("Scheduling device status checks every {}s", config.schedule.interval_seconds);
        RefreshScheduler::new(Arc::clone(&refresher), config.schedule_interval()).start()
    });

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let result = run_server(addr, web::Data::new(AppState::new(refresher))).await;

    if let Some(handle) = scheduler {
        handle.abort();
    }
    result
}

async fn build_refresher(config: &Config) -> Result<Arc<StatusRefresher>, AppError> {
    info!("Opening device store at {}", config.database.path);
    let pool = open_pool(&config.database.path, config.database.pool_size).await?;
    initialize_pool(&pool).await?;

    let repository = Arc::new(LibsqlDeviceRepository::new_from_pool(pool));
    let prober = build_prober(&config.probe);
    info!(
        method = %config.probe.method,
        max_concurrent = config.probe.max_concurrent,
        "Probing with {} packets, {}s timeout",
        config.probe.count,
        config.probe.timeout_seconds
    );

    Ok(Arc::new(StatusRefresher::new(repository, prober, config.probe.max_concurrent)))
}

async fn run_server(addr: SocketAddr, state: web::Data<AppState>) -> Result<(), AppError> {
    info!("Listening on {addr}");
    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
