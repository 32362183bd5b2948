use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ev_route_planner::catalog::InMemoryCatalog;
use ev_route_planner::energy::EnergyModel;
use ev_route_planner::haversine::HaversineDirections;
use ev_route_planner::osrm::{OsrmClient, OsrmConfig};
use ev_route_planner::planner::{Planner, PlannerConfig};
use ev_route_planner::server::router;
use ev_route_planner::traits::DirectionsProvider;

#[derive(Parser, Debug)]
#[command(name = "ev-route-planner")]
#[command(about = "Multi-stop EV route planning service", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "EV_PLANNER_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    /// JSON export of the charging station catalog
    #[arg(long, env = "EV_PLANNER_STATIONS")]
    stations: Option<PathBuf>,

    /// OSRM base URL; straight-line estimates are used when absent
    #[arg(long, env = "OSRM_URL")]
    osrm_url: Option<String>,

    #[arg(long, env = "OSRM_PROFILE", default_value = "car")]
    osrm_profile: String,

    /// Per-lookup timeout in seconds
    #[arg(long, env = "OSRM_TIMEOUT_SECS", default_value = "10")]
    osrm_timeout_secs: u64,

    /// Average speed for straight-line estimates (km/h)
    #[arg(long, default_value = "60")]
    fallback_speed_kmh: f64,

    /// Road distance over straight-line distance for straight-line estimates
    #[arg(long, default_value = "1.0")]
    fallback_detour_factor: f64,

    /// Battery percentage that must remain on arrival everywhere
    #[arg(long, env = "EV_PLANNER_RESERVE_PERCENT", default_value = "10")]
    reserve_percent: f64,

    /// Maximum distance of a usable station from the base route (km)
    #[arg(long, default_value = "15")]
    corridor_buffer_km: f64,

    /// Concurrent directions lookups per request
    #[arg(long, default_value = "8")]
    max_parallel_lookups: usize,
}

impl Args {
    fn validate(&self) -> Result<()> {
        if !(0.0..100.0).contains(&self.reserve_percent) {
            bail!("reserve percent must be in [0, 100), got {}", self.reserve_percent);
        }
        if !(self.fallback_speed_kmh.is_finite() && self.fallback_speed_kmh > 0.0) {
            bail!("fallback speed must be positive, got {}", self.fallback_speed_kmh);
        }
        if !(self.fallback_detour_factor.is_finite() && self.fallback_detour_factor > 0.0) {
            bail!("fallback detour factor must be positive, got {}", self.fallback_detour_factor);
        }
        if self.max_parallel_lookups == 0 {
            bail!("max parallel lookups must be at least 1");
        }
        Ok(())
    }
}

fn init_logger() {
    let default_level = LevelFilter::INFO;
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| default_level.to_string());
    let env_filter = EnvFilter::try_new(rust_log).unwrap_or_else(|err| {
        eprintln!(
            "invalid {}, falling back to level '{}' - {}",
            EnvFilter::DEFAULT_ENV,
            default_level,
            err,
        );
        EnvFilter::new(default_level.to_string())
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();
}

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    args.validate()?;

    let catalog = match &args.stations {
        Some(path) => InMemoryCatalog::from_json_file(path)
            .with_context(|| format!("loading station catalog from {}", path.display()))?,
        None => {
            warn!("no station catalog given, every long trip will report no stations");
            InMemoryCatalog::default()
        }
    };
    info!(stations = catalog.len(), "station catalog loaded");

    // The blocking OSRM client must be created (and dropped) outside the
    // tokio runtime.
    let directions: Box<dyn DirectionsProvider> = match &args.osrm_url {
        Some(base_url) => {
            info!(%base_url, profile = %args.osrm_profile, "using OSRM directions");
            Box::new(OsrmClient::new(OsrmConfig {
                base_url: base_url.clone(),
                profile: args.osrm_profile.clone(),
                timeout_secs: args.osrm_timeout_secs,
            })?)
        }
        None => {
            warn!("no OSRM URL given, using straight-line directions");
            Box::new(HaversineDirections::new(args.fallback_speed_kmh, args.fallback_detour_factor))
        }
    };

    let config = PlannerConfig {
        reserve_fraction: args.reserve_percent / 100.0,
        corridor_buffer_km: args.corridor_buffer_km,
        max_parallel_lookups: args.max_parallel_lookups,
        energy: EnergyModel::default(),
    };
    let planner = Arc::new(Planner::new(directions, catalog, config));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(serve(&args.bind, Arc::clone(&planner)))?;
    drop(runtime);

    Ok(())
}

async fn serve(
    bind: &str,
    planner: Arc<Planner<Box<dyn DirectionsProvider>, InMemoryCatalog>>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {}", bind))?;
    info!(address = %listener.local_addr()?, "route planner listening");

    axum::serve(listener, router(planner))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
