use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use txmap_api::{Explorer, HttpGraphDataService, RestApi, ServiceConfig};
use txmap_core::{LayoutConfig, StoreConfig};
use txmap_storage::{TabManager, TabManagerConfig};

/// Transaction graph explorer backend
#[derive(Parser, Debug)]
#[command(name = "txmap")]
#[command(about = "Explore blockchain transaction graphs", long_about = None)]
struct Args {
    /// HTTP API port
    #[arg(long, default_value_t = 8780)]
    http_port: u16,

    /// Base URL of the graph data service
    #[arg(long, default_value = "http://localhost:8080")]
    backend_url: String,

    /// Request timeout for the graph data service, in seconds
    #[arg(long, default_value_t = 30)]
    backend_timeout: u64,

    /// Horizontal distance between layout columns
    #[arg(long, default_value_t = 200)]
    horizontal_gap: i64,

    /// Vertical distance between layout rows
    #[arg(long, default_value_t = 100)]
    vertical_gap: i64,

    /// Undo steps kept per tab
    #[arg(long, default_value_t = 10)]
    max_history: usize,

    /// Maximum number of open tabs
    #[arg(long, default_value_t = 5)]
    max_tabs: usize,

    /// Directory for tab snapshots (disabled when omitted)
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string().to_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting txmap v{}", env!("CARGO_PKG_VERSION"));
    info!("Graph data service: {}", args.backend_url);
    info!("HTTP API port: {}", args.http_port);

    let service = HttpGraphDataService::new(ServiceConfig {
        base_url: args.backend_url.clone(),
        timeout_secs: args.backend_timeout,
        ..Default::default()
    })?;

    let tab_config = TabManagerConfig {
        max_tabs: args.max_tabs,
        store: StoreConfig {
            max_history: args.max_history,
        },
        ..Default::default()
    };
    let tabs = match &args.snapshot_dir {
        Some(dir) => {
            info!("Snapshot directory: {:?}", dir);
            TabManager::with_snapshot_dir(tab_config, dir)?
        }
        None => TabManager::new(tab_config),
    };

    let layout = LayoutConfig {
        horizontal_gap: args.horizontal_gap,
        vertical_gap: args.vertical_gap,
    };
    let explorer = Arc::new(Explorer::new(Arc::new(service), Arc::new(tabs), layout));
    info!("Explorer initialized");

    let http_port = args.http_port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(explorer, http_port).await {
                eprintln!("HTTP server error: {}", e);
            }
        })
    });

    info!("txmap started successfully");
    info!("HTTP API: http://localhost:{}/", args.http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
