use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use filevault::config::StorageBackend;
use filevault::store::{DatabaseStorage, MemStorage, Storage};
use filevault::web::WebServer;
use filevault::{Config, Database};

#[derive(Parser, Debug)]
#[command(name = "filevault")]
#[command(about = "Personal cloud file storage server", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "FILEVAULT_CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load_with_env(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", args.config.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = filevault::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        filevault::logging::init_console_only(&config.logging.level);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> filevault::Result<()> {
    config.validate()?;

    info!("filevault starting");

    let storage: Arc<dyn Storage> = match config.database.backend {
        StorageBackend::Sqlite => {
            let db = Database::open(&config.database.path).await?;
            info!(path = %config.database.path, "Using SQLite storage");
            Arc::new(DatabaseStorage::new(db))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on exit");
            Arc::new(MemStorage::new())
        }
    };

    info!(
        "Server configured on {}:{}",
        config.web.host, config.web.port
    );

    WebServer::new(&config, storage)?.run().await
}
