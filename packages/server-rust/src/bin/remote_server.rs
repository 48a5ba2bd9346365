//! Robot Framework Hyper-V remote library server.
//!
//! Serves the Hyper-V management keywords over XML-RPC until interrupted
//! with Ctrl+C or stopped remotely through `stop_remote_server`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use robot_remote_server::service::config::DEFAULT_DOC_FILE;
use robot_remote_server::{
    load_library, DocumentationResolver, NetworkConfig, NetworkModule, RemoteLibraryService,
    ServerConfig, ShutdownCoordinator, ShutdownPolicy,
};

#[derive(Parser, Debug)]
#[command(name = "robot-hyperv-remote", version, about)]
struct CliArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8270)]
    port: u16,

    /// Ignore remote `stop_remote_server` requests.
    #[arg(long)]
    nostopsvr: bool,

    /// XML documentation file for the served library.
    #[arg(long, env = "ROBOT_REMOTE_DOC_FILE", default_value = DEFAULT_DOC_FILE)]
    doc_file: PathBuf,
}

impl CliArgs {
    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            ..NetworkConfig::default()
        }
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            doc_file: Some(self.doc_file.clone()),
            shutdown: ShutdownPolicy {
                allow_remote_shutdown: !self.nostopsvr,
                ..ShutdownPolicy::default()
            },
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()
        .context("failed to initialize logging")?;

    let server_config = cli_args.server_config();
    let library = load_library(&server_config.library_type)
        .with_context(|| format!("failed to load library '{}'", server_config.library_type))?;
    info!(
        library = library.type_name(),
        keywords = library.len(),
        "keyword library loaded"
    );

    let docs = DocumentationResolver::load(
        server_config.library_type.clone(),
        server_config.doc_file.as_deref(),
    );

    let shutdown = Arc::new(ShutdownCoordinator::new());
    let service = RemoteLibraryService::new(
        Arc::new(library),
        docs,
        Arc::clone(&shutdown),
        server_config.shutdown,
    );

    let network_config = cli_args.network_config();
    let host = network_config.host.clone();
    let mut network = NetworkModule::new(network_config, service, shutdown);
    let port = network.start().await?;

    info!("Robot Framework Hyper-V remote library started at {host} on port {port}");
    if server_config.shutdown.allow_remote_shutdown {
        info!(
            "To stop server/library, send XML-RPC method request 'run_keyword' with single \
             argument of 'stop_remote_server' to do so, or hit Ctrl + C"
        );
    } else {
        info!("Remote shutdown is disabled; hit Ctrl + C to stop server/library");
    }

    network
        .serve(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, shutting down");
            }
        })
        .await
}
