use clap::Parser;
use std::{net::IpAddr, path::PathBuf, process::ExitCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webroot::{
    bind,
    config::{self, Config, ConfigError},
    Router, Server,
};

/// Sequential HTTP server for a static document root, calculator
/// endpoints and raw file uploads.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory static files are served from
    #[arg(long)]
    root: Option<PathBuf>,

    /// Directory uploads are stored in
    #[arg(long)]
    storage: Option<PathBuf>,
}

impl Args {
    fn load(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::load_config(path)?,
            None => Config::default(),
        };

        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(root) = &self.root {
            config.document_root = root.clone();
        }
        if let Some(storage) = &self.storage {
            config.storage_dir = storage.clone();
        }

        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webroot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match args.load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        address = %config.socket_addr(),
        document_root = %config.document_root.display(),
        storage_dir = %config.storage_dir.display(),
        "configuration loaded"
    );

    let router = match Router::from_config(&config) {
        Ok(router) => router,
        Err(err) => {
            tracing::error!(error = %err, "cannot open document root");
            return ExitCode::FAILURE;
        }
    };

    let listener = match bind(config.socket_addr(), config.backlog) {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(address = %config.socket_addr(), error = %err, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    Server::builder()
        .listener(listener)
        .router(router)
        .connection_limits(config.connection)
        .request_limits(config.request)
        .build()
        .launch()
        .await;

    ExitCode::SUCCESS
}
