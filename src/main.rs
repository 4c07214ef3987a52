//! rss-reflector server binary

use clap::Parser;
use rss_reflector::{AppState, Config, FeedReflector, Fetcher, api, shutdown_signal};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rss-reflector", version)]
#[command(about = "Reflect video feeds as podcasts and serve their audio", long_about = None)]
struct CliArgs {
    /// TOML configuration file; flags given on the command line override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, `host:port` or `:port` (default: :3322)
    #[arg(long, value_parser = parse_bind_address)]
    addr: Option<SocketAddr>,

    /// Data directory (default: data)
    #[arg(long)]
    data: Option<PathBuf>,

    /// youtube-dl binary (default: youtube-dl)
    #[arg(long = "youtube-dl")]
    youtube_dl: Option<PathBuf>,

    /// Maximum number of cached media files (default: 20)
    #[arg(long)]
    max_data_count: Option<usize>,

    /// Extra youtube-dl flags, split with shell quoting rules
    #[arg(long = "youtube-dl-flags", allow_hyphen_values = true)]
    youtube_dl_flags: Option<String>,
}

impl CliArgs {
    /// Build the effective configuration: file (or defaults), then explicit flags
    fn into_config(self) -> rss_reflector::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_file(path)?,
            None => Config::default(),
        };

        if let Some(addr) = self.addr {
            config.server.bind_address = addr;
        }
        if let Some(data) = self.data {
            config.fetcher.data_dir = data;
        }
        if let Some(tool) = self.youtube_dl {
            config.fetcher.downloader = tool;
        }
        if let Some(max) = self.max_data_count {
            config.fetcher.max_cached_files = max;
        }
        if let Some(flags) = self.youtube_dl_flags {
            config.fetcher.downloader_flags = flags;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Accept Go-style `:port` as well as a full socket address
fn parse_bind_address(value: &str) -> Result<SocketAddr, String> {
    let value = if value.starts_with(':') {
        format!("0.0.0.0{value}")
    } else {
        value.to_string()
    };
    value
        .parse()
        .map_err(|e| format!("invalid listen address {value}: {e}"))
}

fn init_logging() {
    // defaults to INFO if RUST_LOG is not set
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    init_logging();

    let config = Arc::new(args.into_config()?);
    tracing::info!(
        addr = %config.server.bind_address,
        data = %config.fetcher.data_dir.display(),
        youtube_dl = %config.fetcher.downloader.display(),
        max_data_count = config.fetcher.max_cached_files,
        youtube_dl_flags = %config.fetcher.downloader_flags,
        "effective configuration"
    );

    let fetcher = match Fetcher::new(&config.fetcher).await {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => {
            tracing::error!(error = %e, "failed to start fetcher");
            return Err(e.into());
        }
    };
    let reflector = Arc::new(FeedReflector::new(&config.feed)?);
    let state = AppState::new(fetcher.clone(), reflector, config);

    let served = api::start_server(state, shutdown_signal()).await;
    fetcher.shutdown().await;

    served?;
    Ok(())
}
