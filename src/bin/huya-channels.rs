use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

use livefeed::{FeedError, HttpPageSource, HuyaChannelsWidget, PoolConfig, Result, WidgetConfig};

#[derive(Parser)]
#[command(
    name = "huya-channels",
    version,
    about = "Show Huya channels sorted by viewers"
)]
struct Cli {
    /// Room logins to look up, overriding the config file
    channels: Vec<String>,

    /// JSON widget configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of concurrent lookups; non-positive values use the default
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    workers: Option<i64>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 5, value_name = "SECS")]
    timeout: u64,

    /// Print channels as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => WidgetConfig::from_json_file(path)?,
        None => WidgetConfig::default(),
    };
    if !cli.channels.is_empty() {
        config.channels = cli.channels;
    }
    if let Some(workers) = cli.workers {
        config.pool = PoolConfig::new(usize::try_from(workers).unwrap_or(0));
    }

    if config.channels.is_empty() {
        info!("No channels to fetch");
        return Ok(());
    }
    if cli.timeout == 0 {
        return Err(FeedError::InvalidConfig(
            "timeout must be at least one second".to_owned(),
        ));
    }

    info!("huya-channels {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Fetching {} channels with {} workers",
        config.channels.len(),
        config.pool.workers()
    );

    let source = HttpPageSource::new(Duration::from_secs(cli.timeout))?;
    let mut widget = HuyaChannelsWidget::new(config);
    widget.update(&source)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(widget.channels())?);
    } else {
        print!("{}", widget.render_text());
    }

    Ok(())
}
