use ble_led_panel::transport_btleplug::BtleplugTransport;
use ble_led_panel::{CapabilityResolver, ConnectionManager, InfoField, LogFacade, Logger, PanelConfig};

use clap::Parser;
use indicatif::ProgressBar;
use log::LevelFilter;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// Connect to a BLE LED panel and list its command channels
#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Panel address (MAC, or peripheral UUID on macOS)
    address: String,

    /// Discovery timeout in seconds
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    /// Also read the Device Information Service
    #[arg(long)]
    device_info: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> PanelConfig {
        PanelConfig::new(self.address.as_str()).with_search_timeout(Duration::from_secs(self.timeout))
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "[  {:^8} ] {}", record.level(), record.args()))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let config = args.config();
    let logger: Arc<dyn Logger> = Arc::new(LogFacade);

    let transport = BtleplugTransport::new(logger.clone()).await?;
    let mut panel = ConnectionManager::new(transport, config.address.clone(), logger.clone());

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(64));
    pb.set_message(format!("Searching for `{}`...", config.address));
    let found = panel.search(config.search_timeout).await;
    pb.finish_and_clear();
    if found.is_err() {
        return Ok(());
    }

    if !panel.is_connected().await && panel.connect().await.is_err() {
        return Ok(());
    }
    if !panel.is_connected().await {
        return Ok(());
    }

    let resolver = CapabilityResolver::new(logger.clone());
    if let Some(session) = panel.session() {
        let channels = resolver.resolve_command_channels(session).await;
        println!("write:  {}", channels.write().map_or("-".to_string(), |c| c.uuid.to_string()));
        println!("notify: {}", channels.notify().map_or("-".to_string(), |c| c.uuid.to_string()));

        if args.device_info {
            let info = resolver.resolve_device_info(session).await;
            for field in InfoField::ALL {
                if let Some(text) = info.text(field) {
                    println!("{}: {}", field.name(), text);
                }
            }
        }
    }
    logger.info("LED panel initialized successfully");

    // logged
    let _ = panel.disconnect().await;
    Ok(())
}
