//! Binary entrypoint for the Be.Well USSD service.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the data directory
//! - `start [--bind <addr>]` - serve gateway callbacks over HTTP
//! - `reset-pin <phone>` - issue a temporary PIN the subscriber must change at next login
//!
//! See the library crate docs for module-level details: `bewell_ussd::`.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use bewell_ussd::config::Config;
use bewell_ussd::crm::MarketingCrm;
use bewell_ussd::pin::PinService;
use bewell_ussd::server;
use bewell_ussd::storage::file::FileStorage;
use bewell_ussd::storage::ProfileStore;
use bewell_ussd::ussd::{Collaborators, UssdEngine};
use bewell_ussd::validation::normalize_phone_number;

#[derive(Parser)]
#[command(name = "bewell-ussd")]
#[command(about = "USSD onboarding service for Be.Well subscribers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the data directory
    Init,
    /// Serve USSD gateway callbacks
    Start {
        /// Listen address, overrides server.bind_address
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Issue a temporary PIN for a registered phone number
    ResetPin {
        /// Subscriber phone number, national or international format
        phone: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            info!("Initializing new USSD service configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);

            let cfg = Config::default();
            let storage = FileStorage::new(&cfg.storage.data_dir).await?;
            info!("Initialized data directory at {}", storage.base_dir().display());
        }
        Commands::Start { bind } => {
            let mut config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting bewell-ussd v{}", env!("CARGO_PKG_VERSION"));

            if let Some(addr) = bind {
                config.server.bind_address = addr;
                config.validate()?;
            }

            let storage = Arc::new(FileStorage::new(&config.storage.data_dir).await?);
            let crm = marketing_crm(&config, storage.clone());
            let engine = UssdEngine::new(
                Collaborators::from_storage(storage, crm),
                config.pin.clone(),
                config.ussd.clone(),
            )?;
            server::serve(Arc::new(engine), &config.server).await?;
        }
        Commands::ResetPin { phone } => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);

            let phone = normalize_phone_number(&phone, &config.ussd.default_country_code)?;
            let storage = Arc::new(FileStorage::new(&config.storage.data_dir).await?);
            let profile = storage
                .get_profile_by_phone(&phone)
                .await?
                .ok_or_else(|| anyhow!("No profile registered for {}", phone))?;

            let pins = PinService::new(storage, config.pin.clone())?;
            let (temporary, _) = pins.issue_temporary_pin(&profile.id).await?;
            println!("Temporary PIN for {} {}: {}", profile.first_name, phone, temporary);
            println!("The subscriber must choose a new PIN at next login.");
        }
    }

    Ok(())
}

fn marketing_crm(config: &Config, storage: Arc<FileStorage>) -> Arc<dyn MarketingCrm> {
    match config.crm.base_url.as_deref() {
        #[cfg(feature = "crm-http")]
        Some(base_url) => {
            info!("Using CRM at {}", base_url);
            Arc::new(bewell_ussd::crm::HttpCrm::new(base_url, &config.crm))
        }
        #[cfg(not(feature = "crm-http"))]
        Some(base_url) => {
            warn!(
                "crm.base_url {} ignored: built without the crm-http feature; keeping opt-outs locally",
                base_url
            );
            storage
        }
        None => {
            warn!("No crm.base_url configured; keeping marketing opt-outs in the data directory");
            storage
        }
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| std::fs::OpenOptions::new().create(true).append(true).open(file).ok());

    if let Some(f) = log_file {
        let security_path = config.as_ref().and_then(|c| c.logging.security_file.clone());
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));

        // Foreground runs also echo to the console
        let is_tty = atty::is(atty::Stream::Stdout);

        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());

            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }

            if record.target() == "security" {
                if let Some(ref sec_path) = security_path {
                    if let Ok(mut sf) = std::fs::OpenOptions::new().create(true).append(true).open(sec_path) {
                        let _ = writeln!(sf, "{}", line);
                    }
                }
            }

            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
