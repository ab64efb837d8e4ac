use clap::Parser;
use skema_sync::adapters::storage::save_snapshot;
use skema_sync::app::pipelines::sync_pipeline::{extractor_config, fetch_schedule, SyncSettings};
use skema_sync::app::runner::portal_session;
use skema_sync::utils::{logger, validation::Validate};
use skema_sync::{CliConfig, LocalStorage};

/// Fetches the schedule and writes it to a JSON file without touching the calendar.
#[derive(Parser)]
#[command(name = "dump-schedule")]
struct Args {
    #[command(flatten)]
    config: CliConfig,

    /// Output file name; `.json` is appended when missing
    #[arg(long, default_value = "schedule.json")]
    output: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();
    logger::init_cli_logger(args.config.verbose);

    if let Err(e) = args.config.validate().and_then(|_| args.config.load_blacklist()) {
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let config = &args.config;
    let storage = LocalStorage::new(".".to_string());

    let result = async {
        let settings = SyncSettings::from_config(config)?;
        let extractor = extractor_config(config, &storage).await?;
        let source = portal_session(config)?;
        let snapshot = fetch_schedule(&source, &settings.weeks_to_sync(), &extractor).await?;
        let filename = save_snapshot(&storage, &args.output, &snapshot).await?;
        Ok::<_, skema_sync::SyncError>((snapshot.len(), filename))
    }
    .await;

    match result {
        Ok((count, filename)) => {
            println!("✅ {} entries written to {}", count, filename);
        }
        Err(e) => {
            let exit_code = logger::report_failure("Dump", &e);
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
