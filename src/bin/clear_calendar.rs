use clap::Parser;
use skema_sync::adapters::google::DEFAULT_CALENDAR_API_URL;
use skema_sync::config::{DEFAULT_CALENDAR_ID, DEFAULT_CREDENTIALS_PATH, DEFAULT_TOKEN_PATH};
use skema_sync::core::reconcile::clear_managed;
use skema_sync::utils::logger;
use skema_sync::GoogleCalendar;

/// Removes every event this tool has created from a calendar.
#[derive(Parser)]
#[command(name = "clear-calendar")]
struct Args {
    #[arg(long, default_value = DEFAULT_CALENDAR_ID)]
    calendar_id: String,

    #[arg(long, default_value = DEFAULT_TOKEN_PATH)]
    token_path: String,

    #[arg(long, default_value = DEFAULT_CREDENTIALS_PATH)]
    credentials_path: String,

    #[arg(long, default_value = DEFAULT_CALENDAR_API_URL)]
    calendar_api_url: String,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    tracing::info!("🧹 Clearing managed events from {}", args.calendar_id);

    let result = async {
        let calendar = GoogleCalendar::connect(
            &args.calendar_api_url,
            &args.token_path,
            &args.credentials_path,
        )?;
        clear_managed(&calendar, &args.calendar_id).await
    }
    .await;

    match result {
        Ok(deleted) => println!("✅ Deleted {} event(s)", deleted),
        Err(e) => {
            let exit_code = logger::report_failure("Clear", &e);
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
