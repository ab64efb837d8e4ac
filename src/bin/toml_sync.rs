use clap::Parser;
use skema_sync::app::runner::{build_pipeline, describe_plan, run_sync, RunOptions, RunOutcome};
use skema_sync::core::ConfigProvider;
use skema_sync::utils::{logger, validation::Validate};
use skema_sync::{LocalStorage, SyncEngine, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-sync")]
#[command(about = "Schedule sync driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "skema-sync.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines (for cron / systemd timers)
    #[arg(long)]
    json_logs: bool,

    /// Override the number of weeks from the config
    #[arg(long)]
    weeks: Option<u32>,

    /// Dry run - show planned calendar changes without writing them
    #[arg(long)]
    dry_run: bool,
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    tracing::info!("📋 Configuration Summary:");
    tracing::info!("   School: {}", config.school_id());
    tracing::info!("   Calendar: {}", config.calendar_id());
    tracing::info!("   Weeks: {} ({})", config.weeks(), config.timezone());
    tracing::info!("   Hide cancelled: {}", config.hide_cancelled());
    tracing::info!("   Decode groups: {}", config.decode_groups());
    tracing::info!("   Blacklist rules: {}", config.blacklist_rules().len());
    tracing::info!("   Delete extra: {}", config.delete_extra());
    if let Some(dump) = config.dump_json() {
        tracing::info!("   JSON dump: {}", dump);
    }
    if args.dry_run {
        tracing::info!("   Mode: dry run");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based schedule sync");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if let Some(weeks) = args.weeks {
        config.sync.weeks = weeks;
        tracing::info!("🔧 Weeks overridden to: {}", weeks);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    let storage = LocalStorage::new(".".to_string());
    let options = RunOptions {
        dry_run: args.dry_run,
        dump_json: config.dump_json().map(str::to_string),
    };

    let pipeline = match build_pipeline(&config, &storage).await {
        Ok(pipeline) => pipeline,
        Err(e) => std::process::exit(logger::report_failure("Setup", &e).max(1)),
    };
    let engine = SyncEngine::new(pipeline);

    match run_sync(&engine, &storage, &options).await {
        Ok(RunOutcome::Planned(plan)) => {
            for line in describe_plan(&plan) {
                println!("{}", line);
            }
            println!("🔍 {} change(s) planned, nothing written", plan.write_count());
        }
        Ok(RunOutcome::Applied(report)) => {
            tracing::info!("✅ Sync completed successfully!");
            println!(
                "✅ {} inserted, {} restored, {} updated, {} unchanged, {} deleted",
                report.inserted, report.restored, report.updated, report.unchanged, report.deleted
            );
        }
        Err(e) => {
            let exit_code = logger::report_failure("Sync", &e);
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
