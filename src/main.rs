use clap::Parser;
use skema_sync::app::runner::{build_pipeline, describe_plan, run_sync, RunOptions, RunOutcome};
use skema_sync::utils::{logger, validation::Validate};
use skema_sync::{CliConfig, LocalStorage, SyncEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting skema-sync");

    // 驗證配置
    if let Err(e) = config.validate().and_then(|_| config.load_blacklist()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let storage = LocalStorage::new(".".to_string());
    let options = RunOptions {
        dry_run: config.dry_run,
        dump_json: config.dump_json.clone(),
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
            println!("✅ Sync completed successfully!");
            println!(
                "📅 {} inserted, {} restored, {} updated, {} unchanged, {} deleted",
                report.inserted, report.restored, report.updated, report.unchanged, report.deleted
            );
            if report.extra > report.deleted {
                println!(
                    "ℹ️ {} event(s) are no longer on the schedule (use --delete-extra to remove)",
                    report.extra - report.deleted
                );
            }
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
