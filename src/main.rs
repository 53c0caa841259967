use anyhow::Context;
use clap::Parser;
use stargazer_etl::utils::error::ErrorSeverity;
use stargazer_etl::utils::{logger, validation::Validate};
use stargazer_etl::{
    render_users, sort_users, CancelToken, CliConfig, EngineConfig, EngineError, ProgressEvent,
    RunOutcome, StargazerEngine,
};
use tokio::sync::mpsc;

const EVENT_BUFFER: usize = 64;
const EXIT_STOPPED: i32 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // logging
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting stargazer-etl CLI");
    if cli.verbose {
        tracing::debug!("CLI owner={} repo={} max_users={}", cli.owner, cli.repo, cli.max_users);
    }

    // validate before any network work
    if let Err(e) = cli.validate() {
        report_error(&e);
        std::process::exit(1);
    }

    let engine_config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load engine config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let engine = StargazerEngine::with_reqwest(engine_config);
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let printer = tokio::spawn(print_events(events_rx, cli.events));

    let handle = engine.spawn(cli.run_request(), events_tx);
    setup_shutdown_handler(handle.cancel_token());

    let outcome = handle.wait().await;
    printer.await.context("event printer task failed")?;

    match outcome {
        RunOutcome::Completed { mut users, processed } => {
            tracing::info!(
                "✅ Collected {} users ({} stargazers processed)",
                users.len(),
                processed
            );
            sort_users(&mut users, cli.sort_by, cli.order);
            let rendered = render_users(&users, cli.format)?;
            print!("{}", rendered);
            if !rendered.is_empty() && !rendered.ends_with('\n') {
                println!();
            }
            Ok(())
        }
        RunOutcome::Stopped => {
            eprintln!("⏹️ Stopped before completion");
            std::process::exit(EXIT_STOPPED);
        }
        RunOutcome::Failed { message, severity } => {
            eprintln!("❌ {}", message);
            // exit code follows severity
            let exit_code = match severity {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }
    }
}

async fn print_events(mut events: mpsc::Receiver<ProgressEvent>, as_json: bool) {
    while let Some(event) = events.recv().await {
        if as_json {
            match serde_json::to_string(&event) {
                Ok(line) => eprintln!("{}", line),
                Err(e) => tracing::warn!("Failed to encode event: {}", e),
            }
            continue;
        }

        match &event {
            ProgressEvent::Progress {
                message,
                total,
                processed,
                ..
            } => match (processed, total) {
                (Some(processed), Some(total)) => {
                    tracing::info!("📊 [{}/{}] {}", processed, total, message)
                }
                _ => tracing::info!("📊 {}", message),
            },
            ProgressEvent::Complete { message, .. } => tracing::info!("🎉 {}", message),
            ProgressEvent::Error { message } => tracing::error!("❌ {}", message),
        }
    }
}

fn report_error(error: &EngineError) {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        error,
        error.category(),
        error.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", error.recovery_suggestion());
    eprintln!("❌ {}", error.user_friendly_message());
    eprintln!("💡 Suggestion: {}", error.recovery_suggestion());
}

/// First Ctrl+C stops the run gracefully, a second one exits immediately.
fn setup_shutdown_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            return;
        }
        eprintln!("\nShutdown requested, stopping after the current request...");
        eprintln!("Press Ctrl+C again to force quit.");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Force quit!");
            std::process::exit(EXIT_STOPPED);
        }
    });
}
