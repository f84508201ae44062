mod cli;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands, Overrides};
use framescribe::config::Config;
use framescribe::coordinator::{FileOutcome, Pipeline, UnitOutcome};
use framescribe::media::collect_inputs;
use framescribe::progress::LogSink;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let directive = if cli.verbose {
        "framescribe=debug"
    } else {
        "framescribe=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .init();

    match cli.command {
        Commands::InitConfig => {
            print!("{}", Config::generate_default_commented());
            Ok(())
        }
        Commands::Process {
            inputs,
            recursive,
            output,
            model,
            no_frames,
            skip_transcription,
            skip_processed,
        } => {
            let (mut config, config_path) = Config::load_with_path(cli.config.as_deref())?;
            if let Some(path) = &config_path {
                tracing::info!("Using config {}", path.display());
            }
            Overrides {
                output,
                model,
                no_frames,
                skip_transcription,
                skip_processed,
            }
            .apply(&mut config);

            let files = collect_inputs(&inputs, recursive)?;
            if files.is_empty() {
                tracing::warn!("No media files found");
                return Ok(());
            }
            tracing::info!("Found {} files to process", files.len());

            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || {
                tracing::info!("Interrupt received, finishing the current file");
                flag.store(true, Ordering::SeqCst);
            })?;

            let pipeline = Pipeline::from_config(&config)?;
            let report = pipeline.run_batch(&files, &shutdown, &mut LogSink);

            let failed = report
                .files
                .iter()
                .filter(|(_, outcome)| match outcome {
                    FileOutcome::Rejected(_) => true,
                    FileOutcome::Processed {
                        frames,
                        transcription,
                    } => {
                        matches!(frames, UnitOutcome::Failed(_))
                            || matches!(transcription, UnitOutcome::Failed(_))
                    }
                    FileOutcome::AlreadyProcessed => false,
                })
                .count();
            if failed > 0 {
                tracing::warn!("{} of {} files had failures", failed, report.files.len());
            }
            if report.interrupted {
                tracing::info!("Stopped early on request");
            }
            Ok(())
        }
    }
}
