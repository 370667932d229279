use clap::Parser;
use dirmirror::commands::sync;
use dirmirror::config::{Cli, ConfigFile};
use dirmirror::{Config, LogLevel, LogSender, Logger, MirrorError};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const OP_MAIN: &str = "main";
const OP_LOAD_CONFIG: &str = "load_config";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    tracing::info!("dirmirror v{}", dirmirror::VERSION);

    let file = match ConfigFile::load(&cli.config) {
        Ok(file) => file,
        Err(e) => {
            // Record the failure with the default threshold, then give up.
            let (log, writer) = Logger::new(&cli.log_file, LogLevel::default()).spawn().await?;
            log.critical(
                OP_LOAD_CONFIG,
                format!("Cannot read {}: {}", cli.config.display(), e),
            );
            finish(log, writer).await;
            println!("Error reading config file. App terminated");
            return Ok(ExitCode::FAILURE);
        }
    };

    if file.is_empty() {
        tracing::warn!("{} has no key=value lines", cli.config.display());
    } else {
        tracing::debug!("{} key(s) read from {}", file.len(), cli.config.display());
    }

    if let Err(e) = file.log_level() {
        println!("{}", e);
    }

    let config = match Config::from_file(&file).and_then(|config| {
        let config = config.with_cli(&cli);
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) if e.is_config_error() => {
            println!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let logger = Logger::new(&config.log_path, config.log_level);
    tracing::debug!(
        "logging to {} at {}",
        logger.path().display(),
        logger.threshold()
    );
    let (log, writer) = logger.spawn().await?;
    log.info(OP_MAIN, "start");

    let result = sync::run(&config, log.clone()).await;
    finish(log, writer).await;

    match result {
        Ok(cycles) => {
            tracing::info!("stopped after {} cycle(s)", cycles);
            Ok(ExitCode::SUCCESS)
        }
        Err(MirrorError::Halted) => {
            println!("{}", MirrorError::Halted);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

/// Drop the last sender and wait for the writer to flush
async fn finish(
    log: LogSender,
    writer: tokio::task::JoinHandle<Result<u64, MirrorError>>,
) {
    drop(log);
    match writer.await {
        Ok(Ok(written)) => tracing::debug!("{} log record(s) written", written),
        Ok(Err(e)) => tracing::warn!("log writer failed: {}", e),
        Err(e) => tracing::warn!("log writer task failed: {}", e),
    }
}
