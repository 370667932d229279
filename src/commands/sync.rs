//! Main mirror loop

use crate::logging::LogSender;
use crate::types::MirrorError;
use crate::walker::{
    check_master_folder, check_slave_folder, critical_channel, CycleReport, WalkContext,
};
use crate::Config;
use std::sync::Arc;
use tracing::{debug, info, warn};

const OP_CYCLE: &str = "run_cycle";

/// What one propagate + prune pass did
#[derive(Debug)]
pub struct CycleOutcome {
    pub report: CycleReport,
    pub propagate: Result<(), MirrorError>,
    pub prune: Result<(), MirrorError>,
}

impl CycleOutcome {
    /// Whether either walker failed at its root
    pub fn is_critical(&self) -> bool {
        [&self.propagate, &self.prune]
            .iter()
            .any(|result| matches!(result, Err(e) if e.is_critical()))
    }
}

/// Run both walkers once, concurrently, and wait for both
pub async fn run_cycle(ctx: &Arc<WalkContext>, config: &Config) -> CycleOutcome {
    let propagate = tokio::spawn(check_master_folder(
        Arc::clone(ctx),
        config.source.clone(),
        config.destination.clone(),
    ));
    let prune = tokio::spawn(check_slave_folder(
        Arc::clone(ctx),
        config.source.clone(),
        config.destination.clone(),
    ));

    let (propagate, prune) = tokio::join!(propagate, prune);

    CycleOutcome {
        propagate: joined(ctx.log(), propagate),
        prune: joined(ctx.log(), prune),
        report: ctx.take_report(),
    }
}

fn joined(
    log: &LogSender,
    result: Result<Result<(), MirrorError>, tokio::task::JoinError>,
) -> Result<(), MirrorError> {
    match result {
        Ok(inner) => inner,
        Err(e) => {
            let err = MirrorError::Task(e.to_string());
            log.error(OP_CYCLE, err.to_string());
            Err(err)
        }
    }
}

/// Mirror `config.source` into `config.destination` until stopped
///
/// Each cycle runs both walkers, then sleeps for `config.interval`. The loop
/// ends after `config.max_cycles` cycles or on Ctrl-C during the sleep.
///
/// # Returns
/// The number of completed cycles.
///
/// # Errors
/// [`MirrorError::Halted`] once the critical signal has been raised. The
/// cycle that raised it is allowed to finish first.
pub async fn run(config: &Config, log: LogSender) -> Result<u64, MirrorError> {
    let (signal, mut watch) = critical_channel();
    let ctx = Arc::new(WalkContext::new(log, signal, config.max_concurrent_files));

    info!(
        "mirroring {} -> {} every {:?}",
        config.source.display(),
        config.destination.display(),
        config.interval
    );

    let mut cycles = 0u64;
    loop {
        let outcome = run_cycle(&ctx, config).await;
        cycles += 1;

        let report = outcome.report;
        debug!(
            "cycle {}: {} copied, {} deleted, {} dirs created, {} dirs removed, {} errors",
            cycles,
            report.files_copied,
            report.files_deleted,
            report.dirs_created,
            report.dirs_removed,
            report.errors
        );

        if watch.fired() {
            watch.drain();
            info!("critical failure in cycle {}, stopping", cycles);
            return Err(MirrorError::Halted);
        }

        if config.max_cycles.is_some_and(|limit| cycles >= limit) {
            info!("cycle limit reached after {} cycle(s)", cycles);
            return Ok(cycles);
        }

        if wait_for_next_cycle(config).await {
            info!("interrupted after {} cycle(s)", cycles);
            return Ok(cycles);
        }
    }
}

/// Sleep for one interval. Returns true when Ctrl-C arrived first.
async fn wait_for_next_cycle(config: &Config) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(config.interval) => false,
        interrupted = tokio::signal::ctrl_c() => match interrupted {
            Ok(()) => true,
            Err(e) => {
                warn!("cannot listen for Ctrl-C: {}", e);
                tokio::time::sleep(config.interval).await;
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{log_channel, LogLevel, LogReceiver, LogRecord};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn drain(rx: &mut LogReceiver) -> Vec<LogRecord> {
        let mut records = Vec::new();
        while let Ok(record) = rx.try_recv() {
            records.push(record);
        }
        records
    }

    fn test_config(source: &Path, destination: &Path, max_cycles: Option<u64>) -> Config {
        Config {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            interval: Duration::ZERO,
            max_cycles,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_run_single_cycle_mirrors() {
        let temp = TempDir::new().expect("create tempdir");
        let master = temp.path().join("master");
        let slave = temp.path().join("slave");
        fs::create_dir_all(master.join("sub")).expect("create master");
        fs::create_dir(&slave).expect("create slave");
        fs::write(master.join("a.txt"), b"0123456789").expect("write a");
        fs::write(master.join("sub/b.txt"), b"01234").expect("write b");

        let (log, _rx) = log_channel();
        let cycles = run(&test_config(&master, &slave, Some(1)), log)
            .await
            .expect("run");

        assert_eq!(cycles, 1);
        assert_eq!(fs::read(slave.join("a.txt")).expect("read a"), b"0123456789");
        assert_eq!(fs::read(slave.join("sub/b.txt")).expect("read b"), b"01234");
    }

    #[tokio::test]
    async fn test_run_stops_at_cycle_limit() {
        let temp = TempDir::new().expect("create tempdir");
        let master = temp.path().join("master");
        let slave = temp.path().join("slave");
        fs::create_dir(&master).expect("create master");
        fs::create_dir(&slave).expect("create slave");

        let (log, _rx) = log_channel();
        let cycles = run(&test_config(&master, &slave, Some(3)), log)
            .await
            .expect("run");
        assert_eq!(cycles, 3);
    }

    #[tokio::test]
    async fn test_run_halts_on_missing_master() {
        let temp = TempDir::new().expect("create tempdir");
        let slave = temp.path().join("slave");
        fs::create_dir(&slave).expect("create slave");
        fs::write(slave.join("keep.txt"), b"keep").expect("write keep");

        let (log, mut rx) = log_channel();
        let result = run(&test_config(&temp.path().join("nope"), &slave, None), log).await;

        assert!(matches!(result, Err(MirrorError::Halted)));
        assert!(slave.join("keep.txt").exists(), "nothing deleted when master is gone");

        let critical: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|r| r.level == LogLevel::Critical)
            .collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].op, "check_master_folder");
    }

    #[tokio::test]
    async fn test_run_cycle_reports_both_walkers() {
        let temp = TempDir::new().expect("create tempdir");
        let master = temp.path().join("master");
        let slave = temp.path().join("slave");
        fs::create_dir(&master).expect("create master");
        fs::create_dir(&slave).expect("create slave");
        fs::write(master.join("new.txt"), b"new").expect("write new");
        fs::write(slave.join("old.txt"), b"old").expect("write old");

        let (log, _rx) = log_channel();
        let (signal, _watch) = critical_channel();
        let ctx = Arc::new(WalkContext::new(log, signal, 4));
        let config = test_config(&master, &slave, Some(1));

        let outcome = run_cycle(&ctx, &config).await;
        assert!(outcome.propagate.is_ok());
        assert!(outcome.prune.is_ok());
        assert!(!outcome.is_critical());
        assert_eq!(outcome.report.files_copied, 1);
        assert_eq!(outcome.report.files_deleted, 1);

        assert!(slave.join("new.txt").exists());
        assert!(!slave.join("old.txt").exists());
    }

    #[tokio::test]
    async fn test_run_cycle_missing_slave_is_critical() {
        let temp = TempDir::new().expect("create tempdir");
        let master = temp.path().join("master");
        fs::create_dir(&master).expect("create master");

        let (log, _rx) = log_channel();
        let (signal, mut watch) = critical_channel();
        let ctx = Arc::new(WalkContext::new(log, signal, 4));
        let config = test_config(&master, &temp.path().join("slave"), Some(1));

        let outcome = run_cycle(&ctx, &config).await;
        assert!(outcome.is_critical());
        assert!(matches!(outcome.prune, Err(MirrorError::RootUnreadable { .. })));
        assert_eq!(watch.drain(), 1);
    }
}
