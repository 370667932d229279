//! Configuration management
//!
//! The configuration file is plain `key=value` text. [`ConfigFile`] keeps the
//! raw pairs; [`Config`] is the typed view the driver runs on.

mod cli;

pub use cli::Cli;

use crate::logging::LogLevel;
use crate::types::MirrorError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "configs/config.txt";
pub const DEFAULT_LOG_PATH: &str = "logs/log.txt";
pub const DEFAULT_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_MAX_CONCURRENT_FILES: usize = 64;

pub const KEY_SOURCE: &str = "sourcepath";
pub const KEY_DESTINATION: &str = "synchpath";
pub const KEY_LOG_LEVEL: &str = "loglevel";
pub const KEY_INTERVAL: &str = "interval";
pub const KEY_MAX_FILES: &str = "maxfiles";

/// Raw `key=value` pairs read from the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    values: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Parse configuration text.
    ///
    /// Every line containing `=` is split on the first `=`; key and value are
    /// trimmed. Lines without `=` are ignored and later keys win.
    pub fn parse(text: &str) -> Self {
        let values = text
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();

        Self { values }
    }

    /// Read and parse the file at `path`
    pub fn load(path: &Path) -> Result<Self, MirrorError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Configured log threshold; a missing or unknown value is an error the
    /// caller reports before falling back to the default.
    pub fn log_level(&self) -> Result<LogLevel, MirrorError> {
        self.get(KEY_LOG_LEVEL).unwrap_or_default().parse()
    }

    fn parse_number<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, MirrorError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| {
                MirrorError::Config(format!("{} must be a non-negative integer, got {:?}", key, raw))
            }),
        }
    }

    fn required_path(&self, key: &str) -> Result<PathBuf, MirrorError> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
            Some(_) => Err(MirrorError::Config(format!("{} is empty", key))),
            None => Err(MirrorError::Config(format!("{} is not set", key))),
        }
    }
}

/// Typed configuration for a mirroring run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Master root
    pub source: PathBuf,

    /// Slave root
    pub destination: PathBuf,

    /// Threshold for persisted log records
    pub log_level: LogLevel,

    /// Log file location
    pub log_path: PathBuf,

    /// Where this configuration was read from
    pub config_path: PathBuf,

    /// Sleep between cycles
    pub interval: Duration,

    /// Cap on concurrently running file tasks
    pub max_concurrent_files: usize,

    /// Stop after this many cycles (None = run until halted)
    pub max_cycles: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            log_level: LogLevel::default(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            max_concurrent_files: DEFAULT_MAX_CONCURRENT_FILES,
            max_cycles: None,
        }
    }
}

impl Config {
    /// Build a configuration from parsed file contents
    pub fn from_file(file: &ConfigFile) -> Result<Self, MirrorError> {
        let defaults = Self::default();

        let interval = file
            .parse_number::<u64>(KEY_INTERVAL)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.interval);

        let max_concurrent_files = file
            .parse_number::<usize>(KEY_MAX_FILES)?
            .unwrap_or(defaults.max_concurrent_files)
            .max(1);

        Ok(Self {
            source: file.required_path(KEY_SOURCE)?,
            destination: file.required_path(KEY_DESTINATION)?,
            log_level: file.log_level().unwrap_or_default(),
            interval,
            max_concurrent_files,
            ..defaults
        })
    }

    /// Apply command-line overrides
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        self.config_path = cli.config.clone();
        self.log_path = cli.log_file.clone();
        if let Some(secs) = cli.interval {
            self.interval = Duration::from_secs(secs);
        }
        if cli.once {
            self.max_cycles = Some(1);
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), MirrorError> {
        if self.source.as_os_str().is_empty() || self.destination.as_os_str().is_empty() {
            return Err(MirrorError::Config(
                "Source and destination must both be set".to_string(),
            ));
        }

        if self.source == self.destination {
            return Err(MirrorError::Config(
                "Source and destination cannot be the same".to_string(),
            ));
        }

        // Mirroring into a subtree of the master would copy the mirror into itself.
        if self.destination.starts_with(&self.source) {
            return Err(MirrorError::Config(format!(
                "Destination {:?} is inside source {:?}",
                self.destination, self.source
            )));
        }

        // Prune would find the master under the slave root and delete it.
        if self.source.starts_with(&self.destination) {
            return Err(MirrorError::Config(format!(
                "Source {:?} is inside destination {:?}",
                self.source, self.destination
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_pairs() {
        let file = ConfigFile::parse(
            "sourcepath=c:/temp/master\nsynchpath=c:/temp/slave\nloglevel=INFO\n",
        );
        assert_eq!(file.len(), 3);
        assert_eq!(file.get("sourcepath"), Some("c:/temp/master"));
        assert_eq!(file.get("synchpath"), Some("c:/temp/slave"));
        assert_eq!(file.get("loglevel"), Some("INFO"));
    }

    #[test]
    fn test_parse_values_with_spaces() {
        let file = ConfigFile::parse(
            "sourcepath =   c:/temp/master  \nsynchpath=\tc:/temp/slave\nloglevel= INFO \n",
        );
        assert_eq!(file.get("sourcepath"), Some("c:/temp/master"));
        assert_eq!(file.get("synchpath"), Some("c:/temp/slave"));
        assert_eq!(file.get("loglevel"), Some("INFO"));
    }

    #[test]
    fn test_parse_splits_on_first_equals_and_skips_plain_lines() {
        let file = ConfigFile::parse("# mirror settings\nsourcepath=/data/a=b\n\njunk line\n");
        assert_eq!(file.len(), 1);
        assert_eq!(file.get("sourcepath"), Some("/data/a=b"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let temp = TempDir::new().expect("create tempdir");
        let result = ConfigFile::load(&temp.path().join("config.txt"));
        assert!(matches!(result, Err(MirrorError::Io(_))));
    }

    #[test]
    fn test_load_empty_path_fails() {
        assert!(ConfigFile::load(Path::new("")).is_err());
    }

    #[test]
    fn test_from_file_defaults() {
        let file = ConfigFile::parse("sourcepath=/m\nsynchpath=/s\n");
        let config = Config::from_file(&file).expect("build config");

        assert_eq!(config.source, PathBuf::from("/m"));
        assert_eq!(config.destination, PathBuf::from("/s"));
        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(config.interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
        assert_eq!(config.max_concurrent_files, DEFAULT_MAX_CONCURRENT_FILES);
        assert_eq!(config.max_cycles, None);
        assert!(file.log_level().is_err());
    }

    #[test]
    fn test_from_file_optional_keys() {
        let file =
            ConfigFile::parse("sourcepath=/m\nsynchpath=/s\nloglevel=critical\ninterval=10\nmaxfiles=0\n");
        let config = Config::from_file(&file).expect("build config");

        assert_eq!(config.log_level, LogLevel::Critical);
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.max_concurrent_files, 1);
    }

    #[test]
    fn test_from_file_bad_level_falls_back_to_error() {
        let file = ConfigFile::parse("sourcepath=/m\nsynchpath=/s\nloglevel=SOMETHING\n");
        let config = Config::from_file(&file).expect("build config");
        assert_eq!(config.log_level, LogLevel::Error);
        assert!(matches!(
            file.log_level(),
            Err(MirrorError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_from_file_missing_roots() {
        let missing = Config::from_file(&ConfigFile::parse("synchpath=/s\n")).unwrap_err();
        assert!(missing.to_string().contains("sourcepath is not set"));

        let empty = Config::from_file(&ConfigFile::parse("sourcepath=/m\nsynchpath=  \n")).unwrap_err();
        assert!(empty.to_string().contains("synchpath is empty"));
    }

    #[test]
    fn test_from_file_bad_interval() {
        let file = ConfigFile::parse("sourcepath=/m\nsynchpath=/s\ninterval=soon\n");
        let err = Config::from_file(&file).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn test_validate() {
        let ok = Config {
            source: PathBuf::from("/data/master"),
            destination: PathBuf::from("/data/slave"),
            ..Config::default()
        };
        assert!(ok.validate().is_ok());

        let same = Config {
            destination: PathBuf::from("/data/master"),
            ..ok.clone()
        };
        assert!(same.validate().is_err());

        let nested = Config {
            destination: PathBuf::from("/data/master/mirror"),
            ..ok.clone()
        };
        assert!(nested.validate().is_err());

        let master_in_slave = Config {
            source: PathBuf::from("/data/slave/master"),
            ..ok.clone()
        };
        let err = master_in_slave.validate().unwrap_err();
        assert!(err.to_string().contains("inside destination"));

        let siblings_with_shared_prefix = Config {
            source: PathBuf::from("/data/slave-master"),
            ..ok.clone()
        };
        assert!(siblings_with_shared_prefix.validate().is_ok());

        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn test_with_cli_overrides() {
        use clap::Parser;

        let cli = Cli::parse_from([
            "dirmirror",
            "--config",
            "/etc/mirror.txt",
            "--log-file",
            "/var/log/mirror.txt",
            "--interval",
            "0",
            "--once",
        ]);
        let config = Config::from_file(&ConfigFile::parse("sourcepath=/m\nsynchpath=/s\n"))
            .expect("build config")
            .with_cli(&cli);

        assert_eq!(config.config_path, PathBuf::from("/etc/mirror.txt"));
        assert_eq!(config.log_path, PathBuf::from("/var/log/mirror.txt"));
        assert_eq!(config.interval, Duration::ZERO);
        assert_eq!(config.max_cycles, Some(1));
    }
}
