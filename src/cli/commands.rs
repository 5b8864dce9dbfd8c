//! CLI command implementations
//!
//! Each command loads the configuration, opens the process-wide session
//! with the configured engine, does its work and closes the session before
//! printing its JSON result.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::engine::EngineKind;
use crate::observability::{log_event_with_fields, Event, Logger, MetricsSnapshot, Severity};
use crate::session::{ConfigSource, Session};
use crate::workload::{WorkloadConfig, WorkloadReport, WorkloadRunner};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_json;

/// Benchmark configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Data directory (required)
    pub data_dir: String,

    /// Engine options file (optional). Without one, baseline options are
    /// used and namespaces come from the directory's name manifest.
    #[serde(default)]
    pub options_file: Option<String>,

    /// Engine implementation (optional, default "log")
    #[serde(default)]
    pub engine: EngineKind,

    /// Minimum log severity (optional). Overrides `CFBENCH_LOG` when set.
    #[serde(default)]
    pub log_level: Option<Severity>,

    #[serde(default)]
    pub workload: WorkloadConfig,
}

impl BenchConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse and validate configuration contents
    pub fn parse(content: &str) -> CliResult<Self> {
        let config: BenchConfig = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }
        if matches!(&self.options_file, Some(path) if path.trim().is_empty()) {
            return Err(CliError::config_error("options_file must not be empty when set"));
        }
        self.workload.validate()?;
        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    pub fn config_source(&self) -> ConfigSource {
        ConfigSource::from_options_file(self.options_file.as_ref().map(PathBuf::from))
    }
}

/// Output of `inspect`
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub engine: String,
    pub data_dir: String,
    pub options_file: Option<String>,
    pub namespaces: Vec<String>,
    pub metrics: MetricsSnapshot,
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Load { config } => write_json(&load(&config)?),
        Command::Run { config } => write_json(&run_workload(&config)?),
        Command::Inspect { config } => write_json(&inspect(&config)?),
    }
}

fn prepare(config_path: &Path) -> CliResult<(BenchConfig, Arc<Session>)> {
    let config = BenchConfig::load(config_path)?;
    if let Some(level) = config.log_level {
        Logger::set_min_severity(level);
    }

    let path = config_path.display().to_string();
    log_event_with_fields(
        Severity::Info,
        Event::ConfigLoaded,
        &[
            ("path", &path),
            ("data_dir", &config.data_dir),
            ("engine", config.engine.driver().name()),
        ],
    );

    let session = Session::init_global(config.engine.driver());
    Ok((config, session))
}

/// Insert the workload's records
pub fn load(config_path: &Path) -> CliResult<WorkloadReport> {
    let (config, session) = prepare(config_path)?;
    let runner = WorkloadRunner::new(
        session,
        config.data_path(),
        config.config_source(),
        config.workload.clone(),
    )?;
    Ok(runner.load()?)
}

/// Run the workload's operation mix
pub fn run_workload(config_path: &Path) -> CliResult<WorkloadReport> {
    let (config, session) = prepare(config_path)?;
    let runner = WorkloadRunner::new(
        session,
        config.data_path(),
        config.config_source(),
        config.workload.clone(),
    )?;
    Ok(runner.run()?)
}

/// Open the data directory, list its namespaces and the session counters
pub fn inspect(config_path: &Path) -> CliResult<InspectReport> {
    let (config, session) = prepare(config_path)?;
    let client = Client::connect(
        Arc::clone(&session),
        config.data_path(),
        config.config_source(),
    )?;

    let namespaces = session.active()?.namespace_names()?;
    let report = InspectReport {
        engine: session.driver_name().to_string(),
        data_dir: config.data_dir.clone(),
        options_file: config.options_file.clone(),
        namespaces,
        metrics: session.metrics().snapshot(),
    };

    client.close()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = BenchConfig::parse(r#"{"data_dir": "/tmp/bench"}"#).unwrap();
        assert_eq!(config.engine, EngineKind::Log);
        assert!(config.options_file.is_none());
        assert!(config.log_level.is_none());
        assert_eq!(config.workload, WorkloadConfig::default());
        assert_eq!(config.config_source(), ConfigSource::Defaults);
    }

    #[test]
    fn test_missing_data_dir_is_config_error() {
        let err = BenchConfig::parse(r#"{"engine": "memory"}"#).unwrap_err();
        assert_eq!(err.code_str(), "CFB_CLI_CONFIG_ERROR");
        assert!(err.message().contains("data_dir"));
    }

    #[test]
    fn test_empty_data_dir_rejected() {
        assert!(BenchConfig::parse(r#"{"data_dir": "  "}"#).is_err());
    }

    #[test]
    fn test_full_config() {
        let config = BenchConfig::parse(
            r#"{
                "data_dir": "/tmp/bench",
                "options_file": "/etc/cfbench/options.json",
                "engine": "hash",
                "log_level": "WARN",
                "workload": {"threads": 8, "read_proportion": 0.5, "update_proportion": 0.5}
            }"#,
        )
        .unwrap();
        assert_eq!(config.engine, EngineKind::Hash);
        assert_eq!(config.log_level, Some(Severity::Warn));
        assert_eq!(config.workload.threads, 8);
        assert_eq!(
            config.config_source(),
            ConfigSource::OptionsFile(PathBuf::from("/etc/cfbench/options.json"))
        );
    }

    #[test]
    fn test_invalid_workload_rejected() {
        let err = BenchConfig::parse(r#"{"data_dir": "/tmp/b", "workload": {"threads": 0}}"#)
            .unwrap_err();
        assert!(err.message().contains("threads"));
    }
}
