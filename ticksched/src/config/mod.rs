//! Server configuration loading.
//!
//! Every field is optional; command-line flags override whatever the file
//! says.  The expected YAML structure is:
//! ```yaml
//! algorithm: EDF            # RM | EDF
//! tick_interval_ms: 500
//! host: 127.0.0.1
//! port: 8888
//! event_log_capacity: 50
//! trace_capacity: 64      # ticks kept for the Gantt chart
//! tasks:
//!   - { name: sensor, period: 4, execution_time: 1 }
//!   - { period: 5, execution_time: 2, deadline: 5 }
//! ```
//! Unnamed tasks get the first free `T<n>` name in file order, the same way
//! the server names tasks added without a name, so `{ name: T1 }` followed by
//! an unnamed entry yields `T1` and `T2`.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::scheduler::{
    Algorithm, Scheduler, SchedulerError, DEFAULT_EVENT_LOG_CAPACITY, DEFAULT_TRACE_CAPACITY,
};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

// ── YAML types ────────────────────────────────────────────────────────────────

/// One entry of the `tasks:` list.  Values are signed so that a bad file is
/// reported by the scheduler's own validation rather than as a YAML type error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    pub name: Option<String>,
    pub period: i64,
    pub execution_time: i64,
    pub deadline: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub algorithm: Algorithm,
    pub tick_interval_ms: u64,
    pub host: String,
    pub port: u16,
    pub event_log_capacity: usize,
    pub trace_capacity: usize,
    pub tasks: Vec<TaskEntry>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
            tasks: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Read and validate `path`.
    ///
    /// # Errors
    /// The file cannot be read, is not valid YAML, names an unknown
    /// algorithm, or has a zero tick interval.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading server configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults configuration.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ServerConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML")?;
        config.validate()?;

        debug!(
            algorithm = %config.algorithm,
            tick_ms   = config.tick_interval_ms,
            tasks     = config.tasks.len(),
            "configuration parsed"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be greater than 0");
        }
        if self.event_log_capacity == 0 {
            warn!("event_log_capacity 0 raised to 1");
        }
        if self.trace_capacity == 0 {
            warn!("trace_capacity 0 raised to 1");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build a scheduler holding every configured task.
    ///
    /// Unnamed entries are named by the scheduler itself, which keeps counting
    /// from there for tasks added later over the wire.
    ///
    /// # Errors
    /// The first task entry the scheduler rejects, with its position.
    pub fn build_scheduler(&self) -> Result<Scheduler> {
        let mut scheduler = Scheduler::new(self.algorithm)
            .with_event_log_capacity(self.event_log_capacity)
            .with_trace_capacity(self.trace_capacity);

        for (i, entry) in self.tasks.iter().enumerate() {
            let added = (|| -> std::result::Result<_, SchedulerError> {
                let period = SchedulerError::positive_ticks("period", entry.period)?;
                let exec = SchedulerError::positive_ticks("execution_time", entry.execution_time)?;
                let deadline = entry
                    .deadline
                    .map(|d| SchedulerError::positive_ticks("deadline", d))
                    .transpose()?;
                match &entry.name {
                    Some(name) => scheduler.add_task(name.clone(), period, exec, deadline),
                    None => scheduler.add_unnamed_task(period, exec, deadline),
                }
            })();
            let label = entry.name.as_deref().unwrap_or("unnamed");
            added.with_context(|| format!("tasks[{i}] ({label}) rejected"))?;
        }

        if !self.tasks.is_empty() {
            info!(tasks = self.tasks.len(), "initial task set loaded");
        }
        Ok(scheduler)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn full_file_loads() {
        let yaml = r#"
algorithm: EDF
tick_interval_ms: 500
host: 0.0.0.0
port: 9000
event_log_capacity: 10
trace_capacity: 32
tasks:
  - { name: sensor, period: 4, execution_time: 1 }
  - { period: 5, execution_time: 2, deadline: 5 }
"#;
        let f = yaml_tempfile(yaml);
        let cfg = ServerConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.algorithm, Algorithm::EarliestDeadlineFirst);
        assert_eq!(cfg.tick_interval(), Duration::from_millis(500));
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.event_log_capacity, 10);
        assert_eq!(cfg.trace_capacity, 32);
        assert_eq!(cfg.tasks.len(), 2);
        assert_eq!(cfg.tasks[1].deadline, Some(5));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = ServerConfig::from_yaml_str("port: 7000\n").unwrap();
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.algorithm, Algorithm::RateMonotonic);
        assert_eq!(cfg.host, DEFAULT_HOST);
        assert_eq!(cfg.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
        assert!(cfg.tasks.is_empty());

        assert_eq!(ServerConfig::from_yaml_str("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = ServerConfig::from_yaml_str("algorithm: FIFO\n").unwrap_err();
        assert!(format!("{err:#}").contains("FIFO"));
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        assert!(ServerConfig::from_yaml_str("tick_interval_ms: 0\n").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ServerConfig::from_yaml_str("tick_rate: 5\n").is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = ServerConfig::load_from_file(Path::new("/nonexistent/path/ticksched.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn build_scheduler_names_unnamed_tasks_in_order() {
        let yaml = r#"
tasks:
  - { period: 4, execution_time: 1 }
  - { name: cam, period: 10, execution_time: 2 }
  - { period: 5, execution_time: 2 }
"#;
        let cfg = ServerConfig::from_yaml_str(yaml).unwrap();
        let s = cfg.build_scheduler().unwrap();
        let names: Vec<_> = s.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["T1", "cam", "T2"]);
    }

    #[test]
    fn unnamed_entry_skips_a_name_used_earlier_in_the_file() {
        let yaml = r#"
tasks:
  - { name: T1, period: 7, execution_time: 3 }
  - { period: 10, execution_time: 1 }
"#;
        let cfg = ServerConfig::from_yaml_str(yaml).unwrap();
        let s = cfg.build_scheduler().unwrap();
        let tasks: Vec<_> = s.tasks().iter().map(|t| (t.name.as_str(), t.period)).collect();
        assert_eq!(tasks, [("T1", 7), ("T2", 10)]);
    }

    #[test]
    fn trace_capacity_reaches_the_scheduler() {
        let s = ServerConfig::from_yaml_str("trace_capacity: 16\n")
            .unwrap()
            .build_scheduler()
            .unwrap();
        assert_eq!(s.trace_capacity(), 16);

        let s = ServerConfig::default().build_scheduler().unwrap();
        assert_eq!(s.trace_capacity(), DEFAULT_TRACE_CAPACITY);
    }

    #[test]
    fn bad_task_entry_names_its_position() {
        let yaml = "tasks:\n  - { period: 4, execution_time: 0 }\n";
        let cfg = ServerConfig::from_yaml_str(yaml).unwrap();
        let err = cfg.build_scheduler().unwrap_err();
        assert!(format!("{err:#}").contains("tasks[0]"));
    }
}
