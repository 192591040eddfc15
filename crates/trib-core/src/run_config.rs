//! Run configuration: an immutable snapshot of run intent

use crate::error::{CoreError, CoreResult};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Format of the run window bounds, both on the command line and in state files
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Default worker pool size
pub const DEFAULT_WORKERS: usize = 16;

/// A stage of work performed for an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Run the asset's transformation
    Main,
    /// Run the asset's column and custom checks
    Checks,
    /// Push descriptions to the destination
    PushMetadata,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Main => "main",
            TaskKind::Checks => "checks",
            TaskKind::PushMetadata => "push-metadata",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(TaskKind::Main),
            "checks" => Ok(TaskKind::Checks),
            "push-metadata" => Ok(TaskKind::PushMetadata),
            other => Err(CoreError::ConfigInvalid {
                message: format!("unknown task kind '{other}', expected main, checks or push-metadata"),
            }),
        }
    }
}

/// Package manager used to run python assets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Uv,
    Pip,
}

/// Parameters of a single `run` invocation.
///
/// Built once from command-line input and never mutated afterwards. It is
/// persisted verbatim as the `Parameters` section of the run state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunConfig {
    /// Also run every transitive dependent of the targets
    pub downstream: bool,

    #[serde(with = "date_format")]
    pub start_date: NaiveDateTime,

    #[serde(with = "date_format")]
    pub end_date: NaiveDateTime,

    /// Worker pool size
    pub workers: usize,

    #[serde(default)]
    pub environment: Option<String>,

    pub force: bool,

    pub push_metadata: bool,

    pub no_log_file: bool,

    pub full_refresh: bool,

    #[serde(default)]
    pub package_manager: PackageManager,

    /// Only run assets carrying this tag
    #[serde(default)]
    pub tag: Option<String>,

    /// Skip assets carrying this tag
    #[serde(default)]
    pub exclude_tag: Option<String>,

    /// Restrict the run to these task kinds; empty means the default set
    #[serde(default)]
    pub only: Vec<TaskKind>,

    /// Resume the latest run, skipping assets that already succeeded
    #[serde(default)]
    pub continue_run: bool,

    /// Assets named on the command line; empty means the whole pipeline
    #[serde(default)]
    pub targets: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let (start_date, end_date) = yesterday_window();
        Self {
            downstream: false,
            start_date,
            end_date,
            workers: DEFAULT_WORKERS,
            environment: None,
            force: false,
            push_metadata: false,
            no_log_file: false,
            full_refresh: false,
            package_manager: PackageManager::default(),
            tag: None,
            exclude_tag: None,
            only: Vec::new(),
            continue_run: false,
            targets: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Task kinds this run schedules
    pub fn task_kinds(&self) -> Vec<TaskKind> {
        if !self.only.is_empty() {
            let mut kinds = self.only.clone();
            kinds.sort();
            kinds.dedup();
            return kinds;
        }
        let mut kinds = vec![TaskKind::Main, TaskKind::Checks];
        if self.push_metadata {
            kinds.push(TaskKind::PushMetadata);
        }
        kinds
    }

    /// Check the configuration is internally consistent
    pub fn validate(&self) -> CoreResult<()> {
        if self.workers == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "workers must be at least 1".to_string(),
            });
        }
        if self.start_date > self.end_date {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "start date {} is after end date {}",
                    self.start_date.format(DATE_FORMAT),
                    self.end_date.format(DATE_FORMAT)
                ),
            });
        }
        Ok(())
    }
}

/// The default run window: all of yesterday, local time
pub fn yesterday_window() -> (NaiveDateTime, NaiveDateTime) {
    let today = Local::now().date_naive();
    let yesterday = today.pred_opt().unwrap_or(today);
    day_window(yesterday)
}

fn day_window(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_time(NaiveTime::MIN);
    let end = start + Duration::days(1) - Duration::microseconds(1);
    (start, end)
}

/// Parse a window start: either a full timestamp or a bare date (midnight)
pub fn parse_start_date(value: &str) -> CoreResult<NaiveDateTime> {
    parse_date(value, false)
}

/// Parse a window end: either a full timestamp or a bare date (last microsecond of the day)
pub fn parse_end_date(value: &str) -> CoreResult<NaiveDateTime> {
    parse_date(value, true)
}

fn parse_date(value: &str, end_of_day: bool) -> CoreResult<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, DATE_FORMAT) {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(day) => {
            let (start, end) = day_window(day);
            Ok(if end_of_day { end } else { start })
        }
        Err(_) => Err(CoreError::InvalidDate {
            value: value.to_string(),
            expected: DATE_FORMAT.to_string(),
        }),
    }
}

mod date_format {
    use super::DATE_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "run_config_test.rs"]
mod tests;
