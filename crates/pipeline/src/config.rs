use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Upper bound accepted by the field index lookup for one request.
pub const MAX_EXISTENCE_BATCH_SIZE: usize = 100;

const MAX_CONCURRENCY: usize = 32;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Paginated listing plus attribute predicates
    Enumerate,
    /// Batched field index policy lookup
    FieldIndexes,
    /// Per-group subscription filter lookup
    SubscriptionFilters,
    /// Collection-wide anomaly detector scan
    AnomalyDetectors,
    /// `StartLiveTail` event history
    LiveTail,
    /// `CreateExportTask` event history
    ExportTasks,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Enumerate,
        Stage::FieldIndexes,
        Stage::SubscriptionFilters,
        Stage::AnomalyDetectors,
        Stage::LiveTail,
        Stage::ExportTasks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Enumerate => "enumerate",
            Stage::FieldIndexes => "field_indexes",
            Stage::SubscriptionFilters => "subscription_filters",
            Stage::AnomalyDetectors => "anomaly_detectors",
            Stage::LiveTail => "live_tail",
            Stage::ExportTasks => "export_tasks",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pipeline does when a stage returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log, keep the stage input (or its partial result) and continue
    FailOpen,
    /// Stop the run and return the error
    Abort,
}

/// Per-stage overrides of [`PipelineConfig::error_policy`]. Stages missing
/// from a config file keep their built-in override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagePolicies {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enumerate: Option<ErrorPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_indexes: Option<ErrorPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_filters: Option<ErrorPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_detectors: Option<ErrorPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_tail: Option<ErrorPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_tasks: Option<ErrorPolicy>,
}

impl Default for StagePolicies {
    fn default() -> Self {
        Self {
            enumerate: None,
            field_indexes: None,
            subscription_filters: None,
            anomaly_detectors: Some(ErrorPolicy::Abort),
            live_tail: None,
            export_tasks: None,
        }
    }
}

impl StagePolicies {
    pub fn get(&self, stage: Stage) -> Option<ErrorPolicy> {
        match stage {
            Stage::Enumerate => self.enumerate,
            Stage::FieldIndexes => self.field_indexes,
            Stage::SubscriptionFilters => self.subscription_filters,
            Stage::AnomalyDetectors => self.anomaly_detectors,
            Stage::LiveTail => self.live_tail,
            Stage::ExportTasks => self.export_tasks,
        }
    }
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Length of the event history window, in days
    pub lookback_days: u32,

    /// Log groups per field index lookup
    pub existence_batch_size: usize,

    /// Subscription filter queries in flight at once
    pub concurrency: usize,

    /// Sustained subscription filter query rate
    pub requests_per_second: f64,

    /// Queries the rate limiter lets through back to back
    pub burst: u32,

    /// Default reaction to a stage error
    pub error_policy: ErrorPolicy,

    /// Per-stage overrides of `error_policy`
    pub stage_policies: StagePolicies,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            existence_batch_size: MAX_EXISTENCE_BATCH_SIZE,
            concurrency: 2,
            requests_per_second: 5.0,
            burst: 1,
            error_policy: ErrorPolicy::FailOpen,
            stage_policies: StagePolicies::default(),
        }
    }
}

impl PipelineConfig {
    /// Read a TOML file; missing keys fall back to defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            PipelineError::invalid_config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, PipelineError> {
        let config: Self =
            toml::from_str(raw).map_err(|err| PipelineError::invalid_config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn policy_for(&self, stage: Stage) -> ErrorPolicy {
        self.stage_policies.get(stage).unwrap_or(self.error_policy)
    }

    pub fn lookback(&self) -> Duration {
        Duration::from_secs(u64::from(self.lookback_days) * 24 * 60 * 60)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.lookback_days == 0 {
            return Err(PipelineError::invalid_config("lookback_days must be > 0"));
        }

        if self.existence_batch_size == 0 || self.existence_batch_size > MAX_EXISTENCE_BATCH_SIZE
        {
            return Err(PipelineError::invalid_config(format!(
                "existence_batch_size ({}) must be between 1 and {MAX_EXISTENCE_BATCH_SIZE}",
                self.existence_batch_size
            )));
        }

        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(PipelineError::invalid_config(format!(
                "concurrency ({}) must be between 1 and {MAX_CONCURRENCY}",
                self.concurrency
            )));
        }

        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(PipelineError::invalid_config(format!(
                "requests_per_second ({}) must be a positive number",
                self.requests_per_second
            )));
        }

        if self.burst == 0 {
            return Err(PipelineError::invalid_config("burst must be > 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_observed_behaviour() {
        let config = PipelineConfig::default();
        config.validate().expect("defaults are valid");

        assert_eq!(config.lookback(), Duration::from_secs(30 * 86_400));
        assert_eq!(config.policy_for(Stage::FieldIndexes), ErrorPolicy::FailOpen);
        assert_eq!(config.policy_for(Stage::LiveTail), ErrorPolicy::FailOpen);
        assert_eq!(config.policy_for(Stage::AnomalyDetectors), ErrorPolicy::Abort);
    }

    #[test]
    fn toml_overrides_merge_with_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
concurrency = 3
error_policy = "abort"

[stage_policies]
live_tail = "fail_open"
"#,
        )
        .expect("parse");

        assert_eq!(config.concurrency, 3);
        assert_eq!(config.existence_batch_size, MAX_EXISTENCE_BATCH_SIZE);
        assert_eq!(config.policy_for(Stage::Enumerate), ErrorPolicy::Abort);
        assert_eq!(config.policy_for(Stage::LiveTail), ErrorPolicy::FailOpen);
        assert_eq!(config.policy_for(Stage::AnomalyDetectors), ErrorPolicy::Abort);
    }

    #[test]
    fn partial_stage_table_keeps_anomaly_abort() {
        let config = PipelineConfig::from_toml_str(
            r#"
[stage_policies]
live_tail = "abort"
"#,
        )
        .expect("parse");

        assert_eq!(config.error_policy, ErrorPolicy::FailOpen);
        assert_eq!(config.policy_for(Stage::LiveTail), ErrorPolicy::Abort);
        assert_eq!(config.policy_for(Stage::AnomalyDetectors), ErrorPolicy::Abort);
        assert_eq!(config.policy_for(Stage::FieldIndexes), ErrorPolicy::FailOpen);
    }

    #[test]
    fn anomaly_stage_can_be_made_fail_open() {
        let config = PipelineConfig::from_toml_str(
            r#"
[stage_policies]
anomaly_detectors = "fail_open"
"#,
        )
        .expect("parse");
        assert_eq!(config.policy_for(Stage::AnomalyDetectors), ErrorPolicy::FailOpen);
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let invalid = [
            PipelineConfig {
                lookback_days: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                existence_batch_size: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                existence_batch_size: 101,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                concurrency: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                requests_per_second: 0.0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                requests_per_second: f64::NAN,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                burst: 0,
                ..PipelineConfig::default()
            },
        ];
        for config in invalid {
            assert!(config.validate().is_err(), "accepted: {config:?}");
        }
    }

    #[test]
    fn unknown_policy_is_a_config_error() {
        let err = PipelineConfig::from_toml_str(r#"error_policy = "retry""#)
            .expect_err("unknown variant");
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn reads_config_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logtier.toml");
        std::fs::write(&path, "lookback_days = 7\nburst = 4\n").expect("write");

        let config = PipelineConfig::from_toml_file(&path).expect("load");
        assert_eq!(config.lookback_days, 7);
        assert_eq!(config.burst, 4);
    }
}
