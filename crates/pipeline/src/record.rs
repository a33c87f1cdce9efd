use serde::{Deserialize, Serialize};
use std::fmt;

/// Name fragments of log groups fed by managed Insights integrations.
const INSIGHTS_MARKERS: [&str; 2] = ["lambda-insights", "containerinsights"];

/// Storage class a log group is currently billed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    Standard,
    InfrequentAccess,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProtectionStatus {
    Activated,
    Inactive,
}

/// Metadata for one listed log group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroupRecord {
    /// Fully-qualified identifier
    pub arn: String,

    /// Display name
    pub name: String,

    pub storage_class: StorageClass,

    pub metric_filter_count: u32,

    pub data_protection: DataProtectionStatus,
}

impl LogGroupRecord {
    /// Record of an unused Standard-class group.
    pub fn standard(arn: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            name: name.into(),
            storage_class: StorageClass::Standard,
            metric_filter_count: 0,
            data_protection: DataProtectionStatus::Inactive,
        }
    }
}

/// Why a listed log group cannot move to Infrequent Access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disqualification {
    MetricFilters,
    DataProtection,
    AlreadyInfrequentAccess,
    InsightsIntegration,
}

impl fmt::Display for Disqualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MetricFilters => "has metric filters",
            Self::DataProtection => "has an active data protection policy",
            Self::AlreadyInfrequentAccess => "is already Infrequent Access",
            Self::InsightsIntegration => "belongs to an Insights integration",
        };
        f.write_str(text)
    }
}

/// Every predicate that fires for `record`.
pub fn disqualifying_reasons(record: &LogGroupRecord) -> Vec<Disqualification> {
    let checks: [(Disqualification, fn(&LogGroupRecord) -> bool); 4] = [
        (Disqualification::MetricFilters, has_metric_filters),
        (Disqualification::DataProtection, has_data_protection),
        (
            Disqualification::AlreadyInfrequentAccess,
            is_infrequent_access,
        ),
        (Disqualification::InsightsIntegration, has_insights),
    ];

    checks
        .into_iter()
        .filter(|(_, check)| check(record))
        .map(|(reason, _)| reason)
        .collect()
}

pub fn is_disqualified(record: &LogGroupRecord) -> bool {
    !disqualifying_reasons(record).is_empty()
}

fn has_metric_filters(record: &LogGroupRecord) -> bool {
    record.metric_filter_count > 0
}

fn has_data_protection(record: &LogGroupRecord) -> bool {
    record.data_protection == DataProtectionStatus::Activated
}

fn is_infrequent_access(record: &LogGroupRecord) -> bool {
    record.storage_class == StorageClass::InfrequentAccess
}

fn has_insights(record: &LogGroupRecord) -> bool {
    INSIGHTS_MARKERS
        .iter()
        .any(|marker| record.name.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(name: &str) -> LogGroupRecord {
        LogGroupRecord::standard(
            format!("arn:aws:logs:us-east-1:123456789012:log-group:{name}"),
            name,
        )
    }

    #[test]
    fn plain_standard_group_is_eligible() {
        let group = record("/app/orders");
        assert!(disqualifying_reasons(&group).is_empty());
        assert!(!is_disqualified(&group));
    }

    #[test]
    fn each_predicate_disqualifies_on_its_own() {
        let cases = [
            (
                LogGroupRecord {
                    metric_filter_count: 2,
                    ..record("a")
                },
                Disqualification::MetricFilters,
            ),
            (
                LogGroupRecord {
                    data_protection: DataProtectionStatus::Activated,
                    ..record("b")
                },
                Disqualification::DataProtection,
            ),
            (
                LogGroupRecord {
                    storage_class: StorageClass::InfrequentAccess,
                    ..record("c")
                },
                Disqualification::AlreadyInfrequentAccess,
            ),
            (
                record("/aws/lambda-insights"),
                Disqualification::InsightsIntegration,
            ),
            (
                record("/aws/ecs/containerinsights/prod/performance"),
                Disqualification::InsightsIntegration,
            ),
        ];

        for (group, expected) in cases {
            assert_eq!(disqualifying_reasons(&group), vec![expected], "{group:?}");
            assert!(is_disqualified(&group));
        }
    }

    #[test]
    fn reports_every_firing_predicate() {
        let group = LogGroupRecord {
            metric_filter_count: 1,
            storage_class: StorageClass::InfrequentAccess,
            ..record("/aws/lambda-insights")
        };
        assert_eq!(
            disqualifying_reasons(&group),
            vec![
                Disqualification::MetricFilters,
                Disqualification::AlreadyInfrequentAccess,
                Disqualification::InsightsIntegration,
            ]
        );
    }

    #[test]
    fn insights_match_is_case_sensitive() {
        assert!(!is_disqualified(&record("/aws/ContainerInsights/prod")));
        assert!(!is_disqualified(&record("/aws/Lambda-Insights")));
    }

    #[test]
    fn unknown_storage_class_is_not_disqualifying() {
        let group = LogGroupRecord {
            storage_class: StorageClass::Other("DELIVERY".to_string()),
            ..record("d")
        };
        assert!(!is_disqualified(&group));
    }
}
