use crate::query_error;
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::types::{
    AnomalyDetector as SdkAnomalyDetector, DataProtectionStatus as SdkDataProtectionStatus,
    LogGroup, LogGroupClass,
};
use aws_sdk_cloudwatchlogs::Client;
use logtier_pipeline::{
    AnomalyDetector, AnomalyDetectorSource, DataProtectionStatus, FieldIndexLookup, LogGroupId,
    LogGroupLister, LogGroupRecord, Page, QueryResult, StorageClass, SubscriptionFilterLookup,
};

/// CloudWatch Logs client serving listing, field index, subscription filter
/// and anomaly detector queries.
#[derive(Debug, Clone)]
pub struct CloudWatchLogs {
    client: Client,
}

impl CloudWatchLogs {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogGroupLister for CloudWatchLogs {
    async fn list_log_groups(
        &self,
        next_token: Option<String>,
    ) -> QueryResult<Page<LogGroupRecord>> {
        let output = self
            .client
            .describe_log_groups()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| query_error("DescribeLogGroups", err))?;

        let records = output.log_groups().iter().map(record_from_sdk).collect();
        Ok(Page::new(records, output.next_token().map(str::to_string)))
    }
}

#[async_trait]
impl FieldIndexLookup for CloudWatchLogs {
    async fn describe_field_indexes(
        &self,
        ids: &[LogGroupId],
        next_token: Option<String>,
    ) -> QueryResult<Page<String>> {
        let identifiers = ids.iter().map(|id| id.as_str().to_string()).collect();
        let output = self
            .client
            .describe_field_indexes()
            .set_log_group_identifiers(Some(identifiers))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| query_error("DescribeFieldIndexes", err))?;

        let indexed = output
            .field_indexes()
            .iter()
            .filter_map(|index| index.log_group_identifier())
            .map(str::to_string)
            .collect();
        Ok(Page::new(indexed, output.next_token().map(str::to_string)))
    }
}

#[async_trait]
impl SubscriptionFilterLookup for CloudWatchLogs {
    async fn count_subscription_filters(&self, id: &LogGroupId) -> QueryResult<usize> {
        let output = self
            .client
            .describe_subscription_filters()
            .log_group_name(id.as_str())
            .send()
            .await
            .map_err(|err| query_error("DescribeSubscriptionFilters", err))?;
        Ok(output.subscription_filters().len())
    }
}

#[async_trait]
impl AnomalyDetectorSource for CloudWatchLogs {
    async fn list_anomaly_detectors(
        &self,
        next_token: Option<String>,
    ) -> QueryResult<Page<AnomalyDetector>> {
        let output = self
            .client
            .list_log_anomaly_detectors()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| query_error("ListLogAnomalyDetectors", err))?;

        let detectors = output
            .anomaly_detectors()
            .iter()
            .map(detector_from_sdk)
            .collect();
        Ok(Page::new(detectors, output.next_token().map(str::to_string)))
    }
}

fn record_from_sdk(group: &LogGroup) -> LogGroupRecord {
    let storage_class = match group.log_group_class() {
        // Groups created before log classes existed report no class.
        None | Some(LogGroupClass::Standard) => StorageClass::Standard,
        Some(LogGroupClass::InfrequentAccess) => StorageClass::InfrequentAccess,
        Some(other) => StorageClass::Other(other.as_str().to_string()),
    };
    let data_protection = match group.data_protection_status() {
        Some(SdkDataProtectionStatus::Activated) => DataProtectionStatus::Activated,
        _ => DataProtectionStatus::Inactive,
    };

    LogGroupRecord {
        arn: group.log_group_arn().unwrap_or_default().to_string(),
        name: group.log_group_name().unwrap_or_default().to_string(),
        storage_class,
        metric_filter_count: group
            .metric_filter_count()
            .and_then(|count| u32::try_from(count).ok())
            .unwrap_or(0),
        data_protection,
    }
}

fn detector_from_sdk(detector: &SdkAnomalyDetector) -> AnomalyDetector {
    AnomalyDetector {
        arn: detector.anomaly_detector_arn().map(str::to_string),
        watched: detector.log_group_arn_list().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ARN: &str = "arn:aws:logs:us-east-1:123456789012:log-group:/app/orders";

    #[test]
    fn maps_listed_group_attributes() {
        let group = LogGroup::builder()
            .log_group_name("/app/orders")
            .log_group_arn(ARN)
            .metric_filter_count(2)
            .data_protection_status(SdkDataProtectionStatus::Activated)
            .log_group_class(LogGroupClass::InfrequentAccess)
            .build();

        assert_eq!(
            record_from_sdk(&group),
            LogGroupRecord {
                arn: ARN.to_string(),
                name: "/app/orders".to_string(),
                storage_class: StorageClass::InfrequentAccess,
                metric_filter_count: 2,
                data_protection: DataProtectionStatus::Activated,
            }
        );
    }

    #[test]
    fn missing_attributes_default_to_an_unused_standard_group() {
        let group = LogGroup::builder().log_group_arn(ARN).build();
        let record = record_from_sdk(&group);

        assert_eq!(record.storage_class, StorageClass::Standard);
        assert_eq!(record.metric_filter_count, 0);
        assert_eq!(record.data_protection, DataProtectionStatus::Inactive);
        assert_eq!(record.name, "");
    }

    #[test]
    fn disabled_data_protection_is_inactive() {
        let group = LogGroup::builder()
            .log_group_arn(ARN)
            .data_protection_status(SdkDataProtectionStatus::Disabled)
            .build();
        assert_eq!(
            record_from_sdk(&group).data_protection,
            DataProtectionStatus::Inactive
        );
    }

    #[test]
    fn maps_detector_watch_list() {
        let detector = SdkAnomalyDetector::builder()
            .anomaly_detector_arn("arn:aws:logs:us-east-1:123456789012:anomaly-detector:abc")
            .log_group_arn_list(ARN)
            .build();

        let mapped = detector_from_sdk(&detector);
        assert_eq!(mapped.watched, vec![ARN.to_string()]);
        assert!(mapped.arn.is_some());
    }
}
