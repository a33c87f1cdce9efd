//! # logtier AWS backend
//!
//! Implements the pipeline's query capabilities on top of the CloudWatch Logs
//! and CloudTrail SDK clients.
//!
//! ```text
//! CloudWatch Logs ──> DescribeLogGroups, DescribeFieldIndexes,
//!                     DescribeSubscriptionFilters, ListLogAnomalyDetectors
//! CloudTrail      ──> LookupEvents
//! ```

mod logs;
mod trail;

pub use logs::CloudWatchLogs;
pub use trail::CloudTrail;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use logtier_pipeline::{Backend, QueryError};
use std::sync::Arc;

/// Build a backend from the default credential chain for `region`.
pub async fn backend_for_region(region: &str) -> Backend {
    log::debug!("Loading AWS configuration for region {region}");
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await;

    let logs = Arc::new(CloudWatchLogs::new(aws_sdk_cloudwatchlogs::Client::new(
        &sdk_config,
    )));
    let trail = Arc::new(CloudTrail::new(aws_sdk_cloudtrail::Client::new(
        &sdk_config,
    )));

    Backend {
        lister: logs.clone(),
        field_indexes: logs.clone(),
        subscription_filters: logs.clone(),
        anomaly_detectors: logs,
        events: trail,
    }
}

fn query_error<E: std::error::Error>(operation: &'static str, err: E) -> QueryError {
    QueryError::new(operation, DisplayErrorContext(err).to_string())
}
