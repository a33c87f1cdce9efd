//! Query capabilities the pipeline depends on.
//!
//! Each trait covers one external signal. Implementations paginate with an
//! opaque continuation token: `None` on input asks for the first page, `None`
//! on output means the collection is exhausted.

use crate::error::QueryError;
use crate::identifier::LogGroupId;
use crate::record::LogGroupRecord;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::SystemTime;

pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// One page of a paginated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Anomaly detector and the fully-qualified identifiers it watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyDetector {
    pub arn: Option<String>,
    pub watched: Vec<String>,
}

/// Time-windowed, event-name-filtered history query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub event_name: &'static str,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
}

/// A recorded API call. `payload` is the JSON document of the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalEvent {
    pub event_name: Option<String>,
    pub event_time: Option<SystemTime>,
    pub payload: Option<String>,
}

#[async_trait]
pub trait LogGroupLister: Send + Sync {
    async fn list_log_groups(&self, next_token: Option<String>)
        -> QueryResult<Page<LogGroupRecord>>;
}

/// Reverse lookup of log groups that carry a field index policy.
#[async_trait]
pub trait FieldIndexLookup: Send + Sync {
    /// Identifiers (either form) of the groups in `ids` that have a policy.
    async fn describe_field_indexes(
        &self,
        ids: &[LogGroupId],
        next_token: Option<String>,
    ) -> QueryResult<Page<String>>;
}

#[async_trait]
pub trait SubscriptionFilterLookup: Send + Sync {
    async fn count_subscription_filters(&self, id: &LogGroupId) -> QueryResult<usize>;
}

#[async_trait]
pub trait AnomalyDetectorSource: Send + Sync {
    async fn list_anomaly_detectors(
        &self,
        next_token: Option<String>,
    ) -> QueryResult<Page<AnomalyDetector>>;
}

#[async_trait]
pub trait EventHistory: Send + Sync {
    async fn lookup_events(
        &self,
        query: &EventQuery,
        next_token: Option<String>,
    ) -> QueryResult<Page<HistoricalEvent>>;
}

/// One implementation per capability.
#[derive(Clone)]
pub struct Backend {
    pub lister: Arc<dyn LogGroupLister>,
    pub field_indexes: Arc<dyn FieldIndexLookup>,
    pub subscription_filters: Arc<dyn SubscriptionFilterLookup>,
    pub anomaly_detectors: Arc<dyn AnomalyDetectorSource>,
    pub events: Arc<dyn EventHistory>,
}
