//! In-memory capability doubles.

use crate::capability::{
    AnomalyDetector, AnomalyDetectorSource, Backend, EventHistory, EventQuery, FieldIndexLookup,
    HistoricalEvent, LogGroupLister, Page, QueryResult, SubscriptionFilterLookup,
};
use crate::error::QueryError;
use crate::identifier::LogGroupId;
use crate::record::LogGroupRecord;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

pub fn log_group_arn(name: &str) -> String {
    format!("arn:aws:logs:us-east-1:123456789012:log-group:{name}")
}

/// A recorded API call carrying `request_parameters` in its payload.
pub fn trail_event(event_name: &str, request_parameters: serde_json::Value) -> HistoricalEvent {
    let payload = json!({
        "eventVersion": "1.09",
        "eventSource": "logs.amazonaws.com",
        "eventName": event_name,
        "eventTime": "2026-10-01T12:00:00Z",
        "requestParameters": request_parameters,
    });
    HistoricalEvent {
        event_name: Some(event_name.to_string()),
        event_time: Some(SystemTime::now()),
        payload: Some(payload.to_string()),
    }
}

/// Fixed pages served by page index; selected pages fail.
#[derive(Debug)]
pub struct Paged<T> {
    pages: Vec<Vec<T>>,
    failures: HashMap<usize, String>,
    requests: AtomicUsize,
}

impl<T> Default for Paged<T> {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            failures: HashMap::new(),
            requests: AtomicUsize::new(0),
        }
    }
}

impl<T: Clone> Paged<T> {
    pub fn new(pages: Vec<Vec<T>>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn single(items: Vec<T>) -> Self {
        Self::new(vec![items])
    }

    pub fn failing_at(mut self, page: usize, message: impl Into<String>) -> Self {
        self.failures.insert(page, message.into());
        self
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn fetch(&self, operation: &'static str, next_token: Option<String>) -> QueryResult<Page<T>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let index = match next_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| QueryError::new(operation, format!("invalid token {token}")))?,
        };
        if let Some(message) = self.failures.get(&index) {
            return Err(QueryError::new(operation, message.clone()));
        }
        let items = self.pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
        Ok(Page::new(items, next_token))
    }
}

#[async_trait]
impl LogGroupLister for Paged<LogGroupRecord> {
    async fn list_log_groups(
        &self,
        next_token: Option<String>,
    ) -> QueryResult<Page<LogGroupRecord>> {
        self.fetch("DescribeLogGroups", next_token)
    }
}

#[async_trait]
impl AnomalyDetectorSource for Paged<AnomalyDetector> {
    async fn list_anomaly_detectors(
        &self,
        next_token: Option<String>,
    ) -> QueryResult<Page<AnomalyDetector>> {
        self.fetch("ListLogAnomalyDetectors", next_token)
    }
}

pub fn detector(watched: &[&str]) -> AnomalyDetector {
    AnomalyDetector {
        arn: None,
        watched: watched.iter().map(|name| log_group_arn(name)).collect(),
    }
}

/// Field index policies keyed by canonical name, reported in a chosen form.
#[derive(Debug, Default)]
pub struct FieldIndexDouble {
    reported: HashMap<String, String>,
    fail_with: HashSet<String>,
    page_size: Option<usize>,
    batches: Mutex<Vec<Vec<String>>>,
}

impl FieldIndexDouble {
    pub fn with_policy(mut self, name: &str) -> Self {
        self.reported.insert(name.to_string(), name.to_string());
        self
    }

    /// The lookup reports this group by ARN instead of by name.
    pub fn with_policy_by_arn(mut self, name: &str) -> Self {
        self.reported.insert(name.to_string(), log_group_arn(name));
        self
    }

    /// Any batch containing `name` fails.
    pub fn failing_for(mut self, name: &str) -> Self {
        self.fail_with.insert(name.to_string());
        self
    }

    /// Serve hits `page_size` at a time.
    pub fn paged(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Distinct batches requested, in request order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl FieldIndexLookup for FieldIndexDouble {
    async fn describe_field_indexes(
        &self,
        ids: &[LogGroupId],
        next_token: Option<String>,
    ) -> QueryResult<Page<String>> {
        let names: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        if next_token.is_none() {
            self.batches
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(names.clone());
        }
        if names.iter().any(|name| self.fail_with.contains(name)) {
            return Err(QueryError::new("DescribeFieldIndexes", "throttled"));
        }

        let hits: Vec<String> = names
            .iter()
            .filter_map(|name| self.reported.get(name).cloned())
            .collect();
        let Some(page_size) = self.page_size else {
            return Ok(Page::last(hits));
        };

        let offset = next_token
            .as_deref()
            .and_then(|token| token.parse::<usize>().ok())
            .unwrap_or(0);
        let end = (offset + page_size).min(hits.len());
        let page = hits.get(offset..end).map(<[String]>::to_vec).unwrap_or_default();
        let next_token = (end < hits.len()).then(|| end.to_string());
        Ok(Page::new(page, next_token))
    }
}

/// Subscription filter counts per name; tracks peak concurrency.
#[derive(Debug, Default)]
pub struct SubscriptionDouble {
    counts: HashMap<String, usize>,
    failures: HashSet<String>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requests: AtomicUsize,
}

impl SubscriptionDouble {
    pub fn with_filters(mut self, name: &str, count: usize) -> Self {
        self.counts.insert(name.to_string(), count);
        self
    }

    pub fn failing_for(mut self, name: &str) -> Self {
        self.failures.insert(name.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SubscriptionFilterLookup for SubscriptionDouble {
    async fn count_subscription_filters(&self, id: &LogGroupId) -> QueryResult<usize> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failures.contains(id.as_str()) {
            return Err(QueryError::new(
                "DescribeSubscriptionFilters",
                format!("access denied for {id}"),
            ));
        }
        Ok(self.counts.get(id.as_str()).copied().unwrap_or(0))
    }
}

/// Event history per event name; records every query it receives.
#[derive(Debug, Default)]
pub struct EventDouble {
    by_name: HashMap<&'static str, Paged<HistoricalEvent>>,
    queries: Mutex<Vec<EventQuery>>,
}

impl EventDouble {
    pub fn with_events(mut self, event_name: &'static str, events: Paged<HistoricalEvent>) -> Self {
        self.by_name.insert(event_name, events);
        self
    }

    pub fn queries(&self) -> Vec<EventQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EventHistory for EventDouble {
    async fn lookup_events(
        &self,
        query: &EventQuery,
        next_token: Option<String>,
    ) -> QueryResult<Page<HistoricalEvent>> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());
        match self.by_name.get(query.event_name) {
            Some(events) => events.fetch("LookupEvents", next_token),
            None => Ok(Page::last(Vec::new())),
        }
    }
}

/// One double per capability; empty unless replaced.
#[derive(Clone, Default)]
pub struct Doubles {
    pub lister: Arc<Paged<LogGroupRecord>>,
    pub field_indexes: Arc<FieldIndexDouble>,
    pub subscription_filters: Arc<SubscriptionDouble>,
    pub anomaly_detectors: Arc<Paged<AnomalyDetector>>,
    pub events: Arc<EventDouble>,
}

impl Doubles {
    pub fn backend(&self) -> Backend {
        Backend {
            lister: self.lister.clone(),
            field_indexes: self.field_indexes.clone(),
            subscription_filters: self.subscription_filters.clone(),
            anomaly_detectors: self.anomaly_detectors.clone(),
            events: self.events.clone(),
        }
    }
}
