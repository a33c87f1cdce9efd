use crate::query_error;
use async_trait::async_trait;
use aws_sdk_cloudtrail::primitives::DateTime;
use aws_sdk_cloudtrail::types::{Event, LookupAttribute, LookupAttributeKey};
use aws_sdk_cloudtrail::Client;
use logtier_pipeline::{EventHistory, EventQuery, HistoricalEvent, Page, QueryResult};
use std::time::SystemTime;

const OPERATION: &str = "LookupEvents";

/// CloudTrail management event history.
#[derive(Debug, Clone)]
pub struct CloudTrail {
    client: Client,
}

impl CloudTrail {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventHistory for CloudTrail {
    async fn lookup_events(
        &self,
        query: &EventQuery,
        next_token: Option<String>,
    ) -> QueryResult<Page<HistoricalEvent>> {
        let attribute = LookupAttribute::builder()
            .attribute_key(LookupAttributeKey::EventName)
            .attribute_value(query.event_name)
            .build()
            .map_err(|err| query_error(OPERATION, err))?;

        let output = self
            .client
            .lookup_events()
            .start_time(DateTime::from(query.start_time))
            .end_time(DateTime::from(query.end_time))
            .lookup_attributes(attribute)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| query_error(OPERATION, err))?;

        let events = output.events().iter().map(event_from_sdk).collect();
        Ok(Page::new(events, output.next_token().map(str::to_string)))
    }
}

fn event_from_sdk(event: &Event) -> HistoricalEvent {
    HistoricalEvent {
        event_name: event.event_name().map(str::to_string),
        event_time: event
            .event_time()
            .and_then(|time| SystemTime::try_from(*time).ok()),
        payload: event.cloud_trail_event().map(str::to_string),
    }
}
