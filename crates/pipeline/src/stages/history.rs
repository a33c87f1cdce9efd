use super::StageOutput;
use crate::capability::{EventHistory, EventQuery, HistoricalEvent};
use crate::config::Stage;
use crate::error::StageError;
use crate::identifier::{canonicalize, CandidateSet, ExclusionSet};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, SystemTime};

/// Recent activity that marks a log group as in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    /// Somebody tailed the group live
    LiveTail,
    /// The group was exported to S3
    ExportTask,
}

impl HistoryKind {
    pub fn event_name(self) -> &'static str {
        match self {
            Self::LiveTail => "StartLiveTail",
            Self::ExportTask => "CreateExportTask",
        }
    }

    pub fn stage(self) -> Stage {
        match self {
            Self::LiveTail => Stage::LiveTail,
            Self::ExportTask => Stage::ExportTasks,
        }
    }

    /// Raw identifiers referenced by one event payload.
    fn referenced(self, payload: &str) -> serde_json::Result<Vec<String>> {
        match self {
            Self::LiveTail => Ok(request_parameters::<LiveTailParameters>(payload)?
                .map(|params| {
                    params
                        .log_group_identifiers
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()),
            Self::ExportTask => Ok(request_parameters::<ExportTaskParameters>(payload)?
                .and_then(|params| params.log_group_name)
                .into_iter()
                .collect()),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventEnvelope<P> {
    request_parameters: Option<P>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveTailParameters {
    /// Non-string entries are ignored individually.
    #[serde(default)]
    log_group_identifiers: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportTaskParameters {
    log_group_name: Option<String>,
}

fn request_parameters<P: DeserializeOwned>(payload: &str) -> serde_json::Result<Option<P>> {
    serde_json::from_str::<EventEnvelope<P>>(payload).map(|envelope| envelope.request_parameters)
}

/// Remove log groups referenced by `kind` events within the last `lookback`.
///
/// Identifiers are canonicalized whatever form the payload uses. Events whose
/// payload does not parse are skipped; a failed page fails the stage.
pub async fn filter_by_history(
    history: &dyn EventHistory,
    candidates: &CandidateSet,
    kind: HistoryKind,
    lookback: Duration,
) -> Result<StageOutput, StageError> {
    let end_time = SystemTime::now();
    let query = EventQuery {
        event_name: kind.event_name(),
        start_time: end_time.checked_sub(lookback).unwrap_or(SystemTime::UNIX_EPOCH),
        end_time,
    };

    let mut referenced = ExclusionSet::new();
    let mut events = 0usize;
    let mut next_token = None;

    loop {
        let page = history
            .lookup_events(&query, next_token.take())
            .await
            .map_err(|source| StageError::query(kind.stage(), source))?;

        events += page.items.len();
        for event in &page.items {
            collect_references(kind, event, &mut referenced);
        }

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    log::info!(
        "Found {events} {} event(s) referencing {} log group(s)",
        kind.event_name(),
        referenced.len()
    );
    Ok(StageOutput::clean(candidates.without(&referenced)))
}

fn collect_references(kind: HistoryKind, event: &HistoricalEvent, referenced: &mut ExclusionSet) {
    let Some(payload) = event.payload.as_deref() else {
        log::debug!("Skipping {} event without payload", kind.event_name());
        return;
    };

    let raw = match kind.referenced(payload) {
        Ok(raw) => raw,
        Err(err) => {
            log::warn!("Skipping unparseable {} event: {err}", kind.event_name());
            return;
        }
    };

    for identifier in raw {
        match canonicalize(&identifier) {
            Some(id) => {
                log::debug!("{} event references {id}", kind.event_name());
                referenced.insert(id);
            }
            None => log::debug!("Ignoring unparseable identifier {identifier:?}"),
        }
    }
}
