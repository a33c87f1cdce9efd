use super::StageOutput;
use crate::capability::SubscriptionFilterLookup;
use crate::config::Stage;
use crate::error::StageError;
use crate::identifier::{CandidateSet, LogGroupId};
use crate::limits::{TokenBucket, WorkerBudget};
use crate::observer::PipelineObserver;
use std::sync::Arc;
use tokio::task::JoinSet;

enum Verdict {
    Keep,
    Subscribed(usize),
    Failed,
}

/// Keep log groups without subscription filters.
///
/// At most `concurrency` lookups are in flight, and every lookup first takes a
/// token from `limiter`. A lookup that fails drops its log group. Workers hand
/// their verdicts back through the join set; survivors keep input order.
pub async fn filter_by_per_item_signal(
    lookup: Arc<dyn SubscriptionFilterLookup>,
    candidates: &CandidateSet,
    concurrency: usize,
    limiter: Arc<TokenBucket>,
    observer: &dyn PipelineObserver,
) -> Result<StageOutput, StageError> {
    let budget = WorkerBudget::new(concurrency);
    let mut workers = JoinSet::new();
    let mut verdicts: Vec<(usize, LogGroupId, Verdict)> = Vec::with_capacity(candidates.len());

    for (index, id) in candidates.iter().cloned().enumerate() {
        // Drain finished workers while waiting so progress stays current.
        let permit = loop {
            tokio::select! {
                permit = budget.acquire() => break permit,
                Some(joined) = workers.join_next() => {
                    verdicts.push(joined_verdict(joined)?);
                    observer.item_completed(Stage::SubscriptionFilters);
                }
            }
        };

        let lookup = Arc::clone(&lookup);
        let limiter = Arc::clone(&limiter);
        workers.spawn(async move {
            let _permit = permit;
            limiter.acquire().await;
            let verdict = match lookup.count_subscription_filters(&id).await {
                Ok(0) => Verdict::Keep,
                Ok(count) => Verdict::Subscribed(count),
                Err(err) => {
                    log::warn!("Subscription filter lookup failed for {id}, dropping it: {err}");
                    Verdict::Failed
                }
            };
            (index, id, verdict)
        });
    }

    log::debug!(
        "All subscription filter lookups dispatched ({:?})",
        budget.snapshot()
    );
    while let Some(joined) = workers.join_next().await {
        verdicts.push(joined_verdict(joined)?);
        observer.item_completed(Stage::SubscriptionFilters);
    }

    verdicts.sort_by_key(|(index, _, _)| *index);
    let mut output = StageOutput::default();
    for (_, id, verdict) in verdicts {
        match verdict {
            Verdict::Keep => {
                output.candidates.insert(id);
            }
            Verdict::Subscribed(count) => {
                log::debug!("{id} has {count} subscription filter(s)");
            }
            Verdict::Failed => output.absorbed_failures += 1,
        }
    }
    Ok(output)
}

fn joined_verdict(
    joined: Result<(usize, LogGroupId, Verdict), tokio::task::JoinError>,
) -> Result<(usize, LogGroupId, Verdict), StageError> {
    joined.map_err(|err| StageError::Worker {
        stage: Stage::SubscriptionFilters,
        message: err.to_string(),
    })
}
