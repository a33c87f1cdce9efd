use super::StageOutput;
use crate::capability::AnomalyDetectorSource;
use crate::config::Stage;
use crate::error::StageError;
use crate::identifier::{normalize, CandidateSet, ExclusionSet};

/// Remove log groups watched by any anomaly detector.
///
/// The detector listing is collection-wide, so it is read in full regardless
/// of how many candidates remain. Any page failure fails the stage.
pub async fn filter_by_global_flag(
    source: &dyn AnomalyDetectorSource,
    candidates: &CandidateSet,
) -> Result<StageOutput, StageError> {
    let mut watched = ExclusionSet::new();
    let mut detectors = 0usize;
    let mut next_token = None;

    loop {
        let page = source
            .list_anomaly_detectors(next_token.take())
            .await
            .map_err(|source| StageError::query(Stage::AnomalyDetectors, source))?;

        for detector in &page.items {
            detectors += 1;
            for arn in &detector.watched {
                match normalize(arn) {
                    Some(id) => {
                        watched.insert(id);
                    }
                    None => log::debug!(
                        "Ignoring unparseable ARN {arn:?} on detector {:?}",
                        detector.arn
                    ),
                }
            }
        }

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    log::info!(
        "{detectors} anomaly detector(s) watch {} log group(s)",
        watched.len()
    );
    Ok(StageOutput::clean(candidates.without(&watched)))
}
