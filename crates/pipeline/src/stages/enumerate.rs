use super::StageOutput;
use crate::capability::LogGroupLister;
use crate::config::Stage;
use crate::error::StageError;
use crate::identifier::{normalize, CandidateSet};
use crate::record::disqualifying_reasons;

/// List every log group and keep the ones no attribute predicate rejects.
///
/// A failed page ends the listing: the continuation token is lost with it.
/// The candidates gathered up to that point travel in
/// [`StageError::Interrupted`].
pub async fn enumerate(lister: &dyn LogGroupLister) -> Result<StageOutput, StageError> {
    let mut candidates = CandidateSet::new();
    let mut next_token = None;
    let mut page_number = 0usize;

    loop {
        let page = match lister.list_log_groups(next_token.take()).await {
            Ok(page) => page,
            Err(source) => {
                log::warn!("Listing log groups failed on page {page_number}: {source}");
                return Err(StageError::Interrupted {
                    stage: Stage::Enumerate,
                    kept: candidates,
                    source,
                });
            }
        };
        page_number += 1;

        for record in &page.items {
            let reasons = disqualifying_reasons(record);
            if !reasons.is_empty() {
                let reasons: Vec<String> = reasons.iter().map(ToString::to_string).collect();
                log::debug!("Skipping {}: {}", record.name, reasons.join(", "));
                continue;
            }
            match normalize(&record.arn) {
                Some(id) => {
                    candidates.insert(id);
                }
                None => log::debug!("Dropping unparseable log group ARN {:?}", record.arn),
            }
        }

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    log::info!(
        "Listed {page_number} page(s); {} log groups pass attribute checks",
        candidates.len()
    );
    Ok(StageOutput::clean(candidates))
}
