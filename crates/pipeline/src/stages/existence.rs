use super::StageOutput;
use crate::capability::FieldIndexLookup;
use crate::error::{QueryError, StageError};
use crate::identifier::{canonicalize, CandidateSet, ExclusionSet, LogGroupId};

/// Remove log groups that carry a field index policy.
///
/// Candidates are looked up `batch_size` at a time. A batch whose lookup
/// fails is kept whole and counted in `absorbed_failures`.
pub async fn filter_by_existence(
    lookup: &dyn FieldIndexLookup,
    candidates: &CandidateSet,
    batch_size: usize,
) -> Result<StageOutput, StageError> {
    let mut output = StageOutput::default();

    for (index, batch) in candidates.chunks(batch_size.max(1)).enumerate() {
        match indexed_in_batch(lookup, batch).await {
            Ok(indexed) => {
                for id in batch {
                    if indexed.contains(id) {
                        log::debug!("Found field index policy on {id}");
                    } else {
                        output.candidates.insert(id.clone());
                    }
                }
            }
            Err(err) => {
                log::warn!(
                    "Field index lookup failed for batch {index} ({} groups), keeping it: {err}",
                    batch.len()
                );
                output.absorbed_failures += 1;
                output.candidates.extend(batch.iter().cloned());
            }
        }
    }

    Ok(output)
}

async fn indexed_in_batch(
    lookup: &dyn FieldIndexLookup,
    batch: &[LogGroupId],
) -> Result<ExclusionSet, QueryError> {
    let mut indexed = ExclusionSet::new();
    let mut next_token = None;

    loop {
        let page = lookup.describe_field_indexes(batch, next_token.take()).await?;
        indexed.extend(page.items.iter().filter_map(|raw| canonicalize(raw)));
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => return Ok(indexed),
        }
    }
}
