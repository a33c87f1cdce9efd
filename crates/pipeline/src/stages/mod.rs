//! Pipeline stages. Each one takes the previous stage's candidates and returns
//! a subset of them; the enumerator is the only identifier source.

mod enumerate;
mod existence;
mod history;
mod per_item;
mod watched;

pub use enumerate::enumerate;
pub use existence::filter_by_existence;
pub use history::{filter_by_history, HistoryKind};
pub use per_item::filter_by_per_item_signal;
pub use watched::filter_by_global_flag;

use crate::identifier::CandidateSet;

/// Candidates surviving a stage, plus the failures it absorbed on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutput {
    pub candidates: CandidateSet,

    /// Batches or items whose query failed without failing the stage
    pub absorbed_failures: usize,
}

impl StageOutput {
    pub fn clean(candidates: CandidateSet) -> Self {
        Self {
            candidates,
            absorbed_failures: 0,
        }
    }
}
