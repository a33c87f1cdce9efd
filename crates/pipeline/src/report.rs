use crate::config::Stage;
use crate::identifier::CandidateSet;
use serde::Serialize;

/// What one stage did to the candidate set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,

    /// Candidates handed to the stage
    pub input: usize,

    /// Candidates the stage let through
    pub output: usize,

    /// Batches or items whose query failed without failing the stage
    pub absorbed_failures: usize,

    /// Stage error absorbed under the fail-open policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageReport {
    pub fn removed(&self) -> usize {
        self.input.saturating_sub(self.output)
    }

    pub fn is_clean(&self) -> bool {
        self.absorbed_failures == 0 && self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// True when no stage absorbed any failure.
    pub fn is_complete(&self) -> bool {
        self.stages.iter().all(StageReport::is_clean)
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }
}

/// Final eligible log groups and how the run got there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    pub eligible: CandidateSet,
    pub report: PipelineReport,
}
