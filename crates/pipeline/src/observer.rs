use crate::config::Stage;
use crate::report::StageReport;

/// Progress hooks for a pipeline run. All methods default to no-ops.
pub trait PipelineObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage, _candidates: usize) {}

    /// One per-item query finished (subscription filter stage only).
    fn item_completed(&self, _stage: Stage) {}

    fn stage_finished(&self, _report: &StageReport) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}
