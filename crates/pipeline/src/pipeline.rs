use crate::capability::Backend;
use crate::config::{ErrorPolicy, PipelineConfig, Stage};
use crate::error::{Result, StageError};
use crate::identifier::CandidateSet;
use crate::limits::TokenBucket;
use crate::observer::{NoopObserver, PipelineObserver};
use crate::report::{PipelineOutcome, PipelineReport, StageReport};
use crate::stages::{self, HistoryKind, StageOutput};
use std::sync::Arc;
use std::time::Instant;

/// Runs every eligibility stage against one backend.
#[derive(Clone)]
pub struct EligibilityPipeline {
    backend: Backend,
    config: PipelineConfig,
}

impl EligibilityPipeline {
    pub fn new(backend: Backend, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { backend, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<PipelineOutcome> {
        self.run_with(&NoopObserver).await
    }

    /// Run all stages in order, reporting progress to `observer`.
    pub async fn run_with(&self, observer: &dyn PipelineObserver) -> Result<PipelineOutcome> {
        let started = Instant::now();
        let mut report = PipelineReport::default();

        log::info!("Retrieving log groups and performing attribute checks");
        observer.stage_started(Stage::Enumerate, 0);
        let result = stages::enumerate(self.backend.lister.as_ref()).await;
        let candidates = self.settle(
            Stage::Enumerate,
            CandidateSet::new(),
            result,
            &mut report,
            observer,
        )?;

        log::info!("Checking for log groups with field index policies");
        observer.stage_started(Stage::FieldIndexes, candidates.len());
        let result = stages::filter_by_existence(
            self.backend.field_indexes.as_ref(),
            &candidates,
            self.config.existence_batch_size,
        )
        .await;
        let candidates =
            self.settle(Stage::FieldIndexes, candidates, result, &mut report, observer)?;

        log::info!("Checking for log groups with subscription filters");
        observer.stage_started(Stage::SubscriptionFilters, candidates.len());
        let limiter = Arc::new(TokenBucket::new(
            self.config.requests_per_second,
            self.config.burst,
        ));
        let result = stages::filter_by_per_item_signal(
            Arc::clone(&self.backend.subscription_filters),
            &candidates,
            self.config.concurrency,
            limiter,
            observer,
        )
        .await;
        let candidates = self.settle(
            Stage::SubscriptionFilters,
            candidates,
            result,
            &mut report,
            observer,
        )?;

        log::info!("Checking for log groups watched by anomaly detectors");
        observer.stage_started(Stage::AnomalyDetectors, candidates.len());
        let result =
            stages::filter_by_global_flag(self.backend.anomaly_detectors.as_ref(), &candidates)
                .await;
        let candidates = self.settle(
            Stage::AnomalyDetectors,
            candidates,
            result,
            &mut report,
            observer,
        )?;

        let mut candidates = candidates;
        for kind in [HistoryKind::LiveTail, HistoryKind::ExportTask] {
            log::info!(
                "Checking for log groups with recent {} events",
                kind.event_name()
            );
            observer.stage_started(kind.stage(), candidates.len());
            let result = stages::filter_by_history(
                self.backend.events.as_ref(),
                &candidates,
                kind,
                self.config.lookback(),
            )
            .await;
            candidates = self.settle(kind.stage(), candidates, result, &mut report, observer)?;
        }

        log::info!(
            "{} log group(s) can be considered for Infrequent Access ({:.1}s)",
            candidates.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(PipelineOutcome {
            eligible: candidates,
            report,
        })
    }

    /// Apply the error policy for `stage` and record what happened.
    fn settle(
        &self,
        stage: Stage,
        input: CandidateSet,
        result: std::result::Result<StageOutput, StageError>,
        report: &mut PipelineReport,
        observer: &dyn PipelineObserver,
    ) -> Result<CandidateSet> {
        let input_len = input.len();
        let (candidates, absorbed_failures, error) = match result {
            Ok(output) => {
                debug_assert!(
                    stage == Stage::Enumerate || output.candidates.is_subset_of(&input),
                    "{stage} stage introduced new identifiers"
                );
                (output.candidates, output.absorbed_failures, None)
            }
            Err(err) => match self.config.policy_for(stage) {
                ErrorPolicy::Abort => {
                    log::error!("{err}");
                    return Err(err.into());
                }
                ErrorPolicy::FailOpen => {
                    let message = err.to_string();
                    let kept = err.into_recovered().unwrap_or(input);
                    log::warn!("{message}; continuing with {} candidates", kept.len());
                    (kept, 0, Some(message))
                }
            },
        };

        let stage_report = StageReport {
            stage,
            input: input_len,
            output: candidates.len(),
            absorbed_failures,
            error,
        };
        log::info!(
            "Log groups still in consideration after {stage}: {}",
            stage_report.output
        );
        observer.stage_finished(&stage_report);
        report.stages.push(stage_report);
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::AnomalyDetector;
    use crate::error::PipelineError;
    use crate::identifier::LogGroupId;
    use crate::record::LogGroupRecord;
    use crate::testing::{log_group_arn, Doubles, Paged};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn group(name: &str) -> LogGroupRecord {
        LogGroupRecord::standard(log_group_arn(name), name)
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            requests_per_second: 10_000.0,
            burst: 64,
            ..PipelineConfig::default()
        }
    }

    fn names(set: &CandidateSet) -> Vec<&str> {
        set.iter().map(LogGroupId::as_str).collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = PipelineConfig {
            concurrency: 0,
            ..PipelineConfig::default()
        };
        let result = EligibilityPipeline::new(Doubles::default().backend(), config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn reports_every_stage_in_order() {
        let doubles = Doubles {
            lister: Arc::new(Paged::single(vec![group("a"), group("b")])),
            ..Doubles::default()
        };
        let pipeline = EligibilityPipeline::new(doubles.backend(), fast_config()).expect("config");
        let outcome = pipeline.run().await.expect("run");

        assert_eq!(names(&outcome.eligible), vec!["a", "b"]);
        let stages: Vec<Stage> = outcome.report.stages.iter().map(|r| r.stage).collect();
        assert_eq!(stages, Stage::ALL.to_vec());
        assert!(outcome.report.is_complete());
    }

    #[tokio::test]
    async fn anomaly_failure_aborts_by_default() {
        let doubles = Doubles {
            lister: Arc::new(Paged::single(vec![group("a")])),
            anomaly_detectors: Arc::new(Paged::<AnomalyDetector>::default().failing_at(0, "denied")),
            ..Doubles::default()
        };
        let pipeline = EligibilityPipeline::new(doubles.backend(), fast_config()).expect("config");

        let err = pipeline.run().await.expect_err("abort");
        match err {
            PipelineError::StageFailed(stage_err) => {
                assert_eq!(stage_err.stage(), Stage::AnomalyDetectors)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn fail_open_keeps_stage_input_and_records_error() {
        let doubles = Doubles {
            lister: Arc::new(Paged::single(vec![group("a"), group("b")])),
            anomaly_detectors: Arc::new(Paged::<AnomalyDetector>::default().failing_at(0, "denied")),
            ..Doubles::default()
        };
        let mut config = fast_config();
        config.stage_policies.anomaly_detectors = Some(ErrorPolicy::FailOpen);
        let pipeline = EligibilityPipeline::new(doubles.backend(), config).expect("config");

        let outcome = pipeline.run().await.expect("fail open");
        assert_eq!(names(&outcome.eligible), vec!["a", "b"]);
        let stage = outcome
            .report
            .stage(Stage::AnomalyDetectors)
            .expect("stage report");
        assert_eq!(stage.output, 2);
        assert!(stage
            .error
            .as_deref()
            .is_some_and(|message| message.contains("denied")));
        assert!(!outcome.report.is_complete());
    }

    #[tokio::test]
    async fn abort_policy_applies_to_enumeration() {
        let doubles = Doubles {
            lister: Arc::new(Paged::new(vec![vec![group("a")], vec![]]).failing_at(1, "boom")),
            ..Doubles::default()
        };
        let config = PipelineConfig {
            error_policy: ErrorPolicy::Abort,
            ..fast_config()
        };
        let pipeline = EligibilityPipeline::new(doubles.backend(), config).expect("config");
        assert!(pipeline.run().await.is_err());
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl PipelineObserver for RecordingObserver {
        fn stage_started(&self, stage: Stage, candidates: usize) {
            self.events
                .lock()
                .expect("lock")
                .push(format!("start {stage} {candidates}"));
        }

        fn stage_finished(&self, report: &StageReport) {
            self.events
                .lock()
                .expect("lock")
                .push(format!("finish {} {}", report.stage, report.output));
        }
    }

    #[tokio::test]
    async fn observer_sees_stage_boundaries() {
        let doubles = Doubles {
            lister: Arc::new(Paged::single(vec![group("a")])),
            ..Doubles::default()
        };
        let pipeline = EligibilityPipeline::new(doubles.backend(), fast_config()).expect("config");
        let observer = RecordingObserver::default();
        pipeline.run_with(&observer).await.expect("run");

        let events = observer.events.lock().expect("lock").clone();
        assert_eq!(events.first().map(String::as_str), Some("start enumerate 0"));
        assert_eq!(events.get(1).map(String::as_str), Some("finish enumerate 1"));
        assert_eq!(events.last().map(String::as_str), Some("finish export_tasks 1"));
        assert_eq!(events.len(), Stage::ALL.len() * 2);
    }
}
