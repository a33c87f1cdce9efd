use indicatif::{ProgressBar, ProgressStyle};
use logtier_pipeline::{PipelineObserver, Stage, StageReport};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)";
const SPINNER_TEMPLATE: &str = "{spinner} {msg}";

/// Terminal progress for a pipeline run: a bar for the per-item stage and a
/// spinner for every other stage. Draws to stderr, or nowhere when hidden.
pub struct StageProgress {
    visible: bool,
    current: Mutex<Option<ProgressBar>>,
}

impl StageProgress {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            current: Mutex::new(None),
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bar_for(&self, stage: Stage, candidates: usize) -> ProgressBar {
        if !self.visible {
            return ProgressBar::hidden();
        }
        if stage == Stage::SubscriptionFilters {
            let bar = ProgressBar::new(candidates as u64);
            bar.set_style(
                ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar
        } else {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template(SPINNER_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner
        }
    }
}

fn label(stage: Stage) -> &'static str {
    match stage {
        Stage::Enumerate => "Retrieving and checking log groups",
        Stage::FieldIndexes => "Removing log groups with field indexes",
        Stage::SubscriptionFilters => "Finding subscription filters",
        Stage::AnomalyDetectors => "Removing log groups with anomaly detectors",
        Stage::LiveTail => "Removing LiveTail events",
        Stage::ExportTasks => "Removing export events",
    }
}

impl PipelineObserver for StageProgress {
    fn stage_started(&self, stage: Stage, candidates: usize) {
        let bar = self.bar_for(stage, candidates);
        bar.set_message(label(stage));
        if let Some(previous) = self.current().replace(bar) {
            previous.finish_and_clear();
        }
    }

    fn item_completed(&self, _stage: Stage) {
        if let Some(bar) = self.current().as_ref() {
            bar.inc(1);
        }
    }

    fn stage_finished(&self, report: &StageReport) {
        if let Some(bar) = self.current().take() {
            let summary = if report.is_clean() {
                format!("{}: {} -> {}", label(report.stage), report.input, report.output)
            } else {
                format!(
                    "{}: {} -> {} (incomplete)",
                    label(report.stage),
                    report.input,
                    report.output
                )
            };
            bar.finish_with_message(summary);
        }
    }
}
