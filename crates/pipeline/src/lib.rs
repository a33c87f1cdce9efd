//! # logtier pipeline
//!
//! Selects CloudWatch log groups that can move to the Infrequent Access
//! storage class by excluding every group that shows an in-use signal.
//!
//! ## Pipeline
//!
//! ```text
//! DescribeLogGroups (paginated)
//!     │  attribute predicates, ARN → name
//!     │
//!     ├──> Field index policies (batches of 100)
//!     │
//!     ├──> Subscription filters (bounded concurrency, token bucket)
//!     │
//!     ├──> Anomaly detectors (collection-wide scan)
//!     │
//!     ├──> StartLiveTail events (last 30 days)
//!     │
//!     └──> CreateExportTask events (last 30 days)
//!            └─> Eligible log groups
//! ```
//!
//! Every stage returns a subset of its input. Stage errors are settled by the
//! configured [`ErrorPolicy`].
//!
//! ## Example
//!
//! ```no_run
//! use logtier_pipeline::{Backend, EligibilityPipeline, PipelineConfig};
//!
//! async fn eligible(backend: Backend) -> logtier_pipeline::Result<Vec<String>> {
//!     let pipeline = EligibilityPipeline::new(backend, PipelineConfig::default())?;
//!     let outcome = pipeline.run().await?;
//!     Ok(outcome
//!         .eligible
//!         .into_iter()
//!         .map(|id| id.into_string())
//!         .collect())
//! }
//! ```

mod capability;
mod config;
mod error;
mod identifier;
mod limits;
mod observer;
mod pipeline;
mod record;
mod report;
pub mod stages;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use capability::{
    AnomalyDetector, AnomalyDetectorSource, Backend, EventHistory, EventQuery, FieldIndexLookup,
    HistoricalEvent, LogGroupLister, Page, QueryResult, SubscriptionFilterLookup,
};
pub use config::{ErrorPolicy, PipelineConfig, Stage, StagePolicies, MAX_EXISTENCE_BATCH_SIZE};
pub use error::{PipelineError, QueryError, Result, StageError};
pub use identifier::{canonicalize, normalize, CandidateSet, ExclusionSet, LogGroupId};
pub use limits::TokenBucket;
pub use observer::{NoopObserver, PipelineObserver};
pub use pipeline::EligibilityPipeline;
pub use record::{
    disqualifying_reasons, is_disqualified, DataProtectionStatus, Disqualification,
    LogGroupRecord, StorageClass,
};
pub use report::{PipelineOutcome, PipelineReport, StageReport};
