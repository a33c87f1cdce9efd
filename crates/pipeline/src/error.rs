use crate::config::Stage;
use crate::identifier::CandidateSet;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// A single query against one of the external capabilities failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {message}")]
pub struct QueryError {
    pub operation: &'static str,
    pub message: String,
}

impl QueryError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Failure of one pipeline stage as a whole.
///
/// Batch-level and item-level failures that a stage absorbs on its own never
/// surface here; they are counted in the stage output instead.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("{stage} stage query failed: {source}")]
    Query {
        stage: Stage,
        #[source]
        source: QueryError,
    },

    /// The stage stopped part-way; `kept` holds what it had produced so far.
    #[error("{stage} stage interrupted after {} candidates: {source}", .kept.len())]
    Interrupted {
        stage: Stage,
        kept: CandidateSet,
        #[source]
        source: QueryError,
    },

    #[error("{stage} stage worker failed: {message}")]
    Worker { stage: Stage, message: String },
}

impl StageError {
    pub fn query(stage: Stage, source: QueryError) -> Self {
        Self::Query { stage, source }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Query { stage, .. }
            | Self::Interrupted { stage, .. }
            | Self::Worker { stage, .. } => *stage,
        }
    }

    /// Candidates to continue with when this error is absorbed, if the stage
    /// produced a usable partial result.
    pub fn into_recovered(self) -> Option<CandidateSet> {
        match self {
            Self::Interrupted { kept, .. } => Some(kept),
            Self::Query { .. } | Self::Worker { .. } => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Pipeline aborted: {0}")]
    StageFailed(#[from] StageError),
}

impl PipelineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
