//! Background jobs
//!
//! - **scheduler**: interval loop with per-job status and error backoff
//! - **daily_challenges**: seeds every user's challenges for today
//! - **inactivity**: nudges users who have been away

pub mod daily_challenges;
pub mod inactivity;
pub mod scheduler;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

pub use daily_challenges::DailyChallengesJob;
pub use inactivity::{InactivityReport, InactivityScanJob};
pub use scheduler::{JobScheduler, JobStatus, RunStatus, ScheduleConfig};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job already running: {0}")]
    AlreadyRunning(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Summary of one job run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobOutcome {
    pub processed: usize,
    pub failed: usize,
    /// Job-specific report
    pub detail: serde_json::Value,
}

/// A unit of periodic work
#[async_trait]
pub trait Job: Send + Sync {
    /// Stable name used in URLs and logs
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn run(&self, now: DateTime<Utc>) -> Result<JobOutcome, JobError>;
}
