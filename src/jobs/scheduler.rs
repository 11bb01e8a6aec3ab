//! Job scheduler
//!
//! Runs registered jobs on per-job intervals. Failures back off by 15
//! minutes per consecutive error, capped at an hour.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Job, JobError, JobOutcome};

/// Scheduling state for one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub interval_hours: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_status: Option<RunStatus>,
    pub next_run: Option<DateTime<Utc>>,
    pub error_count: u32,
}

impl ScheduleConfig {
    pub fn every(interval_hours: u64) -> Self {
        Self {
            enabled: true,
            interval_hours,
            ..Default::default()
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: 24,
            last_run: None,
            last_status: None,
            next_run: None,
            error_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Success { processed: usize, failed: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub running: bool,
    pub interval_hours: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_status: Option<RunStatus>,
    pub next_run: Option<DateTime<Utc>>,
    pub error_count: u32,
}

/// `now + hours`, saturating at the latest representable time
fn hours_after(now: DateTime<Utc>, hours: u64) -> DateTime<Utc> {
    i64::try_from(hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub struct JobScheduler {
    jobs: Arc<RwLock<HashMap<String, Arc<dyn Job>>>>,
    schedules: Arc<RwLock<HashMap<String, ScheduleConfig>>>,
    in_flight: Arc<RwLock<HashSet<String>>>,
    running: Arc<RwLock<bool>>,
    tick: std::time::Duration,
}

impl JobScheduler {
    pub fn new(tick: std::time::Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            schedules: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(RwLock::new(HashSet::new())),
            running: Arc::new(RwLock::new(false)),
            tick,
        }
    }

    pub async fn register(&self, job: Arc<dyn Job>, schedule: ScheduleConfig) {
        let name = job.name().to_string();

        let mut schedule = schedule;
        if schedule.enabled && schedule.next_run.is_none() {
            schedule.next_run = Some(Utc::now());
        }

        self.jobs.write().await.insert(name.clone(), job);
        self.schedules.write().await.insert(name, schedule);
    }

    fn status_of(
        name: &str,
        job: &Arc<dyn Job>,
        schedule: Option<&ScheduleConfig>,
        in_flight: &HashSet<String>,
    ) -> JobStatus {
        JobStatus {
            name: name.to_string(),
            description: job.description().to_string(),
            enabled: schedule.map(|s| s.enabled).unwrap_or(false),
            running: in_flight.contains(name),
            interval_hours: schedule.map(|s| s.interval_hours).unwrap_or(0),
            last_run: schedule.and_then(|s| s.last_run),
            last_status: schedule.and_then(|s| s.last_status.clone()),
            next_run: schedule.and_then(|s| s.next_run),
            error_count: schedule.map(|s| s.error_count).unwrap_or(0),
        }
    }

    /// Status of every job, sorted by name
    pub async fn get_status(&self) -> Vec<JobStatus> {
        let jobs = self.jobs.read().await;
        let schedules = self.schedules.read().await;
        let in_flight = self.in_flight.read().await;

        let mut status: Vec<JobStatus> = jobs
            .iter()
            .map(|(name, job)| Self::status_of(name, job, schedules.get(name), &in_flight))
            .collect();
        status.sort_by(|a, b| a.name.cmp(&b.name));
        status
    }

    pub async fn get_job_status(&self, name: &str) -> Option<JobStatus> {
        let jobs = self.jobs.read().await;
        let schedules = self.schedules.read().await;
        let in_flight = self.in_flight.read().await;

        jobs.get(name)
            .map(|job| Self::status_of(name, job, schedules.get(name), &in_flight))
    }

    /// Run a job now, regardless of its schedule
    pub async fn trigger(&self, name: &str) -> Result<JobOutcome, JobError> {
        self.trigger_at(name, Utc::now()).await
    }

    pub async fn trigger_at(&self, name: &str, now: DateTime<Utc>) -> Result<JobOutcome, JobError> {
        let job = self
            .jobs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| JobError::NotFound(name.to_string()))?;

        if !self.in_flight.write().await.insert(name.to_string()) {
            return Err(JobError::AlreadyRunning(name.to_string()));
        }

        let result = job.run(now).await;
        self.in_flight.write().await.remove(name);

        let mut schedules = self.schedules.write().await;
        if let Some(schedule) = schedules.get_mut(name) {
            schedule.last_run = Some(now);
            match &result {
                Ok(outcome) => {
                    schedule.last_status = Some(RunStatus::Success {
                        processed: outcome.processed,
                        failed: outcome.failed,
                    });
                    schedule.error_count = 0;
                    schedule.next_run = Some(hours_after(now, schedule.interval_hours));
                }
                Err(e) => {
                    schedule.last_status = Some(RunStatus::Failed {
                        error: e.to_string(),
                    });
                    schedule.error_count += 1;
                    let backoff = std::cmp::min(schedule.error_count as i64 * 15, 60);
                    schedule.next_run = Some(now + Duration::minutes(backoff));
                }
            }
        }

        result
    }

    /// Start the background loop
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let scheduler = self.clone();

        tokio::spawn(async move {
            *scheduler.running.write().await = true;
            tracing::info!(tick_secs = scheduler.tick.as_secs(), "Job scheduler started");

            let mut interval = tokio::time::interval(scheduler.tick);

            loop {
                interval.tick().await;

                if !*scheduler.running.read().await {
                    break;
                }

                scheduler.run_due(Utc::now()).await;
            }

            tracing::info!("Job scheduler stopped");
        })
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Run every enabled job whose next run is due; returns the names run
    pub async fn run_due(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut due: Vec<String> = {
            let schedules = self.schedules.read().await;
            schedules
                .iter()
                .filter(|(_, s)| s.enabled && s.next_run.map(|next| now >= next).unwrap_or(true))
                .map(|(name, _)| name.clone())
                .collect()
        };
        due.sort();

        for name in &due {
            tracing::info!(job = %name, "Running scheduled job");

            match self.trigger_at(name, now).await {
                Ok(outcome) => {
                    tracing::info!(
                        job = %name,
                        processed = outcome.processed,
                        failed = outcome.failed,
                        "Job finished"
                    );
                }
                Err(e) => {
                    tracing::error!(job = %name, error = %e, "Job failed");
                }
            }
        }

        due
    }

    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), JobError> {
        let mut schedules = self.schedules.write().await;
        let schedule = schedules
            .get_mut(name)
            .ok_or_else(|| JobError::NotFound(name.to_string()))?;
        schedule.enabled = enabled;
        if enabled && schedule.next_run.is_none() {
            schedule.next_run = Some(Utc::now());
        }
        Ok(())
    }

    pub async fn set_interval(&self, name: &str, interval_hours: u64) -> Result<(), JobError> {
        let mut schedules = self.schedules.write().await;
        let schedule = schedules
            .get_mut(name)
            .ok_or_else(|| JobError::NotFound(name.to_string()))?;
        schedule.interval_hours = interval_hours.max(1);
        Ok(())
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(60))
    }
}
