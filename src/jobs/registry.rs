use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::foundation::error::{KenBurnsError, KenBurnsResult};

/// Highest progress a job reports before it is complete.
pub const MAX_IN_FLIGHT_PROGRESS: u8 = 99;

/// Unique job identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Fresh random id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for JobId {
    type Err = KenBurnsError;

    fn from_str(s: &str) -> KenBurnsResult<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| KenBurnsError::invalid_request(format!("malformed job id '{s}': {e}")))
    }
}

/// Lifecycle state of a job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, render not started yet.
    #[default]
    Queued,
    /// Frames are being encoded.
    Rendering,
    /// Output file is ready for download.
    Complete,
    /// Render failed; see the job's error.
    Failed,
}

impl JobStatus {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Rendering => "rendering",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// `true` once no further updates are expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one job, as returned by polling.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JobSnapshot {
    /// Job id.
    pub id: JobId,
    /// Percent complete, 0..=100. 100 only once complete.
    #[serde(rename = "progress")]
    pub progress_percent: u8,
    /// `true` once the output can be downloaded.
    #[serde(rename = "done")]
    pub is_complete: bool,
    /// Download location, set on completion.
    #[serde(rename = "url")]
    pub download_url: Option<String>,
    /// Lifecycle state.
    pub status: JobStatus,
    /// Failure reason, set when failed.
    pub error: Option<String>,
}

#[derive(Debug)]
struct JobRecord {
    status: JobStatus,
    progress: u8,
    download_url: Option<String>,
    error: Option<String>,
    output_path: PathBuf,
    expires_at: Option<Instant>,
}

/// Process-wide store of job records, keyed by id.
///
/// Every mutation is a single-entry update, so concurrent progress reports, polls and cleanup
/// never observe a half-written record.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: DashMap<JobId, JobRecord>,
}

impl JobRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a queued job at 0%. Returns `false` if `id` is already present.
    pub fn insert(&self, id: JobId, output_path: impl Into<PathBuf>) -> bool {
        match self.jobs.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(JobRecord {
                    status: JobStatus::Queued,
                    progress: 0,
                    download_url: None,
                    error: None,
                    output_path: output_path.into(),
                    expires_at: None,
                });
                true
            }
        }
    }

    /// Move a queued job to rendering.
    pub fn mark_rendering(&self, id: JobId) -> bool {
        self.update(id, |rec| {
            if rec.status == JobStatus::Queued {
                rec.status = JobStatus::Rendering;
            }
        })
    }

    /// Record an encoder progress fraction.
    ///
    /// The fraction is turned into a percentage capped at 99 and never lowers the stored value.
    /// Terminal jobs are left untouched. Returns the stored percentage.
    pub fn record_progress(&self, id: JobId, fraction: f64) -> Option<u8> {
        let mut rec = self.jobs.get_mut(&id)?;
        if !rec.status.is_terminal() {
            rec.status = JobStatus::Rendering;
            rec.progress = rec.progress.max(progress_percent(fraction));
        }
        Some(rec.progress)
    }

    /// Mark a job complete at 100% with its download location.
    pub fn complete(&self, id: JobId, download_url: String, expires_at: Instant) -> bool {
        self.update(id, |rec| {
            rec.status = JobStatus::Complete;
            rec.progress = 100;
            rec.download_url = Some(download_url);
            rec.expires_at = Some(expires_at);
        })
    }

    /// Mark a job failed with `reason`. Progress keeps its last value.
    pub fn fail(&self, id: JobId, reason: impl Into<String>, expires_at: Instant) -> bool {
        let reason = reason.into();
        self.update(id, |rec| {
            rec.status = JobStatus::Failed;
            rec.error = Some(reason);
            rec.expires_at = Some(expires_at);
        })
    }

    /// Current view of `id`, if it exists.
    pub fn snapshot(&self, id: JobId) -> Option<JobSnapshot> {
        self.jobs.get(&id).map(|rec| JobSnapshot {
            id,
            progress_percent: rec.progress,
            is_complete: rec.status == JobStatus::Complete,
            download_url: rec.download_url.clone(),
            status: rec.status,
            error: rec.error.clone(),
        })
    }

    /// Status and output location of `id`.
    pub fn output(&self, id: JobId) -> Option<(JobStatus, PathBuf)> {
        self.jobs
            .get(&id)
            .map(|rec| (rec.status, rec.output_path.clone()))
    }

    /// Drop the record for `id`, returning its output path. Missing ids are not an error.
    pub fn remove(&self, id: JobId) -> Option<PathBuf> {
        self.jobs.remove(&id).map(|(_, rec)| rec.output_path)
    }

    /// `true` when `id` has a retention deadline at or before `now`.
    pub fn is_expired(&self, id: JobId, now: Instant) -> bool {
        self.jobs
            .get(&id)
            .and_then(|rec| rec.expires_at)
            .is_some_and(|at| at <= now)
    }

    /// Ids whose retention deadline is at or before `now`.
    pub fn expired(&self, now: Instant) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|entry| entry.expires_at.is_some_and(|at| at <= now))
            .map(|entry| *entry.key())
            .collect()
    }

    /// Number of tracked jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// `true` when no jobs are tracked.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn update(&self, id: JobId, f: impl FnOnce(&mut JobRecord)) -> bool {
        match self.jobs.get_mut(&id) {
            Some(mut rec) => {
                f(&mut rec);
                true
            }
            None => false,
        }
    }
}

/// `round(fraction * 100)` clamped to `0..=99`; non-finite input counts as 0.
pub fn progress_percent(fraction: f64) -> u8 {
    if !fraction.is_finite() {
        return 0;
    }
    (fraction * 100.0)
        .round()
        .clamp(0.0, f64::from(MAX_IN_FLIGHT_PROGRESS)) as u8
}

/// Output file name for `id`.
pub fn output_file_name(id: JobId) -> String {
    format!("{id}.mp4")
}

/// Output path for `id` under `dir`.
pub fn output_path(dir: &Path, id: JobId) -> PathBuf {
    dir.join(output_file_name(id))
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/registry.rs"]
mod tests;
