use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::assets::upload::SourceFile;
use crate::config::ServiceConfig;
use crate::delivery::request::{RenderRequest, RequestLimits};
use crate::encode::sink::{EncoderFactory, ProgressFn};
use crate::foundation::clock::{Clock, SystemClock};
use crate::foundation::core::Canvas;
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::foundation::fs::{ensure_dir, remove_file_quiet};
use crate::jobs::reaper::{CleanupFn, CleanupHandle, CleanupScheduler};
use crate::jobs::registry::{
    JobId, JobRegistry, JobSnapshot, JobStatus, output_file_name, output_path,
};
use crate::render::pipeline::{PreparedRender, RenderStats, render_to_sink};

/// Finished job output, ready to hand to a client.
#[derive(Debug)]
pub struct JobOutput {
    /// Open handle to the encoded video.
    pub file: File,
    /// Suggested download name, `<id>.mp4`.
    pub file_name: String,
    /// Size in bytes.
    pub len: u64,
    /// Location on disk.
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
struct JobSettings {
    canvas: Canvas,
    output_dir: PathBuf,
    download_prefix: String,
    retention: Duration,
    channel_capacity: usize,
    limits: RequestLimits,
}

struct Inner {
    registry: Arc<JobRegistry>,
    encoder: Arc<dyn EncoderFactory>,
    clock: Arc<dyn Clock>,
    settings: JobSettings,
}

/// Asynchronous delivery: submit a render, poll its progress, download the result.
///
/// Every accepted job renders on its own thread into `<output_dir>/<id>.mp4`. Finished jobs,
/// complete or failed, are deleted together with their output once the retention window has
/// passed, whether or not anyone downloaded them.
pub struct JobService {
    inner: Arc<Inner>,
    reaper: CleanupScheduler,
}

impl JobService {
    /// Service on the system clock with a background cleanup thread.
    pub fn new(config: &ServiceConfig, encoder: Arc<dyn EncoderFactory>) -> KenBurnsResult<Self> {
        Self::build(config, encoder, Arc::new(SystemClock), true)
    }

    /// Service on `clock` without a background cleanup thread.
    ///
    /// Expired jobs are removed when they are polled or fetched, and by [`Self::reap_expired`].
    pub fn with_clock(
        config: &ServiceConfig,
        encoder: Arc<dyn EncoderFactory>,
        clock: Arc<dyn Clock>,
    ) -> KenBurnsResult<Self> {
        Self::build(config, encoder, clock, false)
    }

    fn build(
        config: &ServiceConfig,
        encoder: Arc<dyn EncoderFactory>,
        clock: Arc<dyn Clock>,
        background: bool,
    ) -> KenBurnsResult<Self> {
        config.validate()?;
        let registry = Arc::new(JobRegistry::new());
        let purge_registry = registry.clone();
        let action: CleanupFn = Arc::new(move |id: JobId| purge(&purge_registry, id));
        let reaper = if background {
            CleanupScheduler::start(clock.clone(), action)?
        } else {
            CleanupScheduler::manual(clock.clone(), action)
        };

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                encoder,
                clock,
                settings: JobSettings {
                    canvas: config.canvas,
                    output_dir: config.output_dir.clone(),
                    download_prefix: config.download_prefix.clone(),
                    retention: config.retention(),
                    channel_capacity: config.channel_capacity,
                    limits: config.limits(),
                },
            }),
            reaper,
        })
    }

    /// Validate and decode `request`, register a job at 0% and start rendering it.
    ///
    /// Invalid requests and undecodable images fail here and create no job.
    #[tracing::instrument(skip_all, fields(animation = %request.animation))]
    pub fn submit(&self, request: RenderRequest) -> KenBurnsResult<JobId> {
        let settings = &self.inner.settings;
        // Own the upload first so a rejected request still releases it.
        let source = SourceFile::for_request(&request);
        request.validate(&settings.limits)?;
        let prepared = PreparedRender::from_source(source, &request, settings.canvas)?;
        ensure_dir(&settings.output_dir)?;

        let id = JobId::new_v4();
        let out = output_path(&settings.output_dir, id);
        if !self.inner.registry.insert(id, &out) {
            return Err(KenBurnsError::Other(anyhow::anyhow!(
                "job id collision for {id}"
            )));
        }

        let inner = self.inner.clone();
        let cleanup = self.reaper.handle();
        let spawned = std::thread::Builder::new()
            .name(format!("kenburns-job-{id}"))
            .spawn(move || run_job(&inner, &cleanup, id, &out, &prepared));
        if let Err(e) = spawned {
            self.inner.registry.remove(id);
            return Err(KenBurnsError::Other(anyhow::anyhow!(
                "failed to spawn render thread: {e}"
            )));
        }

        tracing::info!(job_id = %id, "job accepted");
        Ok(id)
    }

    /// Current state of `id`. Unknown and expired ids yield `None`.
    pub fn poll(&self, id: JobId) -> Option<JobSnapshot> {
        self.expire_if_due(id);
        self.inner.registry.snapshot(id)
    }

    /// Open the output of a completed job.
    ///
    /// Jobs still rendering are [`KenBurnsError::NotReady`]; unknown, expired and failed jobs are
    /// [`KenBurnsError::NotFound`].
    pub fn fetch_output(&self, id: JobId) -> KenBurnsResult<JobOutput> {
        self.expire_if_due(id);
        let Some((status, path)) = self.inner.registry.output(id) else {
            return Err(KenBurnsError::not_found(format!("no job {id}")));
        };
        match status {
            JobStatus::Complete => {}
            JobStatus::Queued | JobStatus::Rendering => {
                return Err(KenBurnsError::not_ready(format!("job {id} is still {status}")));
            }
            JobStatus::Failed => {
                return Err(KenBurnsError::not_found(format!("job {id} failed, no output")));
            }
        }

        let file = File::open(&path).map_err(|e| {
            KenBurnsError::not_found(format!("output of job {id} is unavailable: {e}"))
        })?;
        let len = file
            .metadata()
            .map_err(|e| KenBurnsError::Other(anyhow::anyhow!("stat '{}': {e}", path.display())))?
            .len();
        Ok(JobOutput {
            file,
            file_name: output_file_name(id),
            len,
            path,
        })
    }

    /// Delete the record and output of `id` now. Returns `false` if it was already gone.
    pub fn remove(&self, id: JobId) -> bool {
        purge(&self.inner.registry, id)
    }

    /// Run every cleanup whose retention deadline has passed. Returns the number run.
    pub fn reap_expired(&self) -> usize {
        let scheduled = self.reaper.run_due();
        let now = self.inner.clock.now();
        let stragglers = self
            .inner
            .registry
            .expired(now)
            .into_iter()
            .filter(|id| purge(&self.inner.registry, *id))
            .count();
        tracing::debug!(
            scheduled,
            stragglers,
            pending = self.reaper.pending(),
            "reaped expired jobs"
        );
        scheduled + stragglers
    }

    /// Number of tracked jobs.
    pub fn job_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Download URL for `id`.
    pub fn download_url(&self, id: JobId) -> String {
        format!("{}{id}", self.inner.settings.download_prefix)
    }

    /// Directory job outputs are written to.
    pub fn output_dir(&self) -> &Path {
        &self.inner.settings.output_dir
    }

    fn expire_if_due(&self, id: JobId) {
        if self.inner.registry.is_expired(id, self.inner.clock.now()) {
            purge(&self.inner.registry, id);
        }
    }
}

/// Remove the record of `id` and its output file. Safe to call repeatedly.
fn purge(registry: &JobRegistry, id: JobId) -> bool {
    match registry.remove(id) {
        Some(path) => {
            remove_file_quiet(&path);
            tracing::debug!(job_id = %id, "job removed");
            true
        }
        None => false,
    }
}

/// Fails the job if the render thread unwinds before reaching a terminal state.
struct JobGuard<'a> {
    inner: &'a Inner,
    cleanup: &'a CleanupHandle,
    id: JobId,
    armed: bool,
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let expires = self.inner.clock.now() + self.inner.settings.retention;
            self.inner
                .registry
                .fail(self.id, "render thread terminated unexpectedly", expires);
            self.cleanup.schedule(self.id, expires);
        }
    }
}

fn run_job(
    inner: &Inner,
    cleanup: &CleanupHandle,
    id: JobId,
    out: &Path,
    prepared: &PreparedRender,
) {
    let mut guard = JobGuard {
        inner,
        cleanup,
        id,
        armed: true,
    };
    inner.registry.mark_rendering(id);

    let result = encode_job(inner, id, out, prepared);
    let expires = inner.clock.now() + inner.settings.retention;
    match result {
        Ok(stats) => {
            let url = format!("{}{id}", inner.settings.download_prefix);
            inner.registry.complete(id, url, expires);
            tracing::info!(job_id = %id, frames = stats.frames_encoded, "job complete");
        }
        Err(e) => {
            remove_file_quiet(out);
            inner.registry.fail(id, e.to_string(), expires);
            tracing::warn!(job_id = %id, error = %e, "job failed");
        }
    }
    cleanup.schedule(id, expires);
    guard.armed = false;
}

fn encode_job(
    inner: &Inner,
    id: JobId,
    out: &Path,
    prepared: &PreparedRender,
) -> KenBurnsResult<RenderStats> {
    let registry = inner.registry.clone();
    let on_progress: ProgressFn = Arc::new(move |fraction| {
        registry.record_progress(id, fraction);
    });
    let mut sink = inner.encoder.file_sink(out, on_progress)?;
    render_to_sink(prepared, sink.as_mut(), inner.settings.channel_capacity)
}
