//! Job scheduling: one worker for sequential mode, a bounded pool of
//! workers for parallel mode.
//!
//! Workers pull jobs from a shared queue that is fixed before the first
//! job starts; each job is taken by exactly one worker. Every transition
//! is reported and counted in the shared [`RunSummary`].

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cancel::CancelController;
use crate::job::{Job, JobState};
use crate::pipeline::{JobOutput, JobRunner};
use crate::report::Reporter;
use crate::summary::RunSummary;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// Concurrent jobs; 1 runs strictly in order.
    pub workers: usize,
    /// Report every job as skipped without running anything.
    pub dry_run: bool,
    /// Skip jobs whose output already exists.
    pub skip_existing: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            dry_run: false,
            skip_existing: true,
        }
    }
}

#[derive(Clone)]
pub struct Scheduler {
    runner: Arc<dyn JobRunner>,
    cancel: Arc<CancelController>,
    summary: Arc<RunSummary>,
    reporter: Reporter,
    options: SchedulerOptions,
}

type Queue = Arc<Mutex<VecDeque<Job>>>;

impl Scheduler {
    pub fn new(
        runner: Arc<dyn JobRunner>,
        cancel: Arc<CancelController>,
        summary: Arc<RunSummary>,
        reporter: Reporter,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            runner,
            cancel,
            summary,
            reporter,
            options,
        }
    }

    /// Run every job to a terminal state and return them in sequence order.
    pub async fn run(&self, jobs: Vec<Job>) -> Vec<Job> {
        let total = jobs.len();
        let queue: Queue = Arc::new(Mutex::new(jobs.into()));
        let finished = Arc::new(Mutex::new(Vec::with_capacity(total)));
        let workers = self.options.workers.max(1).min(total.max(1));

        if workers == 1 {
            self.clone().worker(0, queue, finished.clone()).await;
        } else {
            tracing::debug!("Starting {workers} workers for {total} jobs");
            let handles: Vec<_> = (0..workers)
                .map(|id| tokio::spawn(self.clone().worker(id, queue.clone(), finished.clone())))
                .collect();
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::error!("Worker task failed: {e}");
                }
            }
        }

        let mut jobs = std::mem::take(&mut *finished.lock());
        jobs.sort_by_key(|job| job.seq);
        jobs
    }

    async fn worker(self, id: usize, queue: Queue, finished: Arc<Mutex<Vec<Job>>>) {
        loop {
            let Some(job) = queue.lock().pop_front() else {
                break;
            };
            tracing::trace!(worker = id, job = job.seq, "Picked job");
            let job = self.process(job).await;
            finished.lock().push(job);
        }
    }

    async fn process(&self, mut job: Job) -> Job {
        if let Some(reason) = self.skip_reason(&job) {
            tracing::debug!(job = job.seq, "Skipping {}: {reason}", job.input().display());
            self.enter(&mut job, JobState::Skipped, None);
            return job;
        }

        let cancel = self.cancel.job_token();
        self.enter(&mut job, JobState::Running, None);

        match self.runner.run(&job, &cancel).await {
            Ok(JobOutput::Produced(outputs)) => {
                job.outputs = outputs;
                self.enter(&mut job, JobState::Completed, None);
            }
            Ok(JobOutput::Existing(outputs)) => {
                tracing::debug!(job = job.seq, "Skipping {}: output exists", job.input().display());
                job.outputs = outputs;
                self.enter(&mut job, JobState::Skipped, None);
            }
            Err(e) if e.is_cancelled() => {
                self.enter(&mut job, JobState::Cancelled, None);
            }
            Err(e) => {
                tracing::error!(job = job.seq, "{e}");
                let failed = e.failed_path().map(Path::to_path_buf);
                job.error = Some(e.to_string());
                self.enter(&mut job, JobState::Failed, failed.as_deref());
            }
        }
        job
    }

    fn skip_reason(&self, job: &Job) -> Option<&'static str> {
        if job.is_unsupported() {
            Some("unsupported input")
        } else if self.cancel.is_hard_cancelled() {
            Some("run was cancelled")
        } else if self.options.dry_run {
            Some("dry run")
        } else if self.options.skip_existing
            && !job.outputs.is_empty()
            && job.outputs.iter().all(|output| output.exists())
        {
            Some("output exists")
        } else {
            None
        }
    }

    /// Apply a transition, then report and count it.
    fn enter(&self, job: &mut Job, state: JobState, path: Option<&Path>) {
        if let Err(e) = job.transition(state) {
            tracing::error!("{e}");
            return;
        }
        self.summary.record(state);

        match state {
            JobState::Completed if !job.outputs.is_empty() => {
                for output in &job.outputs {
                    self.reporter.job(job.seq, state.label(), output);
                }
            }
            _ => {
                let path = path.unwrap_or_else(|| job.input());
                self.reporter.job(job.seq, state.label(), path);
            }
        }
    }
}
