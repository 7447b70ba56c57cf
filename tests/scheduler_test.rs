//! Scheduler behavior with a scripted runner.

mod common;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use chdforge::cancel::CancelController;
use chdforge::job::{jobs_from, Job, JobState};
use chdforge::pipeline::{JobOutput, JobRunner};
use chdforge::report::Reporter;
use chdforge::scheduler::{Scheduler, SchedulerOptions};
use chdforge::summary::RunSummary;
use chdforge_core::{Error, Result};
use chdforge_disc::Discovered;
use chdforge_tools::Workspace;

#[derive(Debug, Clone, Copy)]
enum Script {
    Succeed,
    Fail,
    /// Finish without writing, as if every artifact already existed.
    Existing,
    /// Trigger a soft cancel while running, then wait for the token.
    SoftCancel,
    /// Trigger a hard cancel while running, then wait for the token.
    HardCancel,
}

/// Runner that acquires a real workspace per job and follows a script.
struct ScriptedRunner {
    scripts: HashMap<usize, Script>,
    controller: Arc<CancelController>,
    workspace_root: PathBuf,
    acquired: Mutex<Vec<usize>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl ScriptedRunner {
    fn new(root: &Path, controller: Arc<CancelController>, scripts: &[(usize, Script)]) -> Self {
        Self {
            scripts: scripts.iter().copied().collect(),
            controller,
            workspace_root: root.to_path_buf(),
            acquired: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    async fn follow(&self, job: &Job, workspace: &Workspace, cancel: &CancellationToken) -> Result<JobOutput> {
        std::fs::write(workspace.file("partial.bin"), b"x")?;
        match self.scripts.get(&job.seq).copied().unwrap_or(Script::Succeed) {
            Script::Succeed => {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(JobOutput::Produced(job.outputs.clone()))
            }
            Script::Existing => Ok(JobOutput::Existing(job.outputs.clone())),
            Script::Fail => Err(Error::conversion(&job.outputs[0], "scripted failure")),
            Script::SoftCancel => {
                self.controller.cancel_soft();
                cancel.cancelled().await;
                Err(Error::Cancelled)
            }
            Script::HardCancel => {
                self.controller.cancel_hard();
                cancel.cancelled().await;
                Err(Error::Cancelled)
            }
        }
    }
}

#[async_trait]
impl JobRunner for ScriptedRunner {
    async fn run(&self, job: &Job, cancel: &CancellationToken) -> Result<JobOutput> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let workspace = Workspace::acquire(&self.workspace_root)?;
        self.acquired.lock().push(job.seq);

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        let result = self.follow(job, &workspace, cancel).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        workspace.release()?;
        result
    }
}

fn archive_jobs(out: &Path, n: usize) -> Vec<Job> {
    jobs_from(
        (1..=n)
            .map(|i| Discovered::Archive {
                path: PathBuf::from(format!("/in/{i}.7z")),
                output: out.join(format!("{i}.chd")),
            })
            .collect(),
    )
}

fn scheduler(
    runner: Arc<ScriptedRunner>,
    controller: Arc<CancelController>,
    options: SchedulerOptions,
) -> (Scheduler, Arc<RunSummary>) {
    let summary = Arc::new(RunSummary::new());
    let scheduler = Scheduler::new(runner, controller, summary.clone(), Reporter::new(true), options);
    (scheduler, summary)
}

fn states(jobs: &[Job]) -> Vec<JobState> {
    jobs.iter().map(Job::state).collect()
}

#[tokio::test]
async fn soft_cancel_only_stops_the_running_job() {
    let (_dir, root) = common::canonical_tempdir();
    let controller = Arc::new(CancelController::new(false));
    let runner = Arc::new(ScriptedRunner::new(
        &root,
        controller.clone(),
        &[(2, Script::Fail), (3, Script::SoftCancel)],
    ));
    let (scheduler, summary) = scheduler(runner.clone(), controller, SchedulerOptions::default());

    let jobs = scheduler.run(archive_jobs(&root, 5)).await;

    assert_eq!(
        states(&jobs),
        vec![
            JobState::Completed,
            JobState::Failed,
            JobState::Cancelled,
            JobState::Completed,
            JobState::Completed,
        ]
    );
    assert_eq!(*runner.acquired.lock(), vec![1, 2, 3, 4, 5]);
    assert!(common::leftover_workspaces(&root).is_empty());

    let snap = summary.snapshot();
    assert_eq!(snap.started, 5);
    assert_eq!(snap.completed, 3);
    assert_eq!(snap.failed, 1);
    assert_eq!(snap.cancelled, 1);
    assert!(!snap.all_succeeded());
}

#[tokio::test]
async fn hard_cancel_stops_intake() {
    let (_dir, root) = common::canonical_tempdir();
    let controller = Arc::new(CancelController::new(false));
    let runner = Arc::new(ScriptedRunner::new(&root, controller.clone(), &[(2, Script::HardCancel)]));
    let (scheduler, summary) = scheduler(runner.clone(), controller.clone(), SchedulerOptions::default());

    let jobs = scheduler.run(archive_jobs(&root, 4)).await;

    assert_eq!(
        states(&jobs),
        vec![
            JobState::Completed,
            JobState::Cancelled,
            JobState::Skipped,
            JobState::Skipped,
        ]
    );
    // No workspace was created after the cancel.
    assert_eq!(*runner.acquired.lock(), vec![1, 2]);
    assert!(common::leftover_workspaces(&root).is_empty());
    assert!(controller.is_hard_cancelled());
    assert_eq!(summary.snapshot().skipped, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_run_is_bounded_and_counts_exactly() {
    let (_dir, root) = common::canonical_tempdir();
    let controller = Arc::new(CancelController::new(false));
    let runner = Arc::new(ScriptedRunner::new(&root, controller.clone(), &[(4, Script::Fail)]));
    let options = SchedulerOptions {
        workers: 3,
        ..Default::default()
    };
    let (scheduler, summary) = scheduler(runner.clone(), controller, options);

    let jobs = scheduler.run(archive_jobs(&root, 12)).await;

    let seqs: Vec<usize> = jobs.iter().map(|j| j.seq).collect();
    assert_eq!(seqs, (1..=12).collect::<Vec<_>>());
    assert!(runner.max_running.load(Ordering::SeqCst) <= 3);

    let snap = summary.snapshot();
    assert_eq!(snap.started, 12);
    assert_eq!(snap.completed, 11);
    assert_eq!(snap.failed, 1);
    assert_matches!(jobs[3].state(), JobState::Failed);
    assert_matches!(jobs[3].error.as_deref(), Some(msg) if msg.contains("scripted failure"));
    assert!(common::leftover_workspaces(&root).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_hard_cancel_skips_the_rest() {
    let (_dir, root) = common::canonical_tempdir();
    let controller = Arc::new(CancelController::new(false));
    let runner = Arc::new(ScriptedRunner::new(&root, controller.clone(), &[(1, Script::HardCancel)]));
    let options = SchedulerOptions {
        workers: 2,
        ..Default::default()
    };
    let (scheduler, _summary) = scheduler(runner, controller, options);

    let jobs = scheduler.run(archive_jobs(&root, 8)).await;

    assert_matches!(jobs[0].state(), JobState::Cancelled);
    assert!(jobs.iter().all(|j| j.state().is_terminal()));
    // Only the job that was already picked by the second worker may have run.
    let ran = jobs
        .iter()
        .filter(|j| matches!(j.state(), JobState::Completed | JobState::Cancelled))
        .count();
    assert!(ran <= 2, "too many jobs ran after hard cancel: {ran}");
    assert!(common::leftover_workspaces(&root).is_empty());
}

#[tokio::test]
async fn skips_unsupported_existing_and_dry_run() {
    let (_dir, root) = common::canonical_tempdir();
    let controller = Arc::new(CancelController::new(false));
    let runner = Arc::new(ScriptedRunner::new(&root, controller.clone(), &[]));

    common::touch(&root.join("2.chd"), "old");
    let mut sources = vec![Discovered::Unsupported(root.join("notes.txt"))];
    sources.extend(archive_jobs(&root, 3).into_iter().map(|j| j.source));
    let jobs = jobs_from(sources);

    let (sched, summary) = scheduler(runner.clone(), controller.clone(), SchedulerOptions::default());
    let finished = sched.run(jobs.clone()).await;
    assert_eq!(
        states(&finished),
        vec![
            JobState::Skipped,
            JobState::Completed,
            JobState::Skipped,
            JobState::Completed,
        ]
    );
    assert_eq!(summary.snapshot().skipped, 2);

    let options = SchedulerOptions {
        dry_run: true,
        ..Default::default()
    };
    let before = runner.acquired.lock().len();
    let (sched, summary) = scheduler(runner.clone(), controller, options);
    let finished = sched.run(jobs).await;
    assert!(finished.iter().all(|j| j.state() == JobState::Skipped));
    assert!(summary.snapshot().all_succeeded());
    assert_eq!(runner.acquired.lock().len(), before);
}

#[tokio::test]
async fn running_job_with_existing_outputs_ends_skipped() {
    let (_dir, root) = common::canonical_tempdir();
    let controller = Arc::new(CancelController::new(false));
    let runner = Arc::new(ScriptedRunner::new(&root, controller.clone(), &[(1, Script::Existing)]));
    let (scheduler, summary) = scheduler(runner.clone(), controller, SchedulerOptions::default());

    let jobs = scheduler.run(archive_jobs(&root, 2)).await;

    assert_matches!(jobs[0].state(), JobState::Skipped);
    assert_eq!(jobs[0].outputs, vec![root.join("1.chd")]);
    assert_matches!(jobs[1].state(), JobState::Completed);
    assert_eq!(*runner.acquired.lock(), vec![1, 2]);

    let snap = summary.snapshot();
    assert_eq!((snap.started, snap.skipped, snap.completed), (2, 1, 1));
    assert!(!snap.all_succeeded());
    assert!(common::leftover_workspaces(&root).is_empty());
}

#[tokio::test]
async fn empty_queue_succeeds() {
    let (_dir, root) = common::canonical_tempdir();
    let controller = Arc::new(CancelController::new(false));
    let runner = Arc::new(ScriptedRunner::new(&root, controller.clone(), &[]));
    let (scheduler, summary) = scheduler(runner, controller, SchedulerOptions::default());

    assert!(scheduler.run(Vec::new()).await.is_empty());
    assert!(summary.snapshot().all_succeeded());
}
