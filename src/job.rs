//! Job records and their state machine.

use std::fmt;
use std::path::{Path, PathBuf};

use chdforge_disc::Discovered;

/// Lifecycle state of a job.
///
/// `Queued -> Running -> {Completed, Failed, Skipped, Cancelled}` and
/// `Queued -> Skipped`. A running job is skipped when it finds every
/// artifact already in place. Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Queued | JobState::Running)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Skipped)
                | (Running, Skipped)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    /// Word used in job lines. Entering `Running` is reported as "Started".
    pub fn label(self) -> &'static str {
        match self {
            JobState::Queued => "Queued",
            JobState::Running => "Started",
            JobState::Completed => "Completed",
            JobState::Failed => "Failed",
            JobState::Skipped => "Skipped",
            JobState::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("job {seq}: invalid transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub seq: usize,
    pub from: JobState,
    pub to: JobState,
}

/// Execution wrapper around one discovered candidate.
#[derive(Debug, Clone)]
pub struct Job {
    /// 1-based position in discovery order.
    pub seq: usize,
    pub source: Discovered,
    state: JobState,
    /// Artifact paths. Before running this is the natural output; after
    /// completion it holds what was actually produced.
    pub outputs: Vec<PathBuf>,
    /// Failure message, for failed jobs.
    pub error: Option<String>,
}

impl Job {
    pub fn new(seq: usize, source: Discovered) -> Self {
        let outputs = match &source {
            Discovered::Disc(disc) => vec![disc.output.clone()],
            Discovered::Archive { output, .. } => vec![output.clone()],
            Discovered::Unsupported(_) => Vec::new(),
        };
        Self {
            seq,
            source,
            state: JobState::Queued,
            outputs,
            error: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// The input path the job was created for.
    pub fn input(&self) -> &Path {
        self.source.input()
    }

    pub fn is_archive(&self) -> bool {
        matches!(self.source, Discovered::Archive { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self.source, Discovered::Unsupported(_))
    }

    /// Move to `next`, rejecting transitions the state machine forbids.
    pub fn transition(&mut self, next: JobState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                seq: self.seq,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Number discovered candidates into queued jobs, starting at 1.
pub fn jobs_from(discovered: Vec<Discovered>) -> Vec<Job> {
    discovered
        .into_iter()
        .enumerate()
        .map(|(index, source)| Job::new(index + 1, source))
        .collect()
}
