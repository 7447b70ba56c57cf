//! Human-readable job lines and run statistics on stdout.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::summary::SummarySnapshot;

/// Width that the job number and state label are padded to together.
const LINE_PAD: usize = 12;

/// Prints one line per job transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    /// Print file names instead of full paths.
    names: bool,
}

impl Reporter {
    pub fn new(names: bool) -> Self {
        Self { names }
    }

    /// `Job <n> <label>:<TAB><path>`, with the label right-aligned so the
    /// colons line up for job numbers of different widths.
    pub fn format_line(&self, seq: usize, label: &str, path: &Path) -> String {
        let width = LINE_PAD.saturating_sub(seq.to_string().len());
        let shown = if self.names {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        } else {
            path.display().to_string()
        };
        format!("Job {seq} {label:>width$}:\t{shown}")
    }

    pub fn job(&self, seq: usize, label: &str, path: &Path) {
        let mut stdout = std::io::stdout().lock();
        // A closed stdout must not abort the run.
        let _ = writeln!(stdout, "{}", self.format_line(seq, label, path));
        let _ = stdout.flush();
    }
}

pub fn print_queue_size(jobs: usize) {
    println!("Files in queue: {jobs}");
}

pub fn print_stats(snapshot: &SummarySnapshot, elapsed: Duration) {
    println!("Started: {}", snapshot.started);
    println!("Skipped: {}", snapshot.skipped);
    println!("Failed: {}", snapshot.failed);
    println!("Cancelled: {}", snapshot.cancelled);
    println!("Completed: {}", snapshot.completed);
    println!("Elapsed time: {}", format_elapsed(elapsed));
}

/// `H:MM:SS`, truncated to whole seconds.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
