//! chdforge - convert disc images, cue/gdi sheets and archives to CHD.
//!
//! The binary is a thin shell around this library: [`settings`] merges the
//! configuration file with the command line, [`run`] discovers the jobs and
//! hands them to the [`scheduler`], which drives each one through the
//! [`pipeline`] under the control of [`cancel`].

pub mod cancel;
pub mod cli;
pub mod job;
pub mod pipeline;
pub mod report;
pub mod run;
pub mod scheduler;
pub mod settings;
pub mod summary;
