//! # chdforge-tools
//!
//! External tool orchestration for chdforge.
//!
//! - [`ToolRegistry`] -- resolve `chdman` and `7z` before any job runs.
//! - [`ToolCommand`] -- run a tool with a [`StdioPolicy`], killing it when
//!   the job's cancellation token fires.
//! - [`Workspace`] -- hidden per-job temporary directory, removed on every
//!   exit path.
//! - [`Extractor`] -- unpack archives into a workspace.
//! - [`Converter`] -- run chdman on a disc set and move the artifact into
//!   place.

pub mod archive;
pub mod chdman;
pub mod command;
pub mod tools;
pub mod workspace;

pub use archive::Extractor;
pub use chdman::{select_format, Converter, DiscFormat};
pub use command::{StdioPolicy, ToolCommand, ToolOutput};
pub use tools::{ToolEntry, ToolInfo, ToolRegistry, CHDMAN, SEVENZIP};
pub use workspace::{move_file, Workspace, WORKSPACE_PREFIX};
