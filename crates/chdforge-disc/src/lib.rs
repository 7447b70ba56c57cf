//! # chdforge-disc
//!
//! Finds convertible discs among user-supplied paths.
//!
//! - **Classification** ([`classify`]) -- tag a path as raw image, cue/gdi
//!   sheet, archive, directory or unsupported, by extension.
//! - **Sheet parsing** ([`sheet`]) -- collect the data files a cue or gdi
//!   sheet references.
//! - **Resolution** ([`resolve`]) -- group the files of a directory (or an
//!   extracted archive) into [`DiscSet`]s.
//! - **Discovery** ([`discover()`]) -- walk the inputs and produce the
//!   ordered candidate list that becomes the job queue.

pub mod classify;
pub mod discover;
pub mod model;
pub mod resolve;
pub mod sheet;

pub use classify::{classify, classify_name, supported_formats, PathKind, SheetKind};
pub use discover::{discover, list_files, DiscoverOptions, Discovered};
pub use model::{DiscKind, DiscSet, DiscSource, OutputPlan, OUTPUT_EXTENSION};
pub use resolve::{resolve_extracted, resolve_scope, ScopeResolution};
