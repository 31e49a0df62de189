// src/config/mod.rs

//! Declarative pipeline files.
//!
//! - [`model`] holds the serde types for the TOML format.
//! - [`loader`] reads files from disk.
//! - [`validate`] checks file-level shape and turns a [`RawPipelineFile`]
//!   into a [`PipelineFile`]; graph-level checks (cycles, placeholders) are
//!   left to [`Workflow::validate`](crate::dag::Workflow::validate).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_pipeline_path, load_and_validate, load_from_path};
pub use model::{PipelineFile, ProcessConfig, RawPipelineFile, WorkflowSection};
