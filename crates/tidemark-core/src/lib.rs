//! Tidemark Core - shared types for rendering and reconciling manifests
//!
//! This crate provides the foundational types used throughout Tidemark:
//! - `Document`: A generic, ordered manifest object with typed path access
//! - `Gvk` / `ObjectReference`: Resource identity
//! - `Values`: Configuration values with deep merge support
//! - `Project`: The on-disk project definition (`tidemark.yaml`)
//! - `RenderContext`: Data handed to templates
//! - `RenderedManifest`: One rendered template and its source name

pub mod context;
pub mod document;
pub mod error;
pub mod manifest;
pub mod project;
pub mod values;

pub use context::{ProjectInfo, RenderContext};
pub use document::{Document, Gvk, ObjectReference, type_name};
pub use error::{CoreError, Result};
pub use manifest::RenderedManifest;
pub use project::{ConditionalValues, LoadedProject, Project};
pub use values::{Values, parse_set_values};
