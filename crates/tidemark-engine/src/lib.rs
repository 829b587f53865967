//! Tidemark Engine - Jinja2 templating for Kubernetes manifests
//!
//! This crate provides:
//! - A MiniJinja-based template engine with Kubernetes-oriented filters
//! - Render context assembly (base values, conditional values, overlays)
//! - Lazy, per-template project rendering
//! - `Predicate`: `[!]<template>=<regex>` object filters

pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;
pub mod predicate;

pub use engine::{Engine, EngineBuilder, ProjectRender};
pub use error::{EngineError, PredicateError, Result, TemplateError, TemplateErrorKind};
pub use predicate::Predicate;
