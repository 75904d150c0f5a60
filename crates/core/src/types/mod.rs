//! Core types for Jenkins Relay.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod job;
pub mod params;

pub use id::*;
pub use job::{JobPath, JobPathError};
pub use params::{BuildParameters, ParameterDefinition, ParameterError, ParameterKind};
