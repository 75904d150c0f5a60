//! Jenkins Relay Core - Shared types library.
//!
//! This crate provides the types shared by the relay components:
//! - `relay` - HTTP service that bridges Mattermost slash commands to Jenkins
//! - `cli` - Command-line tools for migrations, key generation and debugging
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for user/channel IDs, queue IDs, job paths
//!   and build parameters
//! - [`job_ref`] - Parser for the `<job> [build]` argument grammar

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod job_ref;
pub mod types;

pub use job_ref::{JobReference, parse_build_parameters, parse_job_reference};
pub use types::*;
