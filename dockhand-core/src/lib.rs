//! Dockhand Core
//!
//! Core types for the Dockhand image publishing pipeline.
//!
//! This crate contains:
//! - Domain types: triggers, workflow definitions, image tags, run records
//! - Error taxonomy shared by the runner and the CLI

pub mod domain;
pub mod error;
