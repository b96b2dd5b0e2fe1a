//! Core domain types
//!
//! These types are shared between the definition parser (dockhand-lua),
//! the runner (execution) and the CLI (reporting).

pub mod image;
pub mod log;
pub mod run;
pub mod secret;
pub mod trigger;
pub mod workflow;
