//! Dockhand Lua Infrastructure
//!
//! Workflow definitions are Lua files evaluated in a restricted sandbox.
//! This crate provides:
//! - The sandbox and its `workflow` helper module
//! - Workflow parsing and validation
//! - The built-in default workflow

pub mod default;
pub mod parser;
pub mod sandbox;

pub use default::{DEFAULT_IMAGE_TAG, default_workflow, render_default_workflow};
pub use parser::{load_workflow_file, parse_workflow};
pub use sandbox::create_sandbox;

pub use dockhand_core::domain::workflow::WorkflowDefinition;
