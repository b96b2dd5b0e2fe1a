//! Built-in default workflow
//!
//! The canonical publish workflow: on push to main or manual dispatch, check
//! out, log in, set up the builder, then build and push under one fixed tag.

use anyhow::Result;
use dockhand_core::domain::image::ImageTag;
use dockhand_core::domain::workflow::WorkflowDefinition;

use crate::parser::parse_workflow;

/// Tag used when no workflow file is given and no tag is configured
pub const DEFAULT_IMAGE_TAG: &str = "example/app:latest";

const TAG_PLACEHOLDER: &str = "@IMAGE_TAG@";

const TEMPLATE: &str = r#"-- Dockhand workflow
--
-- Runs on push to main or on manual dispatch. Steps run in order and the
-- run stops at the first failure. Secrets are read from the environment at
-- run time and never written to logs.

local secret = workflow.secret

return workflow.define({
    name = "Publish image",
    description = "Build the repository image and push it under a fixed tag",

    on = {
        push = { branches = { "main" } },
        manual = true,
    },

    steps = {
        { name = "Checkout", uses = "checkout" },
        {
            name = "Log in to registry",
            uses = "registry-login",
            with = {
                username = secret("REGISTRY_USERNAME"),
                password = secret("REGISTRY_TOKEN"),
            },
        },
        { name = "Set up builder", uses = "setup-builder" },
        {
            name = "Build and push",
            uses = "build-push",
            with = {
                context = ".",
                file = "Dockerfile",
                push = true,
                tags = "@IMAGE_TAG@",
            },
        },
    },
})
"#;

/// Render the default workflow source with the given fixed tag
pub fn render_default_workflow(tag: &ImageTag) -> String {
    TEMPLATE.replace(TAG_PLACEHOLDER, &tag.to_string())
}

/// Parse the default workflow for the given tag
pub fn default_workflow(tag: &ImageTag) -> Result<WorkflowDefinition> {
    parse_workflow(&render_default_workflow(tag))
}
