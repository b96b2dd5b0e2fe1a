//! Init command handler
//!
//! Writes the default workflow definition with the configured tag.

use anyhow::{Context, Result};
use colored::*;
use dockhand_lua::{parse_workflow, render_default_workflow};
use std::fs;
use std::path::Path;

use crate::config::Config;

pub fn handle_init_command(output: &Path, force: bool, config: &Config) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    let source = render_default_workflow(&config.image_tag()?);
    parse_workflow(&source).context("Generated workflow failed validation")?;

    fs::write(output, source)
        .with_context(|| format!("Failed to write workflow to {}", output.display()))?;

    println!("  {} {}", "Created".green(), output.display());
    println!();
    println!("{}", "Next steps:".bold());
    println!("  1. Set REGISTRY_USERNAME and REGISTRY_TOKEN in the environment");
    println!(
        "  2. Check the plan with {}",
        "dockhand plan --event push --ref refs/heads/main".cyan()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(tag: &str) -> Config {
        Config {
            workflow: None,
            tag: tag.to_string(),
        }
    }

    fn temp_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("dockhand-init-{}.lua", std::process::id()))
    }

    #[test]
    fn test_init_writes_valid_workflow_and_refuses_overwrite() {
        let path = temp_path();
        let _ = fs::remove_file(&path);

        handle_init_command(&path, false, &config("acme/contours:latest")).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        let workflow = parse_workflow(&written).unwrap();
        assert_eq!(
            workflow.image_tag().unwrap().to_string(),
            "acme/contours:latest"
        );

        assert!(handle_init_command(&path, false, &config("acme/contours:latest")).is_err());
        assert!(handle_init_command(&path, true, &config("acme/other:v1")).is_ok());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_init_rejects_bad_tag() {
        let path = std::env::temp_dir().join("dockhand-init-bad-tag.lua");
        let _ = fs::remove_file(&path);
        assert!(handle_init_command(&path, false, &config("Not A Tag")).is_err());
        assert!(!path.exists());
    }
}
