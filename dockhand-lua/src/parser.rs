//! Workflow definition parser
//!
//! Evaluates a Lua workflow definition in the sandbox, converts the returned
//! table into a [`WorkflowDefinition`] and validates it.

use anyhow::{Context, Result};
use dockhand_core::domain::trigger::{TriggerFilter, branch_name};
use dockhand_core::domain::workflow::{
    ActionRef, InputValue, StepDefinition, WorkflowDefinition,
};
use mlua::{Table, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::sandbox::{SECRET_MARKER, create_sandbox};

/// Parse a workflow definition from Lua source code
///
/// # Errors
/// Returns an error if:
/// - The Lua source is invalid or does not return a table
/// - Required fields are missing (name, on, steps)
/// - A step uses an unknown action or has malformed inputs
/// - The resulting definition fails validation
///
/// # Example
/// ```no_run
/// use dockhand_lua::parse_workflow;
///
/// let source = r#"
///     return workflow.define({
///         name = "Publish image",
///         on = { push = { branches = { "main" } }, manual = true },
///         steps = {
///             { name = "Checkout", uses = "checkout" },
///             { name = "Build and push", uses = "build-push",
///               with = { tags = "acme/app:latest" } },
///         },
///     })
/// "#;
///
/// let workflow = parse_workflow(source)?;
/// assert_eq!(workflow.steps.len(), 2);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn parse_workflow(source: &str) -> Result<WorkflowDefinition> {
    let lua = create_sandbox().context("Failed to create workflow sandbox")?;

    let definition: Table = lua
        .load(source)
        .set_name("workflow")
        .eval()
        .context("Failed to evaluate workflow definition")?;

    let name: String = definition
        .get("name")
        .context("Workflow must have a 'name' field")?;

    let description: Option<String> = definition
        .get("description")
        .context("Field 'description' must be a string")?;

    let triggers = parse_triggers(&definition)?;
    let steps = parse_steps(&definition)?;

    let workflow = WorkflowDefinition {
        name,
        description,
        triggers,
        steps,
    };

    workflow.validate().context("Invalid workflow definition")?;

    Ok(workflow)
}

/// Read and parse a workflow file
pub fn load_workflow_file(path: &Path) -> Result<WorkflowDefinition> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow file {}", path.display()))?;

    parse_workflow(&source).with_context(|| format!("Failed to load workflow {}", path.display()))
}

/// Parse the 'on' table
fn parse_triggers(definition: &Table) -> Result<TriggerFilter> {
    let on: Table = definition
        .get("on")
        .context("Workflow must have an 'on' table")?;

    let push_branches = match on.get::<Value>("push")? {
        Value::Nil => Vec::new(),
        Value::Table(push) => {
            // Either { branches = {...} } or a plain list of branches
            let branches = match push.get::<Value>("branches")? {
                Value::Table(branches) => branches,
                Value::Nil => push,
                _ => anyhow::bail!("Field 'on.push.branches' must be an array of strings"),
            };
            let branches =
                string_list(&branches).context("Failed to read 'on.push' branches")?;
            branches
                .iter()
                .map(|b| {
                    branch_name(b)
                        .map(str::to_string)
                        .with_context(|| format!("Push trigger '{}' is not a branch", b))
                })
                .collect::<Result<Vec<_>>>()?
        }
        _ => anyhow::bail!("Field 'on.push' must be a table"),
    };

    let manual: Option<bool> = on
        .get("manual")
        .context("Field 'on.manual' must be a boolean")?;

    Ok(TriggerFilter {
        push_branches,
        manual: manual.unwrap_or(false),
    })
}

/// Parse the 'steps' array
fn parse_steps(definition: &Table) -> Result<Vec<StepDefinition>> {
    let steps_table: Table = definition
        .get("steps")
        .context("Workflow must have a 'steps' field")?;

    let mut steps = Vec::new();

    for (idx, entry) in steps_table.sequence_values::<Table>().enumerate() {
        let step_table = entry.context("Failed to read step entry")?;

        let name: String = step_table
            .get("name")
            .with_context(|| format!("Step {} must have a 'name' field", idx + 1))?;

        let uses: String = step_table
            .get("uses")
            .with_context(|| format!("Step '{}' must have a 'uses' field", name))?;

        let action: ActionRef = uses
            .parse()
            .with_context(|| format!("Step '{}' has an invalid 'uses' field", name))?;

        let inputs = match step_table.get::<Value>("with")? {
            Value::Nil => BTreeMap::new(),
            Value::Table(with) => parse_inputs(&with)
                .with_context(|| format!("Step '{}' has invalid inputs", name))?,
            _ => anyhow::bail!("Field 'with' of step '{}' must be a table", name),
        };

        steps.push(StepDefinition {
            name,
            action,
            inputs,
        });
    }

    Ok(steps)
}

/// Parse a step's 'with' table
///
/// Strings, numbers and booleans become literals, string arrays are joined
/// with commas, and `workflow.secret(..)` tables become secret references.
fn parse_inputs(with: &Table) -> Result<BTreeMap<String, InputValue>> {
    let mut inputs = BTreeMap::new();

    for pair in with.pairs::<String, Value>() {
        let (key, value) = pair.context("Input keys must be strings")?;

        let input = match value {
            Value::String(s) => InputValue::Literal(s.to_string_lossy()),
            Value::Boolean(b) => InputValue::Literal(b.to_string()),
            Value::Integer(i) => InputValue::Literal(i.to_string()),
            Value::Number(n) => InputValue::Literal(n.to_string()),
            Value::Table(table) => match table.get::<Option<String>>(SECRET_MARKER)? {
                Some(secret) => InputValue::Secret(secret),
                None => InputValue::Literal(
                    string_list(&table)
                        .with_context(|| format!("Input '{}' must be a list of strings", key))?
                        .join(","),
                ),
            },
            other => anyhow::bail!(
                "Input '{}' has unsupported type '{}'",
                key,
                other.type_name()
            ),
        };

        inputs.insert(key, input);
    }

    Ok(inputs)
}

fn string_list(table: &Table) -> Result<Vec<String>> {
    let mut values = Vec::new();
    for value in table.sequence_values::<String>() {
        values.push(value.context("Expected a string")?);
    }
    Ok(values)
}
