//! Lua sandbox creation
//!
//! Workflow definitions only describe data, so the sandbox loads nothing but
//! the table, string and math libraries. No I/O, no OS access, no loading of
//! external code.

use mlua::{Lua, LuaOptions, Result as LuaResult, StdLib, Table};

/// Key marking a table as a secret reference
pub const SECRET_MARKER: &str = "__secret";

/// Create a restricted Lua sandbox with the `workflow` module registered
///
/// # Example
/// ```no_run
/// use dockhand_lua::sandbox::create_sandbox;
///
/// let lua = create_sandbox()?;
/// let definition: mlua::Table = lua
///     .load(r#"return workflow.define({ name = "publish" })"#)
///     .eval()?;
/// let name: String = definition.get("name")?;
/// assert_eq!(name, "publish");
/// # Ok::<(), mlua::Error>(())
/// ```
pub fn create_sandbox() -> LuaResult<Lua> {
    let lua = Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH,
        LuaOptions::default(),
    )?;

    let globals = lua.globals();
    for name in ["require", "dofile", "loadfile", "load", "collectgarbage"] {
        globals.set(name, mlua::Nil)?;
    }

    register_workflow_module(&lua)?;

    Ok(lua)
}

/// Register the `workflow` helper module
///
/// - `workflow.define(t)` and `workflow.step(t)` return their argument as-is
/// - `workflow.secret(name)` returns a secret reference resolved at run time
fn register_workflow_module(lua: &Lua) -> LuaResult<()> {
    let workflow = lua.create_table()?;

    workflow.set(
        "define",
        lua.create_function(|_, definition: Table| Ok(definition))?,
    )?;

    workflow.set("step", lua.create_function(|_, step: Table| Ok(step))?)?;

    workflow.set(
        "secret",
        lua.create_function(|lua, name: String| {
            if name.trim().is_empty() {
                return Err(mlua::Error::RuntimeError(
                    "workflow.secret requires a non-empty name".to_string(),
                ));
            }
            let reference = lua.create_table()?;
            reference.set(SECRET_MARKER, name)?;
            Ok(reference)
        })?,
    )?;

    lua.globals().set("workflow", workflow)?;

    Ok(())
}
