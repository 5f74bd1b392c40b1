//! Side-effect scripts and the engines that compile them
//!
//! A rule's third field attaches a script to its fork. The script runs
//! after every stab, sees the step result, and may redirect the
//! interpreter. Engines are registered on the trap and selected by the
//! descriptor's file extension, case-insensitive.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::TrapError;
use crate::fork::ForkResult;
use crate::value::Value;

/// What a script wants the interpreter to do next.
///
/// `NoOverride` keeps the delta computed from the fork's own jump
/// table. `Jump` resolves through the program's name map; an unknown
/// target aborts the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptVerdict {
    /// Keep the fork's computed delta.
    NoOverride,
    /// Replace the delta with a literal signed offset.
    Offset(i64),
    /// Jump to the named rule.
    Jump(String),
}

/// Script execution failure. Aborts the flow for the current subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    /// What went wrong.
    pub detail: String,
}

impl ScriptError {
    /// Build from anything displayable.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.detail)
    }
}

impl std::error::Error for ScriptError {}

/// A compiled side-effect script.
///
/// Runs once per stab of its fork, whatever the step result was. The
/// default no-descriptor behavior (publish the scoped value under the
/// fork's name) is built into the interpreter and does not go through
/// this trait.
pub trait ForkScript: Send + Sync + Debug {
    /// Execute against one step.
    ///
    /// `fork` is the rule name, `result` the step classification,
    /// `subject` the object being flowed, `scoped` the extracted value
    /// (null when extraction failed).
    fn exec(
        &self,
        fork: &str,
        result: ForkResult,
        subject: &Value,
        scoped: &Value,
    ) -> Result<ScriptVerdict, ScriptError>;
}

/// A named compiler/executor for one script language.
///
/// Registered on the trap under its extension; rules select it with a
/// descriptor like `watch.lua`. Engines also receive environment
/// publications from assign-scope rules.
pub trait ScriptEngine: Send + Sync + Debug {
    /// Compile a descriptor into an executable script.
    ///
    /// `rule` names the rule the script belongs to, for diagnostics.
    fn compile(&self, rule: &str, descriptor: &str) -> Result<Arc<dyn ForkScript>, TrapError>;

    /// Receive values published by assign-scope rules.
    ///
    /// Called on MATCH with the fork's name mapped to its scoped value.
    fn prepare_env(&self, env: &HashMap<String, Value>);
}
