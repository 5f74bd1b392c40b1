//! snare - rule-driven runtime object inspection
//!
//! A trap engine that compiles a small declarative rule language into
//! a linear program of forks (scope + predicate + jump deltas) and
//! executes it against object graphs at runtime.
//!
//! # Architecture
//!
//! The type system uses a hybrid erasure approach:
//!
//! - [`Value`] — Erased data type (scalars + extensible Object variant)
//! - [`TrapObject`] — Subject-side reflection seam (class name, members)
//! - [`Scope`] — Compiled extraction path, returns a `Value`
//! - [`Hook`] — Type-specialized predicate over extracted values
//! - [`Fork`] — One instruction: scope + optional hook + jump deltas
//! - [`Program`] — Compiled instruction list with first-match-wins flow
//! - [`Trap`] — The engine: compiles rule sets, hot-swaps programs
//!
//! # Key Design Insights
//!
//! 1. **Type erasure at data level**: `Value` keeps hooks non-generic
//!    and shareable across programs.
//!
//! 2. **Extraction error is not a no-match**: a scope failure
//!    classifies the step as ERROR, which jumps like a no-match but is
//!    reported distinctly. Hooks only ever see successfully extracted
//!    values.
//!
//! 3. **Atomic program swap**: `update` builds everything into locals
//!    and publishes one `Arc`; concurrent `flow` calls never observe a
//!    partial program.
//!
//! # Example
//!
//! ```
//! use std::any::Any;
//! use std::sync::Arc;
//! use snare::prelude::*;
//!
//! // A subject type
//! #[derive(Debug)]
//! struct Request { latency_ms: i32 }
//!
//! impl TrapObject for Request {
//!     fn class_name(&self) -> &str { "web.Request" }
//!     fn field(&self, name: &str) -> Result<Value, AccessError> {
//!         match name {
//!             "latency_ms" => Ok(Value::Int(self.latency_ms)),
//!             _ => Err(AccessError {
//!                 member: name.into(),
//!                 class: "web.Request".into(),
//!                 detail: "no such field".into(),
//!             }),
//!         }
//!     }
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//!
//! // Schema for rule compilation
//! let mut dict = ClassDict::new();
//! dict.register(
//!     ClassSpec::new("web.Request")
//!         .with_field("latency_ms", TypeRef::Kind(ValueKind::Int)),
//! ).unwrap();
//!
//! // Compile a rule set and flow a subject through it
//! let trap = Trap::new(TypeRef::Class("web.Request".into()), Arc::new(dict));
//! let mut rules = RuleSet::new();
//! rules.insert("Slow", "@latency_ms:>500");
//! trap.update(&rules).unwrap();
//!
//! let subject = Value::Object(Arc::new(Request { latency_ms: 900 }));
//! let mut hits = Vec::new();
//! trap.flow(&subject, |_, fork| hits.push(fork.name().to_string()));
//! assert_eq!(hits, ["Slow"]);
//! ```
//!
//! # Rule grammar
//!
//! ```text
//! [Group$]RuleName = ScopePath [':' HookCondition [':' ScriptDescriptor]]
//! ```
//!
//! See [`Scope`] for the path grammar and [`Hook`] for conditions.
//! Rules sharing a `Group$` prefix form an OR-chain: members are tried
//! in order, the first match is terminal.

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod class_dict;
mod config;
mod error;
mod fork;
mod hook;
mod program;
mod reload;
mod scope;
mod script;
mod trap;
mod value;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Core types
pub use class_dict::{ClassDict, ClassSpec, TypeRef};
pub use config::{split_rule_text, RuleKey, RuleSet, RuleText};
pub use fork::{Fork, ForkResult, StepRec};
pub use hook::{Hook, HookOp};
pub use program::{Program, UpdatePolicy};
pub use reload::ConfigWatcher;
pub use scope::{EvalContext, Scope, ScopeCache};
pub use script::{ForkScript, ScriptEngine, ScriptError, ScriptVerdict};
pub use trap::Trap;
pub use value::{AccessError, TrapObject, Value, ValueKind};

// Errors
pub use error::{EvalError, ScopeError, TrapError};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use snare::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Value model
        AccessError,
        // Schema
        ClassDict,
        ClassSpec,
        ConfigWatcher,
        // Errors
        EvalError,
        // Program model
        Fork,
        ForkResult,
        ForkScript,
        Hook,
        HookOp,
        Program,
        // Ingestion
        RuleKey,
        RuleSet,
        Scope,
        ScopeError,
        // Scripts
        ScriptEngine,
        ScriptVerdict,
        // Engine
        Trap,
        TrapError,
        TrapObject,
        TypeRef,
        UpdatePolicy,
        Value,
        ValueKind,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum number of forks in a compiled program.
///
/// Width-based denial-of-service protection: a rule file with millions
/// of entries fails at `update` rather than exhausting memory and
/// making every `flow` call crawl.
pub const MAX_FORKS: usize = 65_536;

/// The delta used to abort a flow after an evaluation exception.
///
/// Strictly larger in magnitude than any legal jump, so an abort can
/// never be mistaken for a scripted backward offset.
pub const ABORT_DELTA: i64 = -(MAX_FORKS as i64) - 1;
