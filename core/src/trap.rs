//! `Trap` — the engine: rule compilation, hot swap, and flow entry
//!
//! A trap is constructed once per subject base type and lives for the
//! process. `update` compiles a full rule snapshot and swaps it in
//! atomically; `flow` runs whatever program is live. Consumers on
//! other threads never see a partially built program.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::class_dict::{ClassDict, TypeRef};
use crate::config::RuleSet;
use crate::error::TrapError;
use crate::fork::Fork;
use crate::program::{Program, UpdatePolicy};
use crate::scope::ScopeCache;
use crate::script::ScriptEngine;
use crate::value::Value;

/// The object-trap engine.
///
/// # Example
///
/// ```
/// use std::any::Any;
/// use std::sync::Arc;
/// use snare::prelude::*;
///
/// #[derive(Debug)]
/// struct Person { age: i32 }
///
/// impl TrapObject for Person {
///     fn class_name(&self) -> &str { "demo.Person" }
///     fn field(&self, name: &str) -> Result<Value, AccessError> {
///         match name {
///             "age" => Ok(Value::Int(self.age)),
///             _ => Err(AccessError {
///                 member: name.into(),
///                 class: "demo.Person".into(),
///                 detail: "no such field".into(),
///             }),
///         }
///     }
///     fn as_any(&self) -> &dyn Any { self }
/// }
///
/// let mut dict = ClassDict::new();
/// dict.register(
///     ClassSpec::new("demo.Person").with_field("age", TypeRef::Kind(ValueKind::Int)),
/// ).unwrap();
///
/// let trap = Trap::new(TypeRef::Class("demo.Person".into()), Arc::new(dict));
///
/// let mut rules = RuleSet::new();
/// rules.insert("Adult", "@age:>18");
/// assert_eq!(trap.update(&rules).unwrap(), 1);
///
/// let subject = Value::Object(Arc::new(Person { age: 25 }));
/// let mut hits = Vec::new();
/// trap.flow(&subject, |_, fork| hits.push(fork.name().to_string()));
/// assert_eq!(hits, ["Adult"]);
/// ```
#[derive(Debug)]
pub struct Trap {
    base: TypeRef,
    dict: Arc<ClassDict>,
    policy: UpdatePolicy,
    /// Upper-cased extension to engine.
    engines: Mutex<HashMap<String, Arc<dyn ScriptEngine>>>,
    scopes: Mutex<ScopeCache>,
    program: RwLock<Option<Arc<Program>>>,
}

impl Trap {
    /// Create a trap for subjects of `base`, with the default
    /// skip-bad-rules update policy.
    #[must_use]
    pub fn new(base: TypeRef, dict: Arc<ClassDict>) -> Self {
        Self::with_policy(base, dict, UpdatePolicy::default())
    }

    /// Create a trap with an explicit update policy.
    #[must_use]
    pub fn with_policy(base: TypeRef, dict: Arc<ClassDict>, policy: UpdatePolicy) -> Self {
        Self {
            base,
            dict,
            policy,
            engines: Mutex::new(HashMap::new()),
            scopes: Mutex::new(ScopeCache::new()),
            program: RwLock::new(None),
        }
    }

    /// The base type subjects are flowed as.
    #[must_use]
    pub fn base(&self) -> &TypeRef {
        &self.base
    }

    /// The class dictionary rules compile against.
    #[must_use]
    pub fn dict(&self) -> &Arc<ClassDict> {
        &self.dict
    }

    /// Register a script engine under an extension name.
    ///
    /// Names are case-insensitive; registering a name twice is fatal.
    pub fn register_script_engine(
        &self,
        name: &str,
        engine: Arc<dyn ScriptEngine>,
    ) -> Result<(), TrapError> {
        let key = name.to_uppercase();
        let mut engines = self.engines.lock();
        if engines.contains_key(&key) {
            return Err(TrapError::DuplicateEngine {
                name: name.to_string(),
            });
        }
        engines.insert(key, engine);
        Ok(())
    }

    /// Compile a rule snapshot and swap it in.
    ///
    /// Returns the new instruction count. On error the previous
    /// program stays live. Concurrent `flow` calls see either the old
    /// complete program or the new one, never a partial build.
    pub fn update(&self, rules: &RuleSet) -> Result<usize, TrapError> {
        let engines = self.engines.lock().clone();
        let program = {
            let mut scopes = self.scopes.lock();
            Program::compile(
                rules,
                &self.base,
                &self.dict,
                &mut scopes,
                &engines,
                self.policy,
            )?
        };
        let count = program.count();
        info!(rules = rules.len(), forks = count, "trap program updated");
        *self.program.write() = Some(Arc::new(program));
        Ok(count)
    }

    /// Run the live program against `subject`.
    ///
    /// `notifier` is invoked exactly once on a terminal match. With no
    /// program loaded this is a no-op. Never panics or returns errors.
    pub fn flow(&self, subject: &Value, mut notifier: impl FnMut(&Value, &Fork)) {
        let program = self.program.read().clone();
        if let Some(program) = program {
            program.flow(subject, &mut notifier);
        }
    }

    /// Number of compiled instructions, 0 with no program loaded.
    #[must_use]
    pub fn count(&self) -> usize {
        self.program.read().as_ref().map_or(0, |p| p.count())
    }

    /// The live program, if one is loaded.
    #[must_use]
    pub fn program(&self) -> Option<Arc<Program>> {
        self.program.read().clone()
    }
}
