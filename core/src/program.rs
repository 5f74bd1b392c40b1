//! `Program` — the compiled form of a rule set
//!
//! Compilation walks the snapshot in sorted key order, builds one fork
//! per rule, and lays grouped rules out as contiguous OR-chains after
//! the ungrouped ones. Everything is built into locals and published
//! as one immutable program; a failed compile leaves nothing behind.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::class_dict::{ClassDict, TypeRef};
use crate::config::{split_rule_text, RuleKey, RuleSet};
use crate::error::TrapError;
use crate::fork::{Fork, ScriptSlot, StabCtx};
use crate::hook::Hook;
use crate::scope::{EvalContext, ScopeCache};
use crate::script::ScriptEngine;
use crate::value::Value;
use crate::MAX_FORKS;

/// What `update` does when one rule fails to compile.
///
/// The original engine logged and moved on; both behaviors are useful,
/// so the policy is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Log the failing rule, compile the rest. The default.
    #[default]
    SkipBadRules,
    /// Fail the whole update; the previous program stays live.
    AbortOnError,
}

/// An immutable compiled program: forks, name map, active engines.
#[derive(Debug)]
pub struct Program {
    forks: Vec<Fork>,
    /// Full rule name to one-based instruction index.
    index: HashMap<String, usize>,
    /// Engines that compiled at least one script in this program.
    engines: Vec<Arc<dyn ScriptEngine>>,
}

impl Program {
    /// Compile a rule snapshot.
    ///
    /// `engines` maps upper-cased extensions to registered script
    /// engines. The scope cache canonicalizes across updates.
    pub(crate) fn compile(
        rules: &RuleSet,
        base: &TypeRef,
        dict: &ClassDict,
        scopes: &mut ScopeCache,
        engines: &HashMap<String, Arc<dyn ScriptEngine>>,
        policy: UpdatePolicy,
    ) -> Result<Self, TrapError> {
        let mut ungrouped: Vec<Fork> = Vec::new();
        // Groups in first-appearance order, members in sorted key order.
        let mut group_order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Fork>> = HashMap::new();
        let mut active: Vec<Arc<dyn ScriptEngine>> = Vec::new();

        for (key, text) in rules.iter() {
            match Self::compile_rule(key, text, base, dict, scopes, engines, &mut active) {
                Ok(fork) => match &key.group {
                    None => ungrouped.push(fork),
                    Some(group) => {
                        let members = groups.entry(group.clone()).or_default();
                        if members.is_empty() {
                            group_order.push(group.clone());
                        }
                        members.push(fork);
                    }
                },
                Err(e) => {
                    let e = e.in_rule(&key.full());
                    match policy {
                        UpdatePolicy::SkipBadRules => {
                            warn!(error = %e, "skipping rule");
                        }
                        UpdatePolicy::AbortOnError => return Err(e),
                    }
                }
            }
        }

        let mut forks = ungrouped;
        for group in &group_order {
            let members = groups.remove(group).expect("group recorded on insert");
            debug!(group = %group, members = members.len(), "flattening group chain");
            forks.extend(members);
        }

        if forks.len() > MAX_FORKS {
            return Err(TrapError::TooManyForks {
                count: forks.len(),
                max: MAX_FORKS,
            });
        }

        let mut index = HashMap::with_capacity(forks.len());
        for (pos, fork) in forks.iter_mut().enumerate() {
            fork.ip = pos + 1;
            index.insert(fork.name.clone(), fork.ip);
        }

        Ok(Self {
            forks,
            index,
            engines: active,
        })
    }

    fn compile_rule(
        key: &RuleKey,
        text: &str,
        base: &TypeRef,
        dict: &ClassDict,
        scopes: &mut ScopeCache,
        engines: &HashMap<String, Arc<dyn ScriptEngine>>,
        active: &mut Vec<Arc<dyn ScriptEngine>>,
    ) -> Result<Fork, TrapError> {
        let name = key.full();
        let fields = split_rule_text(text);

        let scope = scopes.compile(fields.scope.trim(), base, dict)?;
        let hook = Hook::compile(
            scope.out_type().kind(),
            fields.hook.as_deref().unwrap_or("").trim(),
            dict,
        )?;

        let script = match fields.script.as_deref().map(str::trim) {
            None => None,
            Some("") => Some(ScriptSlot::AssignScope),
            Some(descriptor) => {
                let extension = descriptor
                    .rsplit('.')
                    .next()
                    .unwrap_or(descriptor)
                    .to_uppercase();
                let engine =
                    engines
                        .get(&extension)
                        .ok_or_else(|| TrapError::UnknownExtension {
                            extension: extension.clone(),
                            available: engines.keys().cloned().collect(),
                        })?;
                let compiled = engine.compile(&name, descriptor)?;
                if !active.iter().any(|e| Arc::ptr_eq(e, engine)) {
                    active.push(Arc::clone(engine));
                }
                Some(ScriptSlot::Custom(compiled))
            }
        };

        Ok(Fork {
            name,
            scope,
            hook,
            script,
            match_next: 0,
            unmatch_next: 1,
            ip: 0, // assigned when the program is laid out
        })
    }

    /// Number of compiled instructions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.forks.len()
    }

    /// The compiled forks, in instruction order.
    #[must_use]
    pub fn forks(&self) -> &[Fork] {
        &self.forks
    }

    /// One-based instruction index of a rule, by full name.
    #[must_use]
    pub fn ip_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Run the interpreter over `subject`.
    ///
    /// Calls `notifier(subject, fork)` exactly once if a terminal match
    /// occurs. Never returns an error; failures abort silently after
    /// being logged at the step that raised them.
    pub fn flow(&self, subject: &Value, notifier: &mut dyn FnMut(&Value, &Fork)) {
        let env = StabCtx {
            engines: &self.engines,
            index: &self.index,
        };
        let mut ctx = EvalContext::new();
        let mut fip: usize = 0;
        while fip < self.forks.len() {
            let fork = &self.forks[fip];
            let rec = fork.stab(subject, &mut ctx, &env);
            if rec.delta <= 0 {
                if rec.delta == 0 {
                    debug!(fork = %fork.name, "trap matched");
                    notifier(subject, fork);
                }
                return;
            }
            fip += rec.delta as usize;
        }
    }
}
