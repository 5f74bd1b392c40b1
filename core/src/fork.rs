//! `Fork` — one compiled program instruction
//!
//! A fork pairs a scope with an optional hook and jump deltas. The
//! interpreter stabs forks in sequence; each stab classifies the step
//! as MATCH, UNMATCH, or ERROR and yields the signed delta to the next
//! instruction. Delta 0 is the terminal match, negative aborts.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::EvalError;
use crate::hook::Hook;
use crate::scope::{EvalContext, Scope};
use crate::script::{ForkScript, ScriptEngine, ScriptVerdict};
use crate::value::Value;
use crate::ABORT_DELTA;

/// Step classification produced by a stab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkResult {
    /// Scope extracted, hook passed (or no hook).
    Match,
    /// Scope extracted, hook returned false.
    Unmatch,
    /// Extraction failed or the step raised an evaluation exception.
    Error,
}

/// Outcome of one stab: classification plus the resolved jump delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRec {
    /// The step classification.
    pub result: ForkResult,
    /// Signed jump delta. `0` notifies and stops, negative aborts.
    pub delta: i64,
}

/// The script slot of a fork.
#[derive(Debug, Clone)]
pub(crate) enum ScriptSlot {
    /// Empty third rule field: on MATCH, publish the scoped value under
    /// the fork's name to every active engine.
    AssignScope,
    /// Explicit descriptor, compiled by a registered engine.
    Custom(Arc<dyn ForkScript>),
}

// Program state a stab needs: active engines for publication and the
// name map for script jumps.
pub(crate) struct StabCtx<'a> {
    pub engines: &'a [Arc<dyn ScriptEngine>],
    pub index: &'a HashMap<String, usize>,
}

/// One compiled instruction.
#[derive(Debug)]
pub struct Fork {
    pub(crate) name: String,
    pub(crate) scope: Arc<Scope>,
    pub(crate) hook: Option<Hook>,
    pub(crate) script: Option<ScriptSlot>,
    pub(crate) match_next: i64,
    pub(crate) unmatch_next: i64,
    /// One-based absolute index, fixed when appended to the program.
    pub(crate) ip: usize,
}

impl Fork {
    /// The rule name this fork was compiled from, group prefix included.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-based absolute instruction index.
    #[must_use]
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Jump delta taken on MATCH. `0` is terminal.
    #[must_use]
    pub fn match_next(&self) -> i64 {
        self.match_next
    }

    /// Jump delta taken on UNMATCH and ERROR.
    #[must_use]
    pub fn unmatch_next(&self) -> i64 {
        self.unmatch_next
    }

    /// Execute this fork against `subject`.
    ///
    /// Never panics or propagates errors: every failure degrades to an
    /// ERROR result with the abort delta, logged here.
    pub(crate) fn stab(&self, subject: &Value, ctx: &mut EvalContext, env: &StabCtx) -> StepRec {
        let (scoped, result) = match self.scope.peek(subject, ctx) {
            Ok(v) => {
                let result = match &self.hook {
                    None => ForkResult::Match,
                    Some(hook) => match hook.latch(&v) {
                        Ok(true) => ForkResult::Match,
                        Ok(false) => ForkResult::Unmatch,
                        Err(e) => {
                            warn!(fork = %self.name, error = %e, "hook evaluation failed, aborting flow");
                            return StepRec {
                                result: ForkResult::Error,
                                delta: ABORT_DELTA,
                            };
                        }
                    },
                };
                (v, result)
            }
            Err(e) => {
                debug!(fork = %self.name, error = %e, "scope extraction failed");
                (Value::Null, ForkResult::Error)
            }
        };

        let mut delta = match result {
            ForkResult::Match => self.match_next,
            ForkResult::Unmatch | ForkResult::Error => self.unmatch_next,
        };

        match &self.script {
            None => {}
            Some(ScriptSlot::AssignScope) => {
                if result == ForkResult::Match {
                    let mut published = HashMap::with_capacity(1);
                    published.insert(self.name.clone(), scoped.clone());
                    for engine in env.engines {
                        engine.prepare_env(&published);
                    }
                }
            }
            Some(ScriptSlot::Custom(script)) => {
                match script.exec(&self.name, result, subject, &scoped) {
                    Ok(ScriptVerdict::NoOverride) => {}
                    Ok(ScriptVerdict::Offset(d)) => delta = d,
                    Ok(ScriptVerdict::Jump(target)) => match env.index.get(&target) {
                        Some(target_ip) => delta = *target_ip as i64 - self.ip as i64,
                        None => {
                            let e = EvalError::BadJumpTarget { target };
                            warn!(fork = %self.name, error = %e, "aborting flow");
                            return StepRec {
                                result: ForkResult::Error,
                                delta: ABORT_DELTA,
                            };
                        }
                    },
                    Err(e) => {
                        let e = EvalError::Script {
                            rule: self.name.clone(),
                            detail: e.to_string(),
                        };
                        warn!(fork = %self.name, error = %e, "aborting flow");
                        return StepRec {
                            result: ForkResult::Error,
                            delta: ABORT_DELTA,
                        };
                    }
                }
            }
        }

        StepRec { result, delta }
    }
}
