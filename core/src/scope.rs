//! `Scope` — compiled extraction paths over subject object graphs
//!
//! A scope descends from the subject to the value a hook inspects.
//! Scopes are compiled once against the class dictionary and shared
//! between rules through [`ScopeCache`].
//!
//! # Path grammar
//!
//! Compact form, tokens written back to back:
//!
//! ```text
//! [?Class]@field      field access, optionally guarded by a class cast
//! [?Class]>getter     getter call, optionally guarded by a class cast
//! !X                  type cast, X one of Z B S I J F D C $
//! ```
//!
//! Legacy form joins the same tokens with `+`. Any input the grammar
//! does not consume fails compilation with the unparsed remainder.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::class_dict::{ClassDict, TypeRef};
use crate::error::{ScopeError, TrapError};
use crate::value::{Value, ValueKind};

/// Per-flow evaluation context.
///
/// Memoizes accessor results so forks sharing a scope prefix do not
/// re-extract from the same object. Keyed by scope identity and object
/// identity; scoped to one flow call.
#[derive(Debug, Default)]
pub struct EvalContext {
    memo: HashMap<(usize, usize), Result<Value, ScopeError>>,
}

impl EvalContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all memoized results.
    pub fn clear(&mut self) {
        self.memo.clear();
    }

    fn key(scope: &Scope, input: &Value) -> Option<(usize, usize)> {
        let obj = input.as_object()?;
        let scope_id = scope as *const Scope as usize;
        let obj_id = Arc::as_ptr(obj) as *const () as usize;
        Some((scope_id, obj_id))
    }
}

/// A compiled extraction step, or a chain of them.
#[derive(Debug)]
pub enum Scope {
    /// Yields the input unchanged. Compiled from an empty path: the
    /// hook applies to the subject itself.
    Identity {
        /// Static output type (the base type).
        out: TypeRef,
    },
    /// Asserts the input's scalar kind. Null passes through untouched.
    TypeCast {
        /// The asserted kind.
        kind: ValueKind,
    },
    /// Reads a field, guarded by a class cast.
    Field {
        /// Guard class; null or non-instance input is an extraction error.
        class: String,
        /// Field name.
        field: String,
        /// Static output type from the dictionary.
        out: TypeRef,
    },
    /// Calls a no-argument getter, guarded by a class cast.
    Getter {
        /// Guard class; null or non-instance input is an extraction error.
        class: String,
        /// Getter name.
        getter: String,
        /// Static output type from the dictionary.
        out: TypeRef,
    },
    /// Applies scopes left to right. A null intermediate hits the next
    /// step's class guard and fails extraction; only the final step may
    /// yield null.
    Cascade {
        /// The chained scopes, shared with the token cache.
        scopes: Vec<Arc<Scope>>,
        /// Static output type of the last scope.
        out: TypeRef,
    },
}

impl Scope {
    /// Static output type of this scope.
    #[must_use]
    pub fn out_type(&self) -> TypeRef {
        match self {
            Self::Identity { out } => out.clone(),
            Self::TypeCast { kind } => TypeRef::Kind(*kind),
            Self::Field { out, .. } | Self::Getter { out, .. } | Self::Cascade { out, .. } => {
                out.clone()
            }
        }
    }

    /// Extract the scoped value from `input`.
    ///
    /// `Ok(Value::Null)` is absence, not failure. Failures carry what
    /// went wrong and classify the step as an ERROR outcome.
    pub fn peek(&self, input: &Value, ctx: &mut EvalContext) -> Result<Value, ScopeError> {
        match self {
            Self::Identity { .. } => Ok(input.clone()),
            Self::TypeCast { kind } => match input {
                Value::Null => Ok(Value::Null),
                v if v.kind() == Some(*kind) => Ok(v.clone()),
                v => Err(ScopeError::WrongKind {
                    expected: *kind,
                    actual: v.type_name().to_string(),
                }),
            },
            Self::Field { class, field, .. } => self.memoized(input, ctx, |obj| {
                obj.field(field).map_err(ScopeError::from)
            }, class),
            Self::Getter { class, getter, .. } => self.memoized(input, ctx, |obj| {
                obj.getter(getter).map_err(ScopeError::from)
            }, class),
            Self::Cascade { scopes, .. } => {
                let mut cur = input.clone();
                for scope in scopes {
                    cur = scope.peek(&cur, ctx)?;
                }
                Ok(cur)
            }
        }
    }

    // Guard + accessor with per-context memoization.
    fn memoized(
        &self,
        input: &Value,
        ctx: &mut EvalContext,
        access: impl FnOnce(&dyn crate::value::TrapObject) -> Result<Value, ScopeError>,
        class: &str,
    ) -> Result<Value, ScopeError> {
        if let Some(key) = EvalContext::key(self, input) {
            if let Some(hit) = ctx.memo.get(&key) {
                return hit.clone();
            }
            let result = self.guarded_access(input, access, class);
            ctx.memo.insert(key, result.clone());
            return result;
        }
        self.guarded_access(input, access, class)
    }

    fn guarded_access(
        &self,
        input: &Value,
        access: impl FnOnce(&dyn crate::value::TrapObject) -> Result<Value, ScopeError>,
        class: &str,
    ) -> Result<Value, ScopeError> {
        match input {
            Value::Null => Err(ScopeError::NullInstance {
                class: class.to_string(),
            }),
            Value::Object(obj) => {
                if !obj.instance_of(class) {
                    return Err(ScopeError::WrongClass {
                        class: class.to_string(),
                        actual: obj.class_name().to_string(),
                    });
                }
                access(obj.as_ref())
            }
            v => Err(ScopeError::WrongClass {
                class: class.to_string(),
                actual: v.type_name().to_string(),
            }),
        }
    }
}

/// One parsed token of a scope path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Cast(char),
    Member {
        cast: Option<String>,
        getter: bool,
        name: String,
    },
}

impl Token {
    fn canonical(&self) -> String {
        match self {
            Self::Cast(sym) => format!("!{sym}"),
            Self::Member { cast, getter, name } => {
                let op = if *getter { '>' } else { '@' };
                match cast {
                    Some(c) => format!("?{c}{op}{name}"),
                    None => format!("{op}{name}"),
                }
            }
        }
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"!.|(?:\?[^!?@>+]+)?[@>][^!?@>+]+").expect("token pattern is valid")
    })
}

// Tokenizes a path in either grammar. Tokens must cover the whole
// input; any gap fails with the remainder.
fn tokenize(path: &str) -> Result<Vec<Token>, TrapError> {
    if path.contains('+') {
        return path.split('+').map(|seg| parse_token(path, seg)).collect();
    }

    let mut tokens = Vec::new();
    let mut pos = 0;
    for m in token_pattern().find_iter(path) {
        if m.start() != pos {
            return Err(TrapError::ScopeParse {
                path: path.to_string(),
                remainder: path[pos..].to_string(),
            });
        }
        tokens.push(parse_token(path, m.as_str())?);
        pos = m.end();
    }
    if pos != path.len() {
        return Err(TrapError::ScopeParse {
            path: path.to_string(),
            remainder: path[pos..].to_string(),
        });
    }
    Ok(tokens)
}

fn parse_token(path: &str, tok: &str) -> Result<Token, TrapError> {
    let bad = || TrapError::ScopeParse {
        path: path.to_string(),
        remainder: tok.to_string(),
    };

    if let Some(rest) = tok.strip_prefix('!') {
        let mut chars = rest.chars();
        let sym = chars.next().ok_or_else(bad)?;
        if chars.next().is_some() {
            return Err(bad());
        }
        return Ok(Token::Cast(sym));
    }

    let (cast, rest) = match tok.strip_prefix('?') {
        Some(rest) => {
            let split = rest.find(['@', '>']).ok_or_else(bad)?;
            (Some(rest[..split].to_string()), &rest[split..])
        }
        None => (None, tok),
    };

    let mut chars = rest.chars();
    let getter = match chars.next() {
        Some('@') => false,
        Some('>') => true,
        _ => return Err(bad()),
    };
    let name: String = chars.collect();
    if name.is_empty() || name.contains(['!', '?', '@', '>']) {
        return Err(bad());
    }
    Ok(Token::Member { cast, getter, name })
}

/// Canonicalizing scope compiler.
///
/// Holds two caches: full path strings and individual tokens, both
/// keyed together with the base type they were compiled against. Equal
/// paths compile to the same shared `Arc<Scope>`, which also makes the
/// per-flow memo effective across rules.
#[derive(Debug, Default)]
pub struct ScopeCache {
    paths: HashMap<(String, String), Arc<Scope>>,
    tokens: HashMap<(String, String), Arc<Scope>>,
}

impl ScopeCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `path` against `base`, reusing cached scopes.
    pub fn compile(
        &mut self,
        path: &str,
        base: &TypeRef,
        dict: &ClassDict,
    ) -> Result<Arc<Scope>, TrapError> {
        let path_key = (path.to_string(), base.to_string());
        if let Some(hit) = self.paths.get(&path_key) {
            return Ok(Arc::clone(hit));
        }

        let scope = self.compile_uncached(path, base, dict)?;
        self.paths.insert(path_key, Arc::clone(&scope));
        Ok(scope)
    }

    fn compile_uncached(
        &mut self,
        path: &str,
        base: &TypeRef,
        dict: &ClassDict,
    ) -> Result<Arc<Scope>, TrapError> {
        if path.is_empty() {
            return Ok(Arc::new(Scope::Identity { out: base.clone() }));
        }

        let tokens = tokenize(path)?;
        let mut cur = base.clone();
        let mut scopes = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let scope = self.compile_token(token, &cur, dict)?;
            cur = scope.out_type();
            scopes.push(scope);
        }

        if scopes.len() == 1 {
            return Ok(scopes.into_iter().next().expect("one scope"));
        }
        Ok(Arc::new(Scope::Cascade { scopes, out: cur }))
    }

    fn compile_token(
        &mut self,
        token: &Token,
        base: &TypeRef,
        dict: &ClassDict,
    ) -> Result<Arc<Scope>, TrapError> {
        let token_key = (token.canonical(), base.to_string());
        if let Some(hit) = self.tokens.get(&token_key) {
            return Ok(Arc::clone(hit));
        }

        let scope = match token {
            Token::Cast(sym) => {
                let kind = ValueKind::from_symbol(*sym)
                    .ok_or(TrapError::UnknownTypeSymbol { symbol: *sym })?;
                Scope::TypeCast { kind }
            }
            Token::Member { cast, getter, name } => {
                let class = match cast {
                    Some(suffix) => dict.resolve(suffix)?.name().to_string(),
                    None => match base {
                        TypeRef::Class(c) => c.clone(),
                        TypeRef::Kind(k) => {
                            return Err(TrapError::MemberOnScalar {
                                member: name.clone(),
                                base: *k,
                            })
                        }
                    },
                };
                if *getter {
                    let out = dict.lookup_getter(&class, name)?;
                    Scope::Getter {
                        class,
                        getter: name.clone(),
                        out,
                    }
                } else {
                    let out = dict.lookup_field(&class, name)?;
                    Scope::Field {
                        class,
                        field: name.clone(),
                        out,
                    }
                }
            }
        };

        let scope = Arc::new(scope);
        self.tokens.insert(token_key, Arc::clone(&scope));
        Ok(scope)
    }
}
