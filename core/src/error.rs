//! Error types for rule compilation and evaluation.
//!
//! Compile-time failures (`TrapError`) are caught when a rule set is
//! compiled into a program. Evaluation-time failures (`ScopeError`,
//! `EvalError`) flow through a running program and classify the step
//! as an ERROR outcome; they never escape `Trap::flow`.

use crate::value::{AccessError, ValueKind};

/// Errors from rule compilation and engine configuration.
///
/// These errors are caught at update time, not evaluation time.
/// Fix the rule text and update again.
#[derive(Debug, Clone, PartialEq)]
pub enum TrapError {
    /// A scope path did not parse to its end.
    ScopeParse {
        /// The full path as written in the rule.
        path: String,
        /// The unconsumed remainder where parsing stopped.
        remainder: String,
    },
    /// A `!` type-cast token used an unknown type symbol.
    UnknownTypeSymbol {
        /// The symbol that was not recognized.
        symbol: char,
    },
    /// A member token was applied to a scalar base type.
    MemberOnScalar {
        /// The member that was requested.
        member: String,
        /// The scalar kind it was applied to.
        base: ValueKind,
    },
    /// A class name did not resolve in the dictionary.
    UnknownClass {
        /// The name as written.
        name: String,
        /// Class names that ARE registered (for self-correcting error messages).
        available: Vec<String>,
    },
    /// A class-name suffix matched more than one registered class.
    AmbiguousClass {
        /// The suffix as written.
        name: String,
        /// All classes the suffix matched.
        candidates: Vec<String>,
    },
    /// A class was registered twice in the dictionary.
    DuplicateClass {
        /// The fully qualified name.
        name: String,
    },
    /// No field with this name anywhere in the class hierarchy.
    FieldNotFound {
        /// The field that was requested.
        field: String,
        /// The class the search started from.
        class: String,
    },
    /// No getter with this name anywhere in the class hierarchy.
    GetterNotFound {
        /// The getter that was requested.
        getter: String,
        /// The class the search started from.
        class: String,
    },
    /// A hook condition used an unknown operator symbol.
    UnknownOp {
        /// The symbol that was not recognized.
        symbol: char,
    },
    /// The operator exists but the scoped value's type does not support it.
    UnsupportedOp {
        /// The operator symbol.
        op: char,
        /// The kind the hook was being built for.
        kind: ValueKind,
    },
    /// A hook operand failed to parse for the scoped value's type.
    BadOperand {
        /// The operand text.
        operand: String,
        /// The kind it was being parsed as.
        kind: ValueKind,
    },
    /// An operator received the wrong number of operands.
    BadParamCount {
        /// The operator symbol.
        op: char,
        /// How many operands the operator requires.
        expected: &'static str,
        /// How many were given.
        got: usize,
    },
    /// An in-range condition with lower bound above upper bound.
    InvalidRange {
        /// The lower bound as written.
        lower: String,
        /// The upper bound as written.
        upper: String,
    },
    /// A one-of condition listed the same value twice.
    DuplicateParam {
        /// The repeated operand text.
        operand: String,
    },
    /// A regex operand failed to compile.
    InvalidPattern {
        /// The pattern that failed to compile.
        pattern: String,
        /// The underlying error message.
        source: String,
    },
    /// A script descriptor's extension has no registered engine.
    UnknownExtension {
        /// The extension as written.
        extension: String,
        /// Extensions that ARE registered.
        available: Vec<String>,
    },
    /// A script engine was registered under a name already in use.
    DuplicateEngine {
        /// The duplicate engine name.
        name: String,
    },
    /// A script engine rejected a descriptor.
    ScriptCompile {
        /// The descriptor as written.
        descriptor: String,
        /// The underlying error message.
        source: String,
    },
    /// Rule source text failed to parse into a rule set.
    ConfigParse {
        /// What went wrong, with position where known.
        detail: String,
    },
    /// The compiled program exceeds [`MAX_FORKS`](crate::MAX_FORKS).
    TooManyForks {
        /// Actual fork count.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },
    /// A rule failed to compile; wraps the underlying error with the rule name.
    Rule {
        /// The rule name as decoded from its key.
        name: String,
        /// The underlying compile error.
        source: Box<TrapError>,
    },
}

impl TrapError {
    /// Wrap this error with the name of the rule it occurred in.
    #[must_use]
    pub fn in_rule(self, name: &str) -> Self {
        Self::Rule {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

impl std::fmt::Display for TrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScopeParse { path, remainder } => {
                write!(
                    f,
                    "scope path \"{path}\" has unparsed input starting at \"{remainder}\""
                )
            }
            Self::UnknownTypeSymbol { symbol } => {
                write!(
                    f,
                    "unknown type symbol '{symbol}' — expected one of Z B S I J F D C $"
                )
            }
            Self::MemberOnScalar { member, base } => {
                write!(
                    f,
                    "member \"{member}\" applied to scalar type {base} — only objects have members"
                )
            }
            Self::UnknownClass { name, available } => {
                write!(f, "unknown class \"{name}\"")?;
                if available.is_empty() {
                    write!(f, " — no classes are registered")
                } else {
                    write!(f, " — registered: {}", available.join(", "))
                }
            }
            Self::AmbiguousClass { name, candidates } => {
                write!(
                    f,
                    "class suffix \"{name}\" is ambiguous — matches: {}",
                    candidates.join(", ")
                )
            }
            Self::DuplicateClass { name } => {
                write!(f, "class \"{name}\" is already registered")
            }
            Self::FieldNotFound { field, class } => {
                write!(f, "no field \"{field}\" in {class} or its ancestors")
            }
            Self::GetterNotFound { getter, class } => {
                write!(f, "no getter \"{getter}\" in {class} or its ancestors")
            }
            Self::UnknownOp { symbol } => {
                write!(
                    f,
                    "unknown hook operator '{symbol}' — expected one of Y X = > < ~ @ *"
                )
            }
            Self::UnsupportedOp { op, kind } => {
                write!(f, "operator '{op}' is not supported for {kind} values")
            }
            Self::BadOperand { operand, kind } => {
                write!(f, "cannot parse \"{operand}\" as {kind}")
            }
            Self::BadParamCount { op, expected, got } => {
                write!(f, "operator '{op}' takes {expected} operands, got {got}")
            }
            Self::InvalidRange { lower, upper } => {
                write!(f, "invalid range: lower bound {lower} exceeds upper bound {upper}")
            }
            Self::DuplicateParam { operand } => {
                write!(f, "duplicate operand \"{operand}\" in one-of list")
            }
            Self::InvalidPattern { pattern, source } => {
                write!(f, "invalid pattern \"{pattern}\": {source}")
            }
            Self::UnknownExtension {
                extension,
                available,
            } => {
                write!(f, "no script engine for extension \"{extension}\"")?;
                if available.is_empty() {
                    write!(f, " — no engines are registered")
                } else {
                    write!(f, " — registered: {}", available.join(", "))
                }
            }
            Self::DuplicateEngine { name } => {
                write!(f, "script engine \"{name}\" is already registered")
            }
            Self::ScriptCompile { descriptor, source } => {
                write!(f, "cannot compile script \"{descriptor}\": {source}")
            }
            Self::ConfigParse { detail } => {
                write!(f, "cannot parse rule source: {detail}")
            }
            Self::TooManyForks { count, max } => {
                write!(f, "program has {count} forks, but maximum allowed is {max}")
            }
            Self::Rule { name, source } => {
                write!(f, "rule \"{name}\": {source}")
            }
        }
    }
}

impl std::error::Error for TrapError {}

/// Extraction failure from a scope.
///
/// Distinct from a hook returning `false`: the flow interpreter maps
/// this to the ERROR step outcome, which takes the no-match delta but
/// is reported differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// A class-cast guard received a null value.
    NullInstance {
        /// The guard class.
        class: String,
    },
    /// A class-cast guard received a value of an incompatible class.
    WrongClass {
        /// The guard class.
        class: String,
        /// The runtime type of the value that was rejected.
        actual: String,
    },
    /// A type-cast scope received a non-null value of a different kind.
    WrongKind {
        /// The expected kind.
        expected: ValueKind,
        /// The runtime type of the value that was rejected.
        actual: String,
    },
    /// A member accessor failed on the subject.
    Access(AccessError),
}

impl std::fmt::Display for ScopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NullInstance { class } => {
                write!(f, "null value where an instance of {class} was required")
            }
            Self::WrongClass { class, actual } => {
                write!(f, "value of class {actual} is not an instance of {class}")
            }
            Self::WrongKind { expected, actual } => {
                write!(f, "value of type {actual} cannot be cast to {expected}")
            }
            Self::Access(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ScopeError {}

impl From<AccessError> for ScopeError {
    fn from(e: AccessError) -> Self {
        Self::Access(e)
    }
}

/// Evaluation exception raised while stabbing a fork.
///
/// Aborts the flow for the current subject (the interpreter jumps by
/// the abort delta). Never surfaces to the `flow` caller.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A hook received a scoped value of a kind it was not compiled for.
    KindMismatch {
        /// The kind the hook was compiled for.
        expected: ValueKind,
        /// The runtime type of the scoped value.
        actual: String,
    },
    /// A script returned a named jump target that is not in the program.
    BadJumpTarget {
        /// The target name the script returned.
        target: String,
    },
    /// A script failed at execution time.
    Script {
        /// The rule the script belongs to.
        rule: String,
        /// The underlying error message.
        detail: String,
    },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KindMismatch { expected, actual } => {
                write!(f, "hook for {expected} values received a {actual}")
            }
            Self::BadJumpTarget { target } => {
                write!(f, "script jump to unknown rule \"{target}\"")
            }
            Self::Script { rule, detail } => {
                write!(f, "script of rule \"{rule}\" failed: {detail}")
            }
        }
    }
}

impl std::error::Error for EvalError {}
