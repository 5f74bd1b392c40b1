//! `Hook` — compiled predicates over scoped values
//!
//! A condition string compiles against the static type the scope
//! produces. Operator support varies by type; anything unsupported is
//! rejected at compile time, never at evaluation time.
//!
//! # Condition grammar
//!
//! ```text
//! ['!'] Op [Operands]
//!
//! Y        accept (no operand)
//! X        is-null (no operand)
//! =v       equal
//! >v       greater than
//! <v       less than
//! ~a,b     in range, inclusive, a <= b
//! @a,b,..  one of (duplicates rejected)
//! *pat     regex search (string and object hooks only)
//! ```
//!
//! String operands may be quoted to carry commas; `""` escapes an
//! embedded quote. `!` complements the final result.

use std::str::FromStr;

use regex::Regex;

use crate::class_dict::ClassDict;
use crate::error::{EvalError, TrapError};
use crate::value::{Value, ValueKind};

/// The fixed operator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOp {
    /// `Y` — always true.
    Accept,
    /// `X` — true when the scoped value is null.
    IsNull,
    /// `=`
    Equal,
    /// `>`
    Greater,
    /// `<`
    Less,
    /// `~` — inclusive on both bounds.
    InRange,
    /// `@`
    OneOf,
    /// `*` — search, not full match.
    RegexMatch,
}

impl HookOp {
    /// Parse an operator symbol.
    #[must_use]
    pub fn from_symbol(sym: char) -> Option<Self> {
        match sym {
            'Y' => Some(Self::Accept),
            'X' => Some(Self::IsNull),
            '=' => Some(Self::Equal),
            '>' => Some(Self::Greater),
            '<' => Some(Self::Less),
            '~' => Some(Self::InRange),
            '@' => Some(Self::OneOf),
            '*' => Some(Self::RegexMatch),
            _ => None,
        }
    }

    /// The condition-grammar symbol for this operator.
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Self::Accept => 'Y',
            Self::IsNull => 'X',
            Self::Equal => '=',
            Self::Greater => '>',
            Self::Less => '<',
            Self::InRange => '~',
            Self::OneOf => '@',
            Self::RegexMatch => '*',
        }
    }
}

// One latch shape covers all six numeric kinds.
#[derive(Debug)]
enum NumLatch<T> {
    Accept,
    IsNull,
    Equal(T),
    Greater(T),
    Less(T),
    InRange(T, T),
    OneOf(Vec<T>),
}

impl<T: PartialOrd + PartialEq + Copy> NumLatch<T> {
    // None = operator needs a value but got null.
    fn eval(&self, v: Option<T>) -> Option<bool> {
        match self {
            Self::Accept => Some(true),
            Self::IsNull => Some(v.is_none()),
            Self::Equal(a) => Some(v? == *a),
            Self::Greater(a) => Some(v? > *a),
            Self::Less(a) => Some(v? < *a),
            Self::InRange(a, b) => {
                let v = v?;
                Some(*a <= v && v <= *b)
            }
            Self::OneOf(set) => {
                let v = v?;
                Some(set.iter().any(|x| *x == v))
            }
        }
    }
}

#[derive(Debug)]
enum BoolLatch {
    Accept,
    IsNull,
    Equal(bool),
}

#[derive(Debug)]
enum CharLatch {
    Accept,
    IsNull,
    Equal(char),
    Greater(char),
    Less(char),
    InRange(char, char),
    // Membership in a plain character string.
    OneOf(String),
}

#[derive(Debug)]
enum StrLatch {
    Accept,
    IsNull,
    Equal(String),
    Greater(String),
    Less(String),
    InRange(String, String),
    OneOf(Vec<String>),
    Regex(Regex),
}

#[derive(Debug)]
enum ObjectLatch {
    Accept,
    IsNull,
    // Fully qualified class names, checked via runtime assignability.
    OneOf(Vec<String>),
    // Searched against the runtime class name.
    Regex(Regex),
}

#[derive(Debug)]
enum Latch {
    Bool(BoolLatch),
    Byte(NumLatch<i8>),
    Short(NumLatch<i16>),
    Int(NumLatch<i32>),
    Long(NumLatch<i64>),
    Float(NumLatch<f32>),
    Double(NumLatch<f64>),
    Char(CharLatch),
    Str(StrLatch),
    Object(ObjectLatch),
}

/// A compiled predicate over scoped values.
///
/// # Example
///
/// ```
/// use snare::{ClassDict, Hook, Value, ValueKind};
///
/// let dict = ClassDict::new();
/// let hook = Hook::compile(ValueKind::Int, "~5,10", &dict).unwrap().unwrap();
/// assert!(hook.latch(&Value::Int(7)).unwrap());
/// assert!(!hook.latch(&Value::Int(11)).unwrap());
/// ```
#[derive(Debug)]
pub struct Hook {
    kind: ValueKind,
    negate: bool,
    latch: Latch,
}

impl Hook {
    /// Compile a condition for values of `kind`.
    ///
    /// An empty condition compiles to no hook at all (the fork always
    /// matches). The dictionary resolves class names in object one-of
    /// lists.
    pub fn compile(
        kind: ValueKind,
        cond: &str,
        dict: &ClassDict,
    ) -> Result<Option<Self>, TrapError> {
        if cond.is_empty() {
            return Ok(None);
        }

        let (negate, rest) = match cond.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, cond),
        };
        let mut chars = rest.chars();
        let sym = chars.next().ok_or(TrapError::UnknownOp { symbol: '!' })?;
        let op = HookOp::from_symbol(sym).ok_or(TrapError::UnknownOp { symbol: sym })?;
        let operand = chars.as_str();

        let latch = match kind {
            ValueKind::Bool => Latch::Bool(bool_latch(op, operand)?),
            ValueKind::Byte => Latch::Byte(num_latch(kind, op, operand)?),
            ValueKind::Short => Latch::Short(num_latch(kind, op, operand)?),
            ValueKind::Int => Latch::Int(num_latch(kind, op, operand)?),
            ValueKind::Long => Latch::Long(num_latch(kind, op, operand)?),
            ValueKind::Float => Latch::Float(num_latch(kind, op, operand)?),
            ValueKind::Double => Latch::Double(num_latch(kind, op, operand)?),
            ValueKind::Char => Latch::Char(char_latch(op, operand)?),
            ValueKind::Str => Latch::Str(str_latch(op, operand)?),
            ValueKind::Object => Latch::Object(object_latch(op, operand, dict)?),
        };

        Ok(Some(Self {
            kind,
            negate,
            latch,
        }))
    }

    /// The value kind this hook was compiled for.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Evaluate the predicate against a scoped value.
    ///
    /// A value of the wrong kind, or null where the operator needs a
    /// value, is an evaluation exception: the step degrades to ERROR
    /// and the flow aborts.
    pub fn latch(&self, value: &Value) -> Result<bool, EvalError> {
        let raw = self.latch_raw(value)?;
        Ok(raw ^ self.negate)
    }

    fn latch_raw(&self, value: &Value) -> Result<bool, EvalError> {
        let mismatch = || EvalError::KindMismatch {
            expected: self.kind,
            actual: value.type_name().to_string(),
        };
        let need = |r: Option<bool>| r.ok_or_else(mismatch);

        match (&self.latch, value) {
            (Latch::Bool(l), v) => {
                let v = match v {
                    Value::Null => None,
                    Value::Bool(b) => Some(*b),
                    _ => return Err(mismatch()),
                };
                match l {
                    BoolLatch::Accept => Ok(true),
                    BoolLatch::IsNull => Ok(v.is_none()),
                    BoolLatch::Equal(a) => need(v.map(|v| v == *a)),
                }
            }
            (Latch::Byte(l), v) => match v {
                Value::Null => need(l.eval(None)),
                Value::Byte(x) => need(l.eval(Some(*x))),
                _ => Err(mismatch()),
            },
            (Latch::Short(l), v) => match v {
                Value::Null => need(l.eval(None)),
                Value::Short(x) => need(l.eval(Some(*x))),
                _ => Err(mismatch()),
            },
            (Latch::Int(l), v) => match v {
                Value::Null => need(l.eval(None)),
                Value::Int(x) => need(l.eval(Some(*x))),
                _ => Err(mismatch()),
            },
            (Latch::Long(l), v) => match v {
                Value::Null => need(l.eval(None)),
                Value::Long(x) => need(l.eval(Some(*x))),
                _ => Err(mismatch()),
            },
            (Latch::Float(l), v) => match v {
                Value::Null => need(l.eval(None)),
                Value::Float(x) => need(l.eval(Some(*x))),
                _ => Err(mismatch()),
            },
            (Latch::Double(l), v) => match v {
                Value::Null => need(l.eval(None)),
                Value::Double(x) => need(l.eval(Some(*x))),
                _ => Err(mismatch()),
            },
            (Latch::Char(l), v) => {
                let v = match v {
                    Value::Null => None,
                    Value::Char(c) => Some(*c),
                    _ => return Err(mismatch()),
                };
                match l {
                    CharLatch::Accept => Ok(true),
                    CharLatch::IsNull => Ok(v.is_none()),
                    CharLatch::Equal(a) => need(v.map(|v| v == *a)),
                    CharLatch::Greater(a) => need(v.map(|v| v > *a)),
                    CharLatch::Less(a) => need(v.map(|v| v < *a)),
                    CharLatch::InRange(a, b) => need(v.map(|v| *a <= v && v <= *b)),
                    CharLatch::OneOf(set) => need(v.map(|v| set.contains(v))),
                }
            }
            (Latch::Str(l), v) => {
                let v = match v {
                    Value::Null => None,
                    Value::Str(s) => Some(s.as_str()),
                    _ => return Err(mismatch()),
                };
                match l {
                    StrLatch::Accept => Ok(true),
                    StrLatch::IsNull => Ok(v.is_none()),
                    StrLatch::Equal(a) => need(v.map(|v| v == a)),
                    StrLatch::Greater(a) => need(v.map(|v| v > a.as_str())),
                    StrLatch::Less(a) => need(v.map(|v| v < a.as_str())),
                    StrLatch::InRange(a, b) => {
                        need(v.map(|v| a.as_str() <= v && v <= b.as_str()))
                    }
                    StrLatch::OneOf(set) => need(v.map(|v| set.iter().any(|x| x == v))),
                    StrLatch::Regex(re) => need(v.map(|v| re.is_match(v))),
                }
            }
            (Latch::Object(l), v) => {
                let obj = match v {
                    Value::Null => None,
                    Value::Object(o) => Some(o),
                    _ => return Err(mismatch()),
                };
                match l {
                    ObjectLatch::Accept => Ok(true),
                    ObjectLatch::IsNull => Ok(obj.is_none()),
                    ObjectLatch::OneOf(classes) => {
                        need(obj.map(|o| classes.iter().any(|c| o.instance_of(c))))
                    }
                    ObjectLatch::Regex(re) => need(obj.map(|o| re.is_match(o.class_name()))),
                }
            }
        }
    }
}

fn no_operand(op: HookOp, operand: &str) -> Result<(), TrapError> {
    if operand.is_empty() {
        Ok(())
    } else {
        Err(TrapError::BadParamCount {
            op: op.symbol(),
            expected: "0",
            got: operand.split(',').count(),
        })
    }
}

fn parse_scalar<T: FromStr>(kind: ValueKind, operand: &str) -> Result<T, TrapError> {
    operand.parse().map_err(|_| TrapError::BadOperand {
        operand: operand.to_string(),
        kind,
    })
}

fn two_operands<'a>(op: HookOp, parts: &[&'a str]) -> Result<(&'a str, &'a str), TrapError> {
    if parts.len() == 2 {
        Ok((parts[0], parts[1]))
    } else {
        Err(TrapError::BadParamCount {
            op: op.symbol(),
            expected: "2",
            got: parts.len(),
        })
    }
}

fn num_latch<T>(kind: ValueKind, op: HookOp, operand: &str) -> Result<NumLatch<T>, TrapError>
where
    T: FromStr + PartialOrd + PartialEq + Copy,
{
    match op {
        HookOp::Accept => {
            no_operand(op, operand)?;
            Ok(NumLatch::Accept)
        }
        HookOp::IsNull => {
            no_operand(op, operand)?;
            Ok(NumLatch::IsNull)
        }
        HookOp::Equal => Ok(NumLatch::Equal(parse_scalar(kind, operand)?)),
        HookOp::Greater => Ok(NumLatch::Greater(parse_scalar(kind, operand)?)),
        HookOp::Less => Ok(NumLatch::Less(parse_scalar(kind, operand)?)),
        HookOp::InRange => {
            let parts: Vec<&str> = operand.split(',').collect();
            let (lo, hi) = two_operands(op, &parts)?;
            let a: T = parse_scalar(kind, lo)?;
            let b: T = parse_scalar(kind, hi)?;
            if !(a <= b) {
                return Err(TrapError::InvalidRange {
                    lower: lo.to_string(),
                    upper: hi.to_string(),
                });
            }
            Ok(NumLatch::InRange(a, b))
        }
        HookOp::OneOf => {
            let mut set: Vec<T> = Vec::new();
            for part in operand.split(',') {
                let v: T = parse_scalar(kind, part)?;
                if set.iter().any(|x| *x == v) {
                    return Err(TrapError::DuplicateParam {
                        operand: part.to_string(),
                    });
                }
                set.push(v);
            }
            Ok(NumLatch::OneOf(set))
        }
        HookOp::RegexMatch => Err(TrapError::UnsupportedOp {
            op: op.symbol(),
            kind,
        }),
    }
}

fn bool_latch(op: HookOp, operand: &str) -> Result<BoolLatch, TrapError> {
    let kind = ValueKind::Bool;
    match op {
        HookOp::Accept => {
            no_operand(op, operand)?;
            Ok(BoolLatch::Accept)
        }
        HookOp::IsNull => {
            no_operand(op, operand)?;
            Ok(BoolLatch::IsNull)
        }
        HookOp::Equal => match operand {
            "true" => Ok(BoolLatch::Equal(true)),
            "false" => Ok(BoolLatch::Equal(false)),
            _ => Err(TrapError::BadOperand {
                operand: operand.to_string(),
                kind,
            }),
        },
        _ => Err(TrapError::UnsupportedOp {
            op: op.symbol(),
            kind,
        }),
    }
}

fn char_latch(op: HookOp, operand: &str) -> Result<CharLatch, TrapError> {
    let kind = ValueKind::Char;
    let one_char = |s: &str| -> Result<char, TrapError> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(TrapError::BadOperand {
                operand: s.to_string(),
                kind,
            }),
        }
    };
    match op {
        HookOp::Accept => {
            no_operand(op, operand)?;
            Ok(CharLatch::Accept)
        }
        HookOp::IsNull => {
            no_operand(op, operand)?;
            Ok(CharLatch::IsNull)
        }
        HookOp::Equal => Ok(CharLatch::Equal(one_char(operand)?)),
        HookOp::Greater => Ok(CharLatch::Greater(one_char(operand)?)),
        HookOp::Less => Ok(CharLatch::Less(one_char(operand)?)),
        HookOp::InRange => {
            let parts: Vec<&str> = operand.split(',').collect();
            let (lo, hi) = two_operands(op, &parts)?;
            let a = one_char(lo)?;
            let b = one_char(hi)?;
            if a > b {
                return Err(TrapError::InvalidRange {
                    lower: lo.to_string(),
                    upper: hi.to_string(),
                });
            }
            Ok(CharLatch::InRange(a, b))
        }
        HookOp::OneOf => {
            let mut seen = String::new();
            for c in operand.chars() {
                if seen.contains(c) {
                    return Err(TrapError::DuplicateParam {
                        operand: c.to_string(),
                    });
                }
                seen.push(c);
            }
            Ok(CharLatch::OneOf(seen))
        }
        HookOp::RegexMatch => Err(TrapError::UnsupportedOp {
            op: op.symbol(),
            kind,
        }),
    }
}

// Strips one level of quoting; "" inside quotes is a literal quote.
fn unquote(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].replace("\"\"", "\"")
    } else {
        s.to_string()
    }
}

/// Splits on commas that are not inside double quotes.
///
/// The original grammar did this with a lookahead regex; the `regex`
/// crate has no lookaround, so this is a plain scan.
pub(crate) fn split_quoted_list(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    for c in s.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                cur.push(c);
            }
            ',' if !in_quotes => {
                parts.push(std::mem::take(&mut cur));
            }
            _ => cur.push(c),
        }
    }
    parts.push(cur);
    parts
}

fn str_latch(op: HookOp, operand: &str) -> Result<StrLatch, TrapError> {
    match op {
        HookOp::Accept => {
            no_operand(op, operand)?;
            Ok(StrLatch::Accept)
        }
        HookOp::IsNull => {
            no_operand(op, operand)?;
            Ok(StrLatch::IsNull)
        }
        HookOp::Equal => Ok(StrLatch::Equal(unquote(operand))),
        HookOp::Greater => Ok(StrLatch::Greater(unquote(operand))),
        HookOp::Less => Ok(StrLatch::Less(unquote(operand))),
        HookOp::InRange => {
            let parts = split_quoted_list(operand);
            let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
            let (lo, hi) = two_operands(op, &refs)?;
            let a = unquote(lo);
            let b = unquote(hi);
            if a > b {
                return Err(TrapError::InvalidRange {
                    lower: lo.to_string(),
                    upper: hi.to_string(),
                });
            }
            Ok(StrLatch::InRange(a, b))
        }
        HookOp::OneOf => {
            let mut set: Vec<String> = Vec::new();
            for part in split_quoted_list(operand) {
                let v = unquote(&part);
                if set.contains(&v) {
                    return Err(TrapError::DuplicateParam { operand: part });
                }
                set.push(v);
            }
            Ok(StrLatch::OneOf(set))
        }
        HookOp::RegexMatch => {
            let pattern = unquote(operand);
            let re = Regex::new(&pattern).map_err(|e| TrapError::InvalidPattern {
                pattern,
                source: e.to_string(),
            })?;
            Ok(StrLatch::Regex(re))
        }
    }
}

fn object_latch(op: HookOp, operand: &str, dict: &ClassDict) -> Result<ObjectLatch, TrapError> {
    let kind = ValueKind::Object;
    match op {
        HookOp::Accept => {
            no_operand(op, operand)?;
            Ok(ObjectLatch::Accept)
        }
        HookOp::IsNull => {
            no_operand(op, operand)?;
            Ok(ObjectLatch::IsNull)
        }
        HookOp::OneOf => {
            let mut classes: Vec<String> = Vec::new();
            for part in split_quoted_list(operand) {
                let resolved = dict.resolve(&unquote(&part))?.name().to_string();
                if classes.contains(&resolved) {
                    return Err(TrapError::DuplicateParam { operand: part });
                }
                classes.push(resolved);
            }
            Ok(ObjectLatch::OneOf(classes))
        }
        HookOp::RegexMatch => {
            let pattern = unquote(operand);
            let re = Regex::new(&pattern).map_err(|e| TrapError::InvalidPattern {
                pattern,
                source: e.to_string(),
            })?;
            Ok(ObjectLatch::Regex(re))
        }
        _ => Err(TrapError::UnsupportedOp {
            op: op.symbol(),
            kind,
        }),
    }
}
