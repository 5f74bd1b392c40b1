//! `Value` — Type-erased data that flows between scopes and hooks
//!
//! Scopes extract a `Value` from the subject object graph, and hooks
//! consume it. Erasing at the data level keeps hooks non-generic and
//! shareable across programs.
//!
//! # Extensibility via `Object`
//!
//! Structured subjects implement [`TrapObject`] and are wrapped in
//! `Value::Object(Arc::new(your_type))`.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Access failure reported by a [`TrapObject`] member accessor.
///
/// A missing or failing member is an extraction error, not a no-match:
/// the flow interpreter treats it as an ERROR step outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessError {
    /// The member that failed to resolve.
    pub member: String,
    /// The runtime class of the object being accessed.
    pub class: String,
    /// Underlying failure description.
    pub detail: String,
}

impl std::fmt::Display for AccessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot access \"{}\" on {}: {}",
            self.member, self.class, self.detail
        )
    }
}

impl std::error::Error for AccessError {}

/// Trait for structured subjects that scopes can descend into.
///
/// This is the reflection seam: instead of runtime class introspection,
/// the subject itself answers class-name, assignability, and member
/// access queries.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so programs can evaluate
/// subjects concurrently.
///
/// # Example
///
/// ```
/// use std::any::Any;
/// use std::sync::Arc;
/// use snare::{AccessError, TrapObject, Value};
///
/// #[derive(Debug)]
/// struct Point { x: i32, y: i32 }
///
/// impl TrapObject for Point {
///     fn class_name(&self) -> &str {
///         "geom.Point"
///     }
///
///     fn field(&self, name: &str) -> Result<Value, AccessError> {
///         match name {
///             "x" => Ok(Value::Int(self.x)),
///             "y" => Ok(Value::Int(self.y)),
///             _ => Err(AccessError {
///                 member: name.into(),
///                 class: self.class_name().into(),
///                 detail: "no such field".into(),
///             }),
///         }
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
///
/// let v = Value::Object(Arc::new(Point { x: 1, y: 2 }));
/// assert!(v.is_object());
/// assert_eq!(v.type_name(), "geom.Point");
/// ```
pub trait TrapObject: Send + Sync + Debug {
    /// Fully qualified runtime class name, e.g. `"demo.Order"`.
    fn class_name(&self) -> &str;

    /// Runtime assignability check against a fully qualified class name.
    ///
    /// The default implementation accepts only the exact runtime class.
    /// Override to report superclasses and interfaces.
    fn instance_of(&self, class: &str) -> bool {
        self.class_name() == class
    }

    /// Read a field by name.
    fn field(&self, name: &str) -> Result<Value, AccessError> {
        Err(AccessError {
            member: name.to_string(),
            class: self.class_name().to_string(),
            detail: "object exposes no fields".to_string(),
        })
    }

    /// Invoke a no-argument getter by name.
    fn getter(&self, name: &str) -> Result<Value, AccessError> {
        Err(AccessError {
            member: name.to_string(),
            class: self.class_name().to_string(),
            detail: "object exposes no getters".to_string(),
        })
    }

    /// Returns a reference to `self` as `&dyn Any`.
    ///
    /// Enables downcasting in notifiers and scripts:
    ///
    /// ```ignore
    /// if let Some(order) = obj.as_any().downcast_ref::<Order>() {
    ///     // use order fields directly
    /// }
    /// ```
    fn as_any(&self) -> &dyn Any;
}

/// The erased value type that flows between scopes and hooks.
///
/// # Variants
///
/// Eight scalar kinds mirror the type-cast symbols of the scope
/// grammar (`Z B S I J F D C`), plus strings (`$`), null, and the
/// extensible `Object` variant.
///
/// # Hybrid Design
///
/// Scalars stay stack-allocated (fast path), while `Object` provides
/// extensibility via heap-allocated trait objects.
///
/// # Example
///
/// ```
/// use snare::Value;
///
/// let v = Value::Str("hello".to_string());
/// assert_eq!(v.as_str(), Some("hello"));
/// assert!(!v.is_null());
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// No value. Passes type casts unchanged; class-cast guards reject it.
    Null,
    /// Boolean (`Z`).
    Bool(bool),
    /// 8-bit signed integer (`B`).
    Byte(i8),
    /// 16-bit signed integer (`S`).
    Short(i16),
    /// 32-bit signed integer (`I`).
    Int(i32),
    /// 64-bit signed integer (`J`).
    Long(i64),
    /// 32-bit float (`F`).
    Float(f32),
    /// 64-bit float (`D`).
    Double(f64),
    /// Single character (`C`).
    Char(char),
    /// String (`$`).
    Str(String),
    /// Structured subject for scopes to descend into.
    ///
    /// Wrap your [`TrapObject`] implementation with `Arc`:
    /// ```
    /// use std::sync::Arc;
    /// use snare::{TrapObject, Value};
    /// # use std::any::Any;
    /// # #[derive(Debug)] struct MyType;
    /// # impl TrapObject for MyType {
    /// #     fn class_name(&self) -> &str { "my.Type" }
    /// #     fn as_any(&self) -> &dyn Any { self }
    /// # }
    ///
    /// let v = Value::Object(Arc::new(MyType));
    /// ```
    Object(Arc<dyn TrapObject>),
}

// Manual PartialEq because trait objects don't auto-derive it.
// Object variants compare by Arc pointer identity (same allocation = equal).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Returns `true` if this is the `Null` variant.
    ///
    /// # Example
    ///
    /// ```
    /// use snare::Value;
    ///
    /// assert!(Value::Null.is_null());
    /// assert!(!Value::Int(0).is_null());
    /// ```
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if this is the `Object` variant.
    #[inline]
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Returns the string if this is the `Str` variant.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the object if this is the `Object` variant.
    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&Arc<dyn TrapObject>> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The kind tag of this value, if it has one.
    ///
    /// `Null` carries no kind: it is accepted by any type cast and
    /// rejected by class-cast guards.
    #[must_use]
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Byte(_) => Some(ValueKind::Byte),
            Self::Short(_) => Some(ValueKind::Short),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Long(_) => Some(ValueKind::Long),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Double(_) => Some(ValueKind::Double),
            Self::Char(_) => Some(ValueKind::Char),
            Self::Str(_) => Some(ValueKind::Str),
            Self::Object(_) => Some(ValueKind::Object),
        }
    }

    /// Human-readable type name for diagnostics.
    ///
    /// For objects this is the runtime class name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Byte(_) => "byte",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Char(_) => "char",
            Self::Str(_) => "string",
            Self::Object(o) => o.class_name(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Self::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Self::Char(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<Arc<dyn TrapObject>> for Value {
    fn from(v: Arc<dyn TrapObject>) -> Self {
        Self::Object(v)
    }
}

/// The closed set of value kinds.
///
/// Keys hook construction and names type-cast scopes. The symbols in
/// the scope grammar map one-to-one onto these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `Z`
    Bool,
    /// `B`
    Byte,
    /// `S`
    Short,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `C`
    Char,
    /// `$`
    Str,
    /// Structured subject; hooks fall back to the object latch.
    Object,
}

impl ValueKind {
    /// Parse a single type-cast symbol from the scope grammar.
    #[must_use]
    pub fn from_symbol(sym: char) -> Option<Self> {
        match sym {
            'Z' => Some(Self::Bool),
            'B' => Some(Self::Byte),
            'S' => Some(Self::Short),
            'I' => Some(Self::Int),
            'J' => Some(Self::Long),
            'F' => Some(Self::Float),
            'D' => Some(Self::Double),
            'C' => Some(Self::Char),
            '$' => Some(Self::Str),
            _ => None,
        }
    }

    /// The scope-grammar symbol for this kind, if it has one.
    #[must_use]
    pub fn symbol(self) -> Option<char> {
        match self {
            Self::Bool => Some('Z'),
            Self::Byte => Some('B'),
            Self::Short => Some('S'),
            Self::Int => Some('I'),
            Self::Long => Some('J'),
            Self::Float => Some('F'),
            Self::Double => Some('D'),
            Self::Char => Some('C'),
            Self::Str => Some('$'),
            Self::Object => None,
        }
    }

    /// Human-readable kind name for diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
            Self::Str => "string",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
