//! `ClassDict` — explicit class schema standing in for runtime reflection
//!
//! Scope compilation needs to answer two questions statically: does a
//! class have this member, and what type does the member produce. The
//! dictionary carries that schema, registered up front by the host.
//!
//! Class names resolve by unambiguous dotted suffix, so a rule can say
//! `Order` instead of `demo.shop.Order` as long as only one registered
//! class ends that way.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::TrapError;
use crate::value::ValueKind;

/// The static type a member produces: a scalar kind or another class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A scalar or string kind.
    Kind(ValueKind),
    /// A registered class, by fully qualified name.
    Class(String),
}

impl TypeRef {
    /// The value kind this type produces at runtime.
    ///
    /// Classes produce `Object`.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Kind(k) => *k,
            Self::Class(_) => ValueKind::Object,
        }
    }

    /// The class name, if this is a class reference.
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        match self {
            Self::Class(name) => Some(name),
            Self::Kind(_) => None,
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kind(k) => k.fmt(f),
            Self::Class(name) => f.write_str(name),
        }
    }
}

/// Schema for one class: ancestry plus typed members.
///
/// `supers` lists direct superclasses and interfaces by fully
/// qualified name; member lookup walks the closure transitively.
///
/// # Example
///
/// ```
/// use snare::{ClassSpec, TypeRef, ValueKind};
///
/// let spec = ClassSpec::new("demo.Order")
///     .with_super("demo.Document")
///     .with_field("total", TypeRef::Kind(ValueKind::Long))
///     .with_getter("Customer", TypeRef::Class("demo.Customer".into()));
/// assert_eq!(spec.name(), "demo.Order");
/// ```
#[derive(Debug, Clone)]
pub struct ClassSpec {
    name: String,
    supers: Vec<String>,
    fields: BTreeMap<String, TypeRef>,
    getters: BTreeMap<String, TypeRef>,
}

impl ClassSpec {
    /// Start a spec for a fully qualified class name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supers: Vec::new(),
            fields: BTreeMap::new(),
            getters: BTreeMap::new(),
        }
    }

    /// Add a direct superclass or interface.
    #[must_use]
    pub fn with_super(mut self, name: impl Into<String>) -> Self {
        self.supers.push(name.into());
        self
    }

    /// Add a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }

    /// Add a no-argument getter.
    #[must_use]
    pub fn with_getter(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.getters.insert(name.into(), ty);
        self
    }

    /// Fully qualified class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct superclasses and interfaces.
    #[must_use]
    pub fn supers(&self) -> &[String] {
        &self.supers
    }

    fn field(&self, name: &str) -> Option<&TypeRef> {
        self.fields.get(name)
    }

    fn getter(&self, name: &str) -> Option<&TypeRef> {
        self.getters.get(name)
    }
}

/// Registry of class specs with suffix-based name resolution.
///
/// # Example
///
/// ```
/// use snare::{ClassDict, ClassSpec, TypeRef, ValueKind};
///
/// let mut dict = ClassDict::new();
/// dict.register(
///     ClassSpec::new("demo.Order").with_field("total", TypeRef::Kind(ValueKind::Long)),
/// )
/// .unwrap();
///
/// let spec = dict.resolve("Order").unwrap();
/// assert_eq!(spec.name(), "demo.Order");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClassDict {
    classes: BTreeMap<String, Arc<ClassSpec>>,
}

impl ClassDict {
    /// Create an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class spec. Registering the same name twice is fatal.
    pub fn register(&mut self, spec: ClassSpec) -> Result<(), TrapError> {
        let name = spec.name.clone();
        if self.classes.contains_key(&name) {
            return Err(TrapError::DuplicateClass { name });
        }
        self.classes.insert(name, Arc::new(spec));
        Ok(())
    }

    /// All registered class names, in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }

    /// Look up a class by exact fully qualified name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ClassSpec>> {
        self.classes.get(name).cloned()
    }

    /// Resolve a class by fully qualified name or unambiguous dotted suffix.
    ///
    /// `Order` resolves `demo.Order` if no other registered class ends
    /// with `.Order`. The suffix must align on a dot boundary.
    pub fn resolve(&self, name: &str) -> Result<Arc<ClassSpec>, TrapError> {
        if let Some(spec) = self.classes.get(name) {
            return Ok(Arc::clone(spec));
        }

        let dotted = format!(".{name}");
        let matches: Vec<&Arc<ClassSpec>> = self
            .classes
            .values()
            .filter(|spec| spec.name.ends_with(&dotted))
            .collect();

        match matches.len() {
            0 => Err(TrapError::UnknownClass {
                name: name.to_string(),
                available: self.names(),
            }),
            1 => Ok(Arc::clone(matches[0])),
            _ => Err(TrapError::AmbiguousClass {
                name: name.to_string(),
                candidates: matches.iter().map(|s| s.name.clone()).collect(),
            }),
        }
    }

    /// Whether `sub` is `sup` or lists it anywhere in its super closure.
    #[must_use]
    pub fn assignable(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        let mut pending = match self.classes.get(sub) {
            Some(spec) => spec.supers.clone(),
            None => return false,
        };
        let mut seen = Vec::new();
        while let Some(next) = pending.pop() {
            if next == sup {
                return true;
            }
            if seen.contains(&next) {
                continue;
            }
            if let Some(spec) = self.classes.get(&next) {
                pending.extend(spec.supers.iter().cloned());
            }
            seen.push(next);
        }
        false
    }

    /// Find a field in `class` or its ancestry.
    pub fn lookup_field(&self, class: &str, field: &str) -> Result<TypeRef, TrapError> {
        self.lookup_member(class, field, ClassSpec::field)
            .ok_or_else(|| TrapError::FieldNotFound {
                field: field.to_string(),
                class: class.to_string(),
            })
    }

    /// Find a getter in `class` or its ancestry.
    pub fn lookup_getter(&self, class: &str, getter: &str) -> Result<TypeRef, TrapError> {
        self.lookup_member(class, getter, ClassSpec::getter)
            .ok_or_else(|| TrapError::GetterNotFound {
                getter: getter.to_string(),
                class: class.to_string(),
            })
    }

    // Breadth-first over the super closure so the nearest declaration wins.
    fn lookup_member(
        &self,
        class: &str,
        member: &str,
        pick: impl for<'a> Fn(&'a ClassSpec, &'a str) -> Option<&'a TypeRef> + Copy,
    ) -> Option<TypeRef> {
        let mut queue = vec![class.to_string()];
        let mut seen = Vec::new();
        let mut at = 0;
        while at < queue.len() {
            let name = queue[at].clone();
            at += 1;
            if seen.contains(&name) {
                continue;
            }
            if let Some(spec) = self.classes.get(&name) {
                if let Some(ty) = pick(spec, member) {
                    return Some(ty.clone());
                }
                queue.extend(spec.supers.iter().cloned());
            }
            seen.push(name);
        }
        None
    }
}
