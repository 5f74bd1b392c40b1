//! Rule ingestion — keys, rule sets, and rule-text field splitting
//!
//! A rule set is an ordered snapshot of `key = text` entries. Keys are
//! decoded once at ingestion into [`RuleKey`]; the program compiler
//! never re-parses them. Text sources accept `#` and `;` comment lines
//! and blank lines; JSON objects load behind the `json` feature.

use std::collections::BTreeMap;

use crate::error::TrapError;

/// A decoded rule key: optional group plus rule name.
///
/// The wire form is `Group$Name` for grouped rules and plain `Name`
/// otherwise. Grouped rules compile into a contiguous OR-chain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleKey {
    /// The group this rule belongs to, if any.
    pub group: Option<String>,
    /// The rule's own name.
    pub name: String,
}

impl RuleKey {
    /// Decode a wire-form key. Text up to the first `$` is the group.
    #[must_use]
    pub fn decode(key: &str) -> Self {
        match key.split_once('$') {
            Some((group, name)) if !group.is_empty() => Self {
                group: Some(group.to_string()),
                name: name.to_string(),
            },
            _ => Self {
                group: None,
                name: key.to_string(),
            },
        }
    }

    /// The full wire-form key, used as fork name and jump target.
    #[must_use]
    pub fn full(&self) -> String {
        match &self.group {
            Some(group) => format!("{group}${}", self.name),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for RuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(group) = &self.group {
            write!(f, "{group}$")?;
        }
        f.write_str(&self.name)
    }
}

/// The three fields of a rule's text, split on unescaped `:`.
///
/// `hook` and `script` distinguish absent (`None`) from present but
/// empty: an empty hook field means no hook, while an empty script
/// field selects the default assign-scope behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleText {
    /// The scope path.
    pub scope: String,
    /// The hook condition, when the second field is present.
    pub hook: Option<String>,
    /// The script descriptor, when the third field is present.
    pub script: Option<String>,
}

/// Split rule text into scope, hook, and script fields.
///
/// Separators are `:` characters outside double quotes and not
/// preceded by a backslash; `\:` in a field is unescaped to a literal
/// colon. At most three fields: any further `:` belongs to the script
/// descriptor.
#[must_use]
pub fn split_rule_text(text: &str) -> RuleText {
    let mut fields: Vec<String> = vec![String::new()];
    let mut in_quotes = false;
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            let last = fields.last_mut().expect("at least one field");
            if c != ':' {
                last.push('\\');
            }
            last.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if fields.len() < 3 => escaped = true,
            '"' => {
                in_quotes = !in_quotes;
                fields.last_mut().expect("at least one field").push(c);
            }
            ':' if !in_quotes && fields.len() < 3 => fields.push(String::new()),
            _ => fields.last_mut().expect("at least one field").push(c),
        }
    }
    if escaped {
        fields.last_mut().expect("at least one field").push('\\');
    }

    let mut it = fields.into_iter();
    RuleText {
        scope: it.next().unwrap_or_default(),
        hook: it.next(),
        script: it.next(),
    }
}

/// An ordered rule snapshot: decoded keys mapped to raw rule text.
///
/// Iteration order is the sorted wire-form key order, which is also
/// program declaration order for ungrouped rules.
///
/// # Example
///
/// ```
/// use snare::RuleSet;
///
/// let rules = RuleSet::from_text(
///     "# watched rules\n\
///      Adult = @age:>18\n\
///      G$Big = @total:>1000\n",
/// )
/// .unwrap();
/// assert_eq!(rules.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: BTreeMap<String, (RuleKey, String)>,
}

impl RuleSet {
    /// Create an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one rule. A repeated key replaces the earlier text.
    pub fn insert(&mut self, key: &str, text: impl Into<String>) {
        self.rules
            .insert(key.to_string(), (RuleKey::decode(key), text.into()));
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&RuleKey, &str)> {
        self.rules.values().map(|(key, text)| (key, text.as_str()))
    }

    /// Parse `key = value` lines.
    ///
    /// Blank lines and lines starting with `#` or `;` are skipped.
    /// Keys and values are trimmed. A non-comment line without `=` is
    /// a parse error naming the line number.
    pub fn from_text(source: &str) -> Result<Self, TrapError> {
        let mut rules = Self::new();
        for (idx, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let (key, text) = line.split_once('=').ok_or_else(|| TrapError::ConfigParse {
                detail: format!("line {}: expected \"key = rule\", got \"{line}\"", idx + 1),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(TrapError::ConfigParse {
                    detail: format!("line {}: empty rule key", idx + 1),
                });
            }
            rules.insert(key, text.trim());
        }
        Ok(rules)
    }

    /// Parse a JSON object of `key: text` pairs.
    #[cfg(feature = "json")]
    pub fn from_json(source: &str) -> Result<Self, TrapError> {
        let map: BTreeMap<String, String> =
            serde_json::from_str(source).map_err(|e| TrapError::ConfigParse {
                detail: e.to_string(),
            })?;
        let mut rules = Self::new();
        for (key, text) in map {
            rules.insert(&key, text);
        }
        Ok(rules)
    }
}
