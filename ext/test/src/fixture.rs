//! Conformance test fixture runner
//!
//! Loads YAML fixtures and runs them against the trap engine over the
//! shop domain.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use snare::{RuleSet, Trap, TrapError, Value};

use crate::{dict, order_base, Address, Customer, Order, VipCustomer};

/// A complete fixture: one rule set plus its expectation cases.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Wire-form rule keys to rule text.
    pub rules: BTreeMap<String, String>,
    pub cases: Vec<TestCase>,
}

/// One subject and the rule expected to trap it.
#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub subject: SubjectSpec,
    /// Full name of the rule expected to match, absent for no match.
    #[serde(default)]
    pub expect: Option<String>,
}

/// Declarative order graph. Omitted members stay null.
#[derive(Debug, Deserialize)]
pub struct SubjectSpec {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub total: f64,
    #[serde(default = "default_priority")]
    pub priority: char,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub customer: Option<CustomerSpec>,
}

fn default_priority() -> char {
    'N'
}

/// Declarative customer. A present `tier` selects the vip subclass.
#[derive(Debug, Deserialize)]
pub struct CustomerSpec {
    pub name: String,
    #[serde(default)]
    pub age: i32,
    #[serde(default)]
    pub vip: bool,
    #[serde(default)]
    pub tier: Option<i8>,
    #[serde(default)]
    pub address: Option<AddressSpec>,
}

#[derive(Debug, Deserialize)]
pub struct AddressSpec {
    pub city: String,
    #[serde(default)]
    pub zip: String,
}

impl SubjectSpec {
    /// Build the subject value this spec describes.
    #[must_use]
    pub fn build(&self) -> Value {
        let mut order = Order::new(self.id, self.total).priority(self.priority);
        if let Some(note) = &self.note {
            order = order.note(note.clone());
        }
        if let Some(spec) = &self.customer {
            order = match spec.tier {
                Some(tier) => {
                    let mut vip = VipCustomer::new(spec.name.clone(), spec.age, tier);
                    if let Some(a) = &spec.address {
                        vip = vip.address(Address::new(a.city.clone(), a.zip.clone()));
                    }
                    order.customer(vip)
                }
                None => {
                    let mut customer = Customer::new(spec.name.clone(), spec.age);
                    if spec.vip {
                        customer = customer.vip();
                    }
                    if let Some(a) = &spec.address {
                        customer = customer.address(Address::new(a.city.clone(), a.zip.clone()));
                    }
                    order.customer(customer)
                }
            };
        }
        order.into_subject()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of running a single test case.
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl Fixture {
    /// Parse a fixture from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators.
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Compile the rule set and flow every case through it.
    pub fn run(&self) -> Result<Vec<CaseResult>, TrapError> {
        let trap = Trap::new(order_base(), Arc::new(dict()));
        let mut rules = RuleSet::new();
        for (key, text) in &self.rules {
            rules.insert(key, text.clone());
        }
        trap.update(&rules)?;

        Ok(self
            .cases
            .iter()
            .map(|case| {
                let subject = case.subject.build();
                let mut actual = None;
                trap.flow(&subject, |_, fork| actual = Some(fork.name().to_string()));
                CaseResult {
                    case_name: case.name.clone(),
                    passed: actual == case.expect,
                    expected: case.expect.clone(),
                    actual,
                }
            })
            .collect())
    }

    /// Run all test cases and panic on the first failure.
    pub fn run_and_assert(&self) {
        let results = self
            .run()
            .unwrap_or_else(|e| panic!("Fixture '{}' failed to compile: {e}", self.name));
        for result in results {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: expected {:?}, got {:?}",
                self.name, result.case_name, result.expected, result.actual
            );
        }
    }
}
