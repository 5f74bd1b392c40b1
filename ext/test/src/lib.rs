//! snare-test: Shop domain for conformance testing
//!
//! Provides a small object graph (orders, customers, addresses) that
//! implements `TrapObject`, plus the class dictionary rules compile
//! against. This is the reference subject domain that demonstrates how
//! to expose an application type to the trap engine.
//!
//! # Example
//!
//! ```
//! use snare_test::prelude::*;
//!
//! let subject = Order::new(7, 250.0)
//!     .priority('H')
//!     .customer(Customer::new("alice", 34))
//!     .into_subject();
//!
//! let trap = Trap::new(order_base(), Arc::new(dict()));
//! let mut rules = RuleSet::new();
//! rules.insert("Big", "@total:>100");
//! trap.update(&rules).unwrap();
//!
//! let mut hits = Vec::new();
//! trap.flow(&subject, |_, fork| hits.push(fork.name().to_string()));
//! assert_eq!(hits, ["Big"]);
//! ```

use std::any::Any;
use std::sync::Arc;

use snare::prelude::*;
use snare::AccessError;

#[cfg(feature = "fixtures")]
pub mod fixture;

fn no_member(class: &str, member: &str, what: &str) -> AccessError {
    AccessError {
        member: member.to_string(),
        class: class.to_string(),
        detail: format!("no such {what}"),
    }
}

/// A shop order: the base subject type of the test domain.
///
/// Fields: `id` (J), `total` (D), `priority` (C), `note` ($, nullable).
/// Getter: `Customer` (shop.Customer, nullable).
#[derive(Debug)]
pub struct Order {
    id: i64,
    total: f64,
    priority: char,
    note: Option<String>,
    customer: Option<Arc<dyn TrapObject>>,
}

impl Order {
    /// Create an order with default priority `'N'` and no customer.
    #[must_use]
    pub fn new(id: i64, total: f64) -> Self {
        Self {
            id,
            total,
            priority: 'N',
            note: None,
            customer: None,
        }
    }

    /// Set the priority flag (builder pattern).
    #[must_use]
    pub fn priority(mut self, priority: char) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a note (builder pattern).
    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attach a customer (builder pattern).
    #[must_use]
    pub fn customer(mut self, customer: impl TrapObject + 'static) -> Self {
        self.customer = Some(Arc::new(customer));
        self
    }

    /// Wrap this order into a flowable subject value.
    #[must_use]
    pub fn into_subject(self) -> Value {
        Value::Object(Arc::new(self))
    }
}

impl TrapObject for Order {
    fn class_name(&self) -> &str {
        "shop.Order"
    }

    fn field(&self, name: &str) -> Result<Value, AccessError> {
        match name {
            "id" => Ok(Value::Long(self.id)),
            "total" => Ok(Value::Double(self.total)),
            "priority" => Ok(Value::Char(self.priority)),
            "note" => Ok(self.note.clone().map_or(Value::Null, Value::Str)),
            _ => Err(no_member(self.class_name(), name, "field")),
        }
    }

    fn getter(&self, name: &str) -> Result<Value, AccessError> {
        match name {
            "Customer" => Ok(match &self.customer {
                Some(c) => Value::Object(Arc::clone(c)),
                None => Value::Null,
            }),
            _ => Err(no_member(self.class_name(), name, "getter")),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A customer attached to an order.
///
/// Fields: `name` ($), `age` (I), `vip` (Z).
/// Getter: `Address` (shop.Address, nullable).
#[derive(Debug)]
pub struct Customer {
    name: String,
    age: i32,
    vip: bool,
    address: Option<Arc<Address>>,
}

impl Customer {
    /// Create a non-vip customer without an address.
    #[must_use]
    pub fn new(name: impl Into<String>, age: i32) -> Self {
        Self {
            name: name.into(),
            age,
            vip: false,
            address: None,
        }
    }

    /// Mark the customer as vip (builder pattern).
    #[must_use]
    pub fn vip(mut self) -> Self {
        self.vip = true;
        self
    }

    /// Attach an address (builder pattern).
    #[must_use]
    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(Arc::new(address));
        self
    }
}

impl TrapObject for Customer {
    fn class_name(&self) -> &str {
        "shop.Customer"
    }

    fn field(&self, name: &str) -> Result<Value, AccessError> {
        match name {
            "name" => Ok(Value::Str(self.name.clone())),
            "age" => Ok(Value::Int(self.age)),
            "vip" => Ok(Value::Bool(self.vip)),
            _ => Err(no_member(self.class_name(), name, "field")),
        }
    }

    fn getter(&self, name: &str) -> Result<Value, AccessError> {
        match name {
            "Address" => Ok(match &self.address {
                Some(a) => Value::Object(Arc::clone(a) as Arc<dyn TrapObject>),
                None => Value::Null,
            }),
            _ => Err(no_member(self.class_name(), name, "getter")),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A vip customer subclass with a loyalty tier.
///
/// Assignable to `shop.Customer`; adds the `tier` (B) field.
#[derive(Debug)]
pub struct VipCustomer {
    inner: Customer,
    tier: i8,
}

impl VipCustomer {
    /// Create a vip customer at the given loyalty tier.
    #[must_use]
    pub fn new(name: impl Into<String>, age: i32, tier: i8) -> Self {
        Self {
            inner: Customer::new(name, age).vip(),
            tier,
        }
    }

    /// Attach an address (builder pattern).
    #[must_use]
    pub fn address(mut self, address: Address) -> Self {
        self.inner = self.inner.address(address);
        self
    }
}

impl TrapObject for VipCustomer {
    fn class_name(&self) -> &str {
        "shop.VipCustomer"
    }

    fn instance_of(&self, class: &str) -> bool {
        class == "shop.VipCustomer" || class == "shop.Customer"
    }

    fn field(&self, name: &str) -> Result<Value, AccessError> {
        match name {
            "tier" => Ok(Value::Byte(self.tier)),
            _ => self.inner.field(name),
        }
    }

    fn getter(&self, name: &str) -> Result<Value, AccessError> {
        self.inner.getter(name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A postal address.
///
/// Fields: `city` ($), `zip` ($).
#[derive(Debug)]
pub struct Address {
    city: String,
    zip: String,
}

impl Address {
    /// Create an address.
    #[must_use]
    pub fn new(city: impl Into<String>, zip: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            zip: zip.into(),
        }
    }
}

impl TrapObject for Address {
    fn class_name(&self) -> &str {
        "shop.Address"
    }

    fn field(&self, name: &str) -> Result<Value, AccessError> {
        match name {
            "city" => Ok(Value::Str(self.city.clone())),
            "zip" => Ok(Value::Str(self.zip.clone())),
            _ => Err(no_member(self.class_name(), name, "field")),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The class dictionary for the shop domain.
#[must_use]
pub fn dict() -> ClassDict {
    let mut d = ClassDict::new();
    d.register(
        ClassSpec::new("shop.Address")
            .with_field("city", TypeRef::Kind(ValueKind::Str))
            .with_field("zip", TypeRef::Kind(ValueKind::Str)),
    )
    .expect("fresh dictionary");
    d.register(
        ClassSpec::new("shop.Customer")
            .with_field("name", TypeRef::Kind(ValueKind::Str))
            .with_field("age", TypeRef::Kind(ValueKind::Int))
            .with_field("vip", TypeRef::Kind(ValueKind::Bool))
            .with_getter("Address", TypeRef::Class("shop.Address".into())),
    )
    .expect("fresh dictionary");
    d.register(
        ClassSpec::new("shop.VipCustomer")
            .with_super("shop.Customer")
            .with_field("tier", TypeRef::Kind(ValueKind::Byte)),
    )
    .expect("fresh dictionary");
    d.register(
        ClassSpec::new("shop.Order")
            .with_field("id", TypeRef::Kind(ValueKind::Long))
            .with_field("total", TypeRef::Kind(ValueKind::Double))
            .with_field("priority", TypeRef::Kind(ValueKind::Char))
            .with_field("note", TypeRef::Kind(ValueKind::Str))
            .with_getter("Customer", TypeRef::Class("shop.Customer".into())),
    )
    .expect("fresh dictionary");
    d
}

/// The base type shop traps flow subjects as.
#[must_use]
pub fn order_base() -> TypeRef {
    TypeRef::Class("shop.Order".into())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{dict, order_base, Address, Customer, Order, VipCustomer};
    pub use snare::prelude::*;
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_fields() {
        let order = Order::new(7, 99.5).priority('H').note("rush");
        assert_eq!(order.field("id").unwrap(), Value::Long(7));
        assert_eq!(order.field("total").unwrap(), Value::Double(99.5));
        assert_eq!(order.field("priority").unwrap(), Value::Char('H'));
        assert_eq!(order.field("note").unwrap(), Value::Str("rush".into()));
        assert!(order.field("missing").is_err());
    }

    #[test]
    fn test_absent_members_are_null() {
        let order = Order::new(1, 0.0);
        assert_eq!(order.field("note").unwrap(), Value::Null);
        assert_eq!(order.getter("Customer").unwrap(), Value::Null);
    }

    #[test]
    fn test_vip_customer_is_a_customer() {
        let vip = VipCustomer::new("bob", 40, 3);
        assert!(vip.instance_of("shop.Customer"));
        assert!(vip.instance_of("shop.VipCustomer"));
        assert_eq!(vip.field("tier").unwrap(), Value::Byte(3));
        assert_eq!(vip.field("vip").unwrap(), Value::Bool(true));
        assert_eq!(vip.field("age").unwrap(), Value::Int(40));
    }

    #[test]
    fn test_dict_covers_the_domain() {
        let d = dict();
        assert!(d.assignable("shop.VipCustomer", "shop.Customer"));
        assert_eq!(d.resolve("Order").unwrap().name(), "shop.Order");
    }

    #[test]
    fn test_full_trap_round() {
        let trap = Trap::new(order_base(), Arc::new(dict()));
        let mut rules = RuleSet::new();
        rules.insert("SeniorVip", ">Customer@age:>65");
        trap.update(&rules).unwrap();

        let subject = Order::new(1, 10.0)
            .customer(Customer::new("carol", 70))
            .into_subject();
        let mut hits = Vec::new();
        trap.flow(&subject, |_, fork| hits.push(fork.name().to_string()));
        assert_eq!(hits, ["SeniorVip"]);
    }
}
