use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use super::naming::hook_name;
use super::Class;
use crate::error::Result;
use crate::instance::Instance;

type BehaviorFn = dyn Fn(&Instance, &[Value]) -> Result<Value>;
type ConstructorFn = dyn Fn(&Class, &Instance, &[Value]) -> Result<()>;

/// A callable class member, invoked with the receiving instance.
#[derive(Clone)]
pub struct Behavior(Rc<BehaviorFn>);

impl Behavior {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> Result<Value> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, this: &Instance, args: &[Value]) -> Result<Value> {
        (self.0)(this, args)
    }

    pub fn ptr_eq(&self, other: &Behavior) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Behavior")
            .field(&(Rc::as_ptr(&self.0) as *const ()))
            .finish()
    }
}

/// An explicit construction routine.
///
/// It receives the class that declared it, so the body can chain to the
/// parent with [`Class::construct_super`].
#[derive(Clone)]
pub struct Constructor(Rc<ConstructorFn>);

impl Constructor {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Class, &Instance, &[Value]) -> Result<()> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, class: &Class, this: &Instance, args: &[Value]) -> Result<()> {
        (self.0)(class, this, args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor").finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Member {
    Property(Value),
    Behavior(Behavior),
}

/// Ordered member map handed to [`Class::extend`].
///
/// Re-declaring a name replaces the earlier entry in place.
///
/// ```
/// use crux::{create, Members};
/// use serde_json::json;
///
/// let counter = create(
///     Members::named("Counter")
///         .property("count", 0)
///         .hook("count", |this, _new, _prior| {
///             this.set("touched", json!(true))
///         })
///         .property("touched", false),
/// )
/// .unwrap();
/// let obj = counter.construct(&[]).unwrap();
/// obj.set("count", json!(1)).unwrap();
/// assert_eq!(obj.get("touched"), Some(json!(true)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Members {
    pub(crate) name: Option<String>,
    pub(crate) entries: IndexMap<String, Member>,
    pub(crate) constructor: Option<Constructor>,
}

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a member map for a class with a display name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Declares an observable property with its default value.
    pub fn property(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.entries
            .insert(name.into(), Member::Property(default.into()));
        self
    }

    pub fn behavior<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> Result<Value> + 'static,
    {
        self.entries
            .insert(name.into(), Member::Behavior(Behavior::new(f)));
        self
    }

    /// Declares the change hook of `property` (the `<property>Changed`
    /// behavior), called with the new and the prior value.
    pub fn hook<F>(self, property: &str, f: F) -> Self
    where
        F: Fn(&Instance, &Value, &Value) -> Result<()> + 'static,
    {
        self.behavior(hook_name(property), move |this, args| {
            let new_val = args.first().unwrap_or(&Value::Null);
            let prior_val = args.get(1).unwrap_or(&Value::Null);
            f(this, new_val, prior_val)?;
            Ok(Value::Null)
        })
    }

    pub fn constructor<F>(mut self, f: F) -> Self
    where
        F: Fn(&Class, &Instance, &[Value]) -> Result<()> + 'static,
    {
        self.constructor = Some(Constructor::new(f));
        self
    }
}
