//! Instances and the property setter.
//!
//! An [`Instance`] is a reference-counted handle: clones address the same
//! object, and the object dies with its last strong handle. Hidden state
//! (property slots and the callbacks map) is owned by that one object.
//!
//! # Re-entrancy
//!
//! No borrow of the instance is held while a change hook or an event handler
//! runs. A write issued from inside a hook or handler is therefore a plain
//! recursive call that completes before the outer write continues. There is
//! no guard against cycles: two instances bound to each other whose values
//! keep changing recurse until the stack is exhausted.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde_json::Value;

use crate::change::{ChangeSet, SetOptions};
use crate::class::naming::hook_name;
use crate::class::{Accessor, Class};
use crate::error::{Error, Result};
use crate::events::{Emitter, CHANGED};

pub(crate) struct InstanceInner {
    class: Class,
    state: RefCell<IndexMap<String, Value>>,
    pub(crate) emitter: RefCell<Emitter>,
}

#[derive(Clone)]
pub struct Instance {
    pub(crate) inner: Rc<InstanceInner>,
}

/// Non-owning handle to an [`Instance`].
#[derive(Clone, Default)]
pub struct WeakInstance(Weak<InstanceInner>);

impl WeakInstance {
    pub fn upgrade(&self) -> Option<Instance> {
        self.0.upgrade().map(|inner| Instance { inner })
    }
}

impl fmt::Debug for WeakInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakInstance")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

impl Instance {
    /// Fills every slot from the class defaults. No hook runs and no event is
    /// emitted: there is no prior value yet.
    pub(crate) fn with_defaults(class: &Class) -> Self {
        Self {
            inner: Rc::new(InstanceInner {
                class: class.clone(),
                state: RefCell::new(class.schema().clone()),
                emitter: RefCell::new(Emitter::default()),
            }),
        }
    }

    pub fn class(&self) -> &Class {
        &self.inner.class
    }

    pub fn is_instance_of(&self, class: &Class) -> bool {
        self.inner.class.is_subclass_of(class)
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance(Rc::downgrade(&self.inner))
    }

    /// Current value of an observable property.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.state.borrow().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.set_with(name, value, SetOptions::default())
    }

    /// Writes an observable property.
    ///
    /// When the value differs from the stored one: store it, run the
    /// `<name>Changed` hook with `[new, prior]`, then, unless `options.quiet`,
    /// trigger [`CHANGED`] with a one-entry change set. An equal value does
    /// nothing at all; numbers compare by value, so `1.0` over `1` is equal.
    pub fn set_with(&self, name: &str, value: impl Into<Value>, options: SetOptions) -> Result<()> {
        let value = value.into();
        let prior = {
            let mut state = self.inner.state.borrow_mut();
            let slot = state
                .get_mut(name)
                .ok_or_else(|| Error::UnknownProperty(name.to_string()))?;
            if same_value(slot, &value) {
                return Ok(());
            }
            std::mem::replace(slot, value.clone())
        };
        tracing::trace!(
            class = %self.class().name(),
            property = name,
            quiet = options.quiet,
            "property changed"
        );

        if let Some(hook) = self.class().method(&hook_name(name)) {
            hook.call(self, &[value.clone(), prior.clone()])?;
        }
        if !options.quiet {
            let changes = ChangeSet::single(name, value, prior);
            self.trigger(CHANGED, &[changes.to_value()])?;
        }
        Ok(())
    }

    /// Invokes a behavior or a synthesized `get<Name>`/`set<Name>` accessor.
    ///
    /// `set<Name>` takes the value and optional setter options, e.g.
    /// `[42, {"quiet": true}]`, and returns `null`.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        if let Some(behavior) = self.class().method(name) {
            return behavior.call(self, args);
        }
        match self.class().accessor(name) {
            Some(Accessor::Get(property)) => self
                .get(property)
                .ok_or_else(|| Error::UnknownProperty(property.clone())),
            Some(Accessor::Set(property)) => {
                let options = SetOptions::from_value(args.get(1))?;
                let value = args.first().cloned().unwrap_or(Value::Null);
                self.set_with(property, value, options)?;
                Ok(Value::Null)
            }
            None => Err(Error::UnknownMember(name.to_string())),
        }
    }

    /// `true` when `name` is a behavior or a synthesized accessor.
    pub fn responds_to(&self, name: &str) -> bool {
        self.class().method(name).is_some() || self.class().accessor(name).is_some()
    }
}

/// Structural equality where numbers compare by numeric value.
///
/// `serde_json` keeps `1` and `1.0` as distinct numbers; a write of either
/// over the other is not a change.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x == y || ((x.is_f64() || y.is_f64()) && x.as_f64() == y.as_f64())
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| same_value(x, y)))
        }
        _ => a == b,
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.inner.class.name())
            .field("state", &self.inner.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{create, Members};
    use crate::events::Handler;
    use serde_json::json;

    fn events(obj: &Instance) -> Rc<RefCell<Vec<Value>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        obj.listen(
            CHANGED,
            Handler::new(move |_, args| {
                log_clone.borrow_mut().push(args[0].clone());
                Ok(())
            }),
        );
        log
    }

    #[test]
    fn defaults_are_copied_per_instance() {
        let class = create(Members::new().property("items", json!([]))).unwrap();
        let a = class.construct(&[]).unwrap();
        let b = class.construct(&[]).unwrap();
        a.set("items", json!([1])).unwrap();
        assert_eq!(a.get("items"), Some(json!([1])));
        assert_eq!(b.get("items"), Some(json!([])));
    }

    #[test]
    fn construction_is_silent() {
        let hits = Rc::new(RefCell::new(0));
        let hits_clone = Rc::clone(&hits);
        let class = create(Members::new().property("x", 5).hook("x", move |_, _, _| {
            *hits_clone.borrow_mut() += 1;
            Ok(())
        }))
        .unwrap();
        let obj = class.construct(&[]).unwrap();
        assert_eq!(obj.get("x"), Some(json!(5)));
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn equal_write_is_a_no_op() {
        let hits = Rc::new(RefCell::new(0));
        let hits_clone = Rc::clone(&hits);
        let class = create(Members::new().property("x", json!({"a": [1]})).hook("x", move |_, _, _| {
            *hits_clone.borrow_mut() += 1;
            Ok(())
        }))
        .unwrap();
        let obj = class.construct(&[]).unwrap();
        let log = events(&obj);
        obj.set("x", json!({"a": [1]})).unwrap();
        assert_eq!(*hits.borrow(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn hook_runs_before_event() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let hook_order = Rc::clone(&order);
        let class = create(Members::new().property("x", 0).hook("x", move |_, new, prior| {
            hook_order.borrow_mut().push(format!("hook {prior}->{new}"));
            Ok(())
        }))
        .unwrap();
        let obj = class.construct(&[]).unwrap();
        let event_order = Rc::clone(&order);
        obj.listen(
            CHANGED,
            Handler::new(move |_, _| {
                event_order.borrow_mut().push("event".to_string());
                Ok(())
            }),
        );
        obj.set("x", 3).unwrap();
        assert_eq!(*order.borrow(), vec!["hook 0->3", "event"]);
    }

    #[test]
    fn quiet_write_runs_hook_without_event() {
        let hits = Rc::new(RefCell::new(0));
        let hits_clone = Rc::clone(&hits);
        let class = create(Members::new().property("x", 0).hook("x", move |_, _, _| {
            *hits_clone.borrow_mut() += 1;
            Ok(())
        }))
        .unwrap();
        let obj = class.construct(&[]).unwrap();
        let log = events(&obj);
        obj.set_with("x", 1, SetOptions::quiet()).unwrap();
        assert_eq!(obj.get("x"), Some(json!(1)));
        assert_eq!(*hits.borrow(), 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unknown_property_write_fails() {
        let obj = create(Members::new()).unwrap().construct(&[]).unwrap();
        assert!(matches!(obj.set("nope", 1), Err(Error::UnknownProperty(_))));
        assert_eq!(obj.get("nope"), None);
    }

    #[test]
    fn explicit_accessors() {
        let class = create(Members::new().property("title", "a")).unwrap();
        let obj = class.construct(&[]).unwrap();
        let log = events(&obj);
        assert!(obj.responds_to("getTitle"));
        assert!(obj.responds_to("setTitle"));
        assert_eq!(obj.call("getTitle", &[]).unwrap(), json!("a"));

        obj.call("setTitle", &[json!("b")]).unwrap();
        obj.call("setTitle", &[json!("c"), json!({"quiet": true})]).unwrap();
        assert_eq!(obj.get("title"), Some(json!("c")));
        assert_eq!(
            *log.borrow(),
            vec![json!({"title": {"newVal": "b", "priorVal": "a"}})]
        );

        assert!(matches!(
            obj.call("setTitle", &[json!("d"), json!({"quiet": 1})]),
            Err(Error::InvalidSetOptions(_))
        ));
        assert!(matches!(obj.call("nothing", &[]), Err(Error::UnknownMember(_))));
    }

    #[test]
    fn declared_behavior_shadows_accessor() {
        let class = create(
            Members::new()
                .property("title", "a")
                .behavior("getTitle", |this, _| {
                    let title = this.get("title").unwrap_or(Value::Null);
                    Ok(json!(format!("<{}>", title.as_str().unwrap_or_default())))
                }),
        )
        .unwrap();
        let obj = class.construct(&[]).unwrap();
        assert_eq!(obj.call("getTitle", &[]).unwrap(), json!("<a>"));
    }

    #[test]
    fn nested_writes_complete_depth_first() {
        let class = create(
            Members::new()
                .property("a", 0)
                .property("b", 0)
                .hook("a", |this, new, _| this.set("b", new.clone())),
        )
        .unwrap();
        let obj = class.construct(&[]).unwrap();
        let log = events(&obj);
        obj.set("a", 1).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                json!({"b": {"newVal": 1, "priorVal": 0}}),
                json!({"a": {"newVal": 1, "priorVal": 0}}),
            ]
        );
    }

    #[test]
    fn handler_may_write_the_emitting_instance() {
        let class = create(Members::new().property("x", 0).property("seen", 0)).unwrap();
        let obj = class.construct(&[]).unwrap();
        obj.listen(
            CHANGED,
            Handler::new(|this, args| {
                let changes = ChangeSet::from_args(args)?;
                if let Some(change) = changes.get("x") {
                    this.set("seen", change.new_val.clone())?;
                }
                Ok(())
            }),
        );
        obj.set("x", 9).unwrap();
        assert_eq!(obj.get("seen"), Some(json!(9)));
    }

    #[test]
    fn hook_error_propagates_after_store() {
        let class = create(
            Members::new()
                .property("x", 0)
                .hook("x", |_, _, _| Err(Error::host("rejected"))),
        )
        .unwrap();
        let obj = class.construct(&[]).unwrap();
        let log = events(&obj);
        let err = obj.set("x", 1).unwrap_err();
        assert_eq!(err.to_string(), "rejected");
        assert_eq!(obj.get("x"), Some(json!(1)));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn integral_float_over_integer_is_not_a_change() {
        let class = create(Members::new().property("n", 1).property("list", json!([1, {"k": 2}]))).unwrap();
        let obj = class.construct(&[]).unwrap();
        let log = events(&obj);
        obj.set("n", 1.0).unwrap();
        obj.set("list", json!([1.0, {"k": 2.0}])).unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(obj.get("n"), Some(json!(1)));

        obj.set("n", 1.5).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn large_integers_keep_exact_comparison() {
        let big = 9_007_199_254_740_992_i64;
        let obj = create(Members::new().property("n", big)).unwrap().construct(&[]).unwrap();
        let log = events(&obj);
        obj.set("n", big + 1).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn weak_handle_tracks_lifetime() {
        let obj = create(Members::new()).unwrap().construct(&[]).unwrap();
        let weak = obj.downgrade();
        assert!(weak.upgrade().unwrap().ptr_eq(&obj));
        drop(obj);
        assert!(weak.upgrade().is_none());
    }
}
