//! Class extension.
//!
//! A [`Class`] is an immutable descriptor linked to its parent. Building one
//! with [`extend`] resolves, once, the property schema (every observable name
//! along the chain with its most-derived default) and the table of
//! synthesized `get<Name>`/`set<Name>` accessors. Behaviors are kept as
//! shadow entries on the class that declares them and resolved by walking the
//! chain from the most-derived class up.
//!
//! ```
//! use crux::{create, Members};
//! use serde_json::json;
//!
//! let shape = create(Members::named("Shape").property("sides", 0)).unwrap();
//! let square = shape.extend(Members::named("Square").property("sides", 4)).unwrap();
//!
//! let obj = square.construct(&[]).unwrap();
//! assert_eq!(obj.get("sides"), Some(json!(4)));
//! assert!(obj.is_instance_of(&shape));
//! ```

mod members;
pub mod naming;

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

pub use members::{Behavior, Constructor, Members};

use crate::error::{Error, Result};
use crate::instance::Instance;
use members::Member;
use naming::{getter_name, setter_name, CONSTRUCTOR};

const ROOT_NAME: &str = "Base";
const ANONYMOUS: &str = "Anonymous";

thread_local! {
    static ROOT: OnceCell<Class> = const { OnceCell::new() };
}

/// The ancestor of every class. One per thread.
pub fn root() -> Class {
    ROOT.with(|cell| cell.get_or_init(Class::new_root).clone())
}

/// Derives a class from the root.
pub fn create(members: Members) -> Result<Class> {
    extend(&root(), members)
}

/// Derives a new class from `base`.
pub fn extend(base: &Class, members: Members) -> Result<Class> {
    let Members {
        name,
        entries,
        constructor,
    } = members;
    let name = name.unwrap_or_else(|| ANONYMOUS.to_string());

    let mut behaviors = IndexMap::new();
    let mut defaults = IndexMap::new();
    for (key, member) in entries {
        if key.is_empty() {
            return Err(Error::InvalidMemberName(key));
        }
        if key == CONSTRUCTOR {
            return Err(Error::ReservedName(key));
        }
        match member {
            Member::Property(default) => {
                if base.method(&key).is_some() {
                    return Err(Error::MemberKindConflict {
                        name: key,
                        class: base.name().to_string(),
                    });
                }
                defaults.insert(key, default);
            }
            Member::Behavior(behavior) => {
                if base.has_property(&key) {
                    return Err(Error::MemberKindConflict {
                        name: key,
                        class: base.name().to_string(),
                    });
                }
                behaviors.insert(key, behavior);
            }
        }
    }

    let mut schema = base.inner.schema.clone();
    let mut accessors = base.inner.accessors.clone();
    for (key, default) in &defaults {
        // `title` and `Title` would both synthesize `getTitle`/`setTitle`.
        if let Some(existing) = accessors.get(&getter_name(key)) {
            if existing.property() != key {
                return Err(Error::InvalidMemberName(key.clone()));
            }
        }
        schema.insert(key.clone(), default.clone());
        accessors.insert(getter_name(key), Accessor::Get(key.clone()));
        accessors.insert(setter_name(key), Accessor::Set(key.clone()));
    }

    tracing::debug!(
        class = %name,
        parent = %base.name(),
        properties = schema.len(),
        behaviors = behaviors.len(),
        explicit_constructor = constructor.is_some(),
        "class built"
    );

    Ok(Class {
        inner: Rc::new(ClassInner {
            name,
            parent: Some(base.clone()),
            behaviors,
            constructor,
            schema,
            accessors,
        }),
    })
}

/// A synthesized explicitly-named accessor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Accessor {
    Get(String),
    Set(String),
}

impl Accessor {
    fn property(&self) -> &str {
        match self {
            Accessor::Get(property) | Accessor::Set(property) => property,
        }
    }
}

struct ClassInner {
    name: String,
    parent: Option<Class>,
    /// Behaviors declared by this class only.
    behaviors: IndexMap<String, Behavior>,
    constructor: Option<Constructor>,
    /// Observable properties of the whole chain with resolved defaults.
    schema: IndexMap<String, Value>,
    accessors: IndexMap<String, Accessor>,
}

/// Handle to an immutable class descriptor. Clones share identity.
#[derive(Clone)]
pub struct Class {
    inner: Rc<ClassInner>,
}

impl Class {
    fn new_root() -> Self {
        Self {
            inner: Rc::new(ClassInner {
                name: ROOT_NAME.to_string(),
                parent: None,
                behaviors: IndexMap::new(),
                constructor: None,
                schema: IndexMap::new(),
                accessors: IndexMap::new(),
            }),
        }
    }

    pub fn extend(&self, members: Members) -> Result<Class> {
        extend(self, members)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&Class> {
        self.inner.parent.as_ref()
    }

    pub fn ptr_eq(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// `true` when `ancestor` is this class or appears in its chain.
    pub fn is_subclass_of(&self, ancestor: &Class) -> bool {
        self.ancestors().any(|class| class.ptr_eq(ancestor))
    }

    /// This class followed by its ancestors, most-derived first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Class> {
        std::iter::successors(Some(self), |class| class.parent())
    }

    /// The chain from the root down to this class.
    pub fn chain(&self) -> Vec<Class> {
        let mut chain: Vec<Class> = self.ancestors().cloned().collect();
        chain.reverse();
        chain
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.inner.schema.contains_key(name)
    }

    /// Observable property names, in first-declaration order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.inner.schema.keys().map(String::as_str)
    }

    pub fn default_value(&self, name: &str) -> Option<&Value> {
        self.inner.schema.get(name)
    }

    /// Resolves a behavior, most-derived declaration first.
    pub fn method(&self, name: &str) -> Option<Behavior> {
        self.ancestors()
            .find_map(|class| class.inner.behaviors.get(name))
            .cloned()
    }

    /// `true` when this class declares its own constructor.
    pub fn has_constructor(&self) -> bool {
        self.inner.constructor.is_some()
    }

    pub(crate) fn accessor(&self, name: &str) -> Option<&Accessor> {
        self.inner.accessors.get(name)
    }

    pub(crate) fn schema(&self) -> &IndexMap<String, Value> {
        &self.inner.schema
    }

    /// Creates an instance: every slot takes its default silently, then the
    /// constructor resolution runs with `args`.
    pub fn construct(&self, args: &[Value]) -> Result<Instance> {
        let instance = Instance::with_defaults(self);
        tracing::trace!(class = %self.name(), args = args.len(), "construct");
        self.initialize(&instance, args)?;
        Ok(instance)
    }

    /// Runs the parent's constructor resolution on `this`. Meant for explicit
    /// constructors that want the inherited initialization.
    pub fn construct_super(&self, this: &Instance, args: &[Value]) -> Result<()> {
        match self.parent() {
            Some(parent) => parent.initialize(this, args),
            None => Ok(()),
        }
    }

    fn initialize(&self, this: &Instance, args: &[Value]) -> Result<()> {
        match &self.inner.constructor {
            Some(constructor) => constructor.call(self, this, args),
            None => self.construct_super(this, args),
        }
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.inner.name)
            .field("parent", &self.parent().map(Class::name))
            .field("properties", &self.inner.schema)
            .field("behaviors", &self.inner.behaviors.keys().collect::<Vec<_>>())
            .finish()
    }
}
