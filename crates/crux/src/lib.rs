//! crux - an observable object model.
//!
//! Classes are declared with [`extend`] (or [`create`], which extends the
//! root class) from a [`Members`] map of observable properties and
//! behaviors. Instances keep one slot per observable property; a write that
//! changes a slot runs the property's `<name>Changed` hook and then emits the
//! [`CHANGED`] event. [`Instance::bind`] mirrors properties of another
//! instance by listening to that event.
//!
//! ```
//! use crux::{create, Handler, Members, CHANGED, ChangeSet};
//! use serde_json::json;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let point = create(Members::named("Point").property("x", 0).property("y", 0)).unwrap();
//! let p = point.construct(&[]).unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let seen_clone = Rc::clone(&seen);
//! p.listen(CHANGED, Handler::new(move |_, args| {
//!     seen_clone.borrow_mut().push(ChangeSet::from_args(args)?);
//!     Ok(())
//! }));
//!
//! p.set("x", 3).unwrap();
//! p.set("x", 3).unwrap();
//! assert_eq!(seen.borrow().len(), 1);
//! assert_eq!(seen.borrow()[0].get("x").unwrap().new_val, json!(3));
//! ```
//!
//! Everything is single-threaded and synchronous; see the [`instance`]
//! module for the re-entrancy rules.

pub mod binder;
pub mod change;
pub mod class;
pub mod error;
pub mod events;
pub mod instance;

pub use change::{Change, ChangeSet, SetOptions};
pub use class::{create, extend, root, Behavior, Class, Constructor, Members};
pub use error::{Error, Result};
pub use events::{Handler, SubscriberRecord, CHANGED};
pub use instance::{Instance, WeakInstance};

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
