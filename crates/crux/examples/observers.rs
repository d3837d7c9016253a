//! `observers`: walk through hooks, inheritance, listeners and binding.
//!
//! Usage:
//!   cargo run -p crux --example observers
//!
//! Log verbosity follows `RUST_LOG` (default `crux=debug`); set
//! `RUST_LOG=crux=trace` to see every write and delivery.

use crux::{create, ChangeSet, Handler, Instance, Members, CHANGED};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

fn announce(label: &'static str) -> impl Fn(&Instance, &Value, &Value) -> crux::Result<()> {
    move |_, new, prior| {
        println!("{label}: {prior} -> {new}");
        Ok(())
    }
}

fn run() -> crux::Result<()> {
    let some_object = create(
        Members::named("SomeObject")
            .property("foo", 1)
            .hook("foo", announce("some object foo changed")),
    )?;

    let inherit_some_object = some_object.extend(
        Members::named("InheritSomeObject")
            .property("foo", 1)
            .property("bar", 1)
            .hook("foo", announce("inherited object foo changed")),
    )?;

    let another_object = create(
        Members::named("AnotherObject")
            .property("baz", 1)
            .behavior("interestingObjectChanged", |this, args| {
                let changes = ChangeSet::from_args(args)?;
                println!("notified of external change: {}", changes.to_value());
                if let Some(change) = changes.get("foo") {
                    this.set("baz", change.new_val.clone())?;
                }
                Ok(Value::Null)
            })
            .hook("baz", announce("another object baz changed")),
    )?;

    let watched = some_object.construct(&[])?;
    let inherited = inherit_some_object.construct(&[])?;
    let listener = another_object.construct(&[])?;

    watched.listen_with(
        CHANGED,
        Handler::new(|this, args| this.call("interestingObjectChanged", args).map(|_| ())),
        &listener,
    );

    watched.set("foo", 2)?;
    inherited.set("foo", 5)?;

    let mirror = create(Members::named("Mirror").property("shadow", 0))?.construct(&[])?;
    let binding = mirror.bind(&inherited, &[("shadow", "bar")])?;
    inherited.set("bar", 42)?;
    println!("mirror shadow = {}", mirror.get("shadow").unwrap_or(Value::Null));

    inherited.remove_listener(Some(CHANGED), Some(&binding))?;
    inherited.set("bar", 43)?;
    println!(
        "after unbinding, mirror shadow = {}",
        mirror.get("shadow").unwrap_or(Value::Null)
    );
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crux=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
