//! One-way property mirroring between instances.
//!
//! [`Instance::bind`] copies named properties from a source instance now and
//! on every later `changed` event of that source. Writes go through the
//! normal setter, so the local hooks and events fire as for any other write.
//! Nothing flows back to the source.

use crate::change::ChangeSet;
use crate::error::{Error, Result};
use crate::events::{Handler, CHANGED};
use crate::instance::Instance;

impl Instance {
    /// Mirrors `source` properties into this instance.
    ///
    /// Each pair is `(local, source_property)`. Current values are copied
    /// first; the subscription is installed only once that pull succeeded,
    /// so a failing local hook leaves `source` untouched. Returns the handler
    /// installed on `source`; pass it to
    /// `source.remove_listener(Some(CHANGED), Some(&handler))` to unbind.
    /// The handler holds this instance weakly and goes inert once it is
    /// dropped.
    ///
    /// ```
    /// use crux::{create, Members};
    /// use serde_json::json;
    ///
    /// let view = create(Members::new().property("label", "")).unwrap().construct(&[]).unwrap();
    /// let model = create(Members::new().property("name", "ada")).unwrap().construct(&[]).unwrap();
    ///
    /// view.bind(&model, &[("label", "name")]).unwrap();
    /// assert_eq!(view.get("label"), Some(json!("ada")));
    ///
    /// model.set("name", "grace").unwrap();
    /// assert_eq!(view.get("label"), Some(json!("grace")));
    /// ```
    pub fn bind(&self, source: &Instance, pairs: &[(&str, &str)]) -> Result<Handler> {
        for (local, remote) in pairs {
            if !self.class().has_property(local) {
                return Err(Error::UnknownProperty((*local).to_string()));
            }
            if !source.class().has_property(remote) {
                return Err(Error::UnknownProperty((*remote).to_string()));
            }
        }
        let owned: Vec<(String, String)> = pairs
            .iter()
            .map(|(local, remote)| ((*local).to_string(), (*remote).to_string()))
            .collect();

        for (local, remote) in &owned {
            let value = source
                .get(remote)
                .ok_or_else(|| Error::UnknownProperty(remote.clone()))?;
            self.set(local, value)?;
        }

        let pair_count = owned.len();
        let handler = Handler::new(move |target, args| {
            // Payloads that are not change sets carry nothing to mirror.
            let Some(changes) = args.first().and_then(|v| ChangeSet::from_value(v).ok()) else {
                return Ok(());
            };
            for (local, remote) in &owned {
                if let Some(change) = changes.get(remote) {
                    target.set(local, change.new_val.clone())?;
                }
            }
            Ok(())
        });
        source.listen_with(CHANGED, handler.clone(), self);
        tracing::trace!(
            local_class = %self.class().name(),
            source_class = %source.class().name(),
            pairs = pair_count,
            "bound"
        );
        Ok(handler)
    }
}
