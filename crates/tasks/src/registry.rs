//! Identity registry backing upsert: `actor_id` to scene handle.
//!
//! One registry belongs to one executor run and reaches tasks through the
//! [`crate::TaskContext`]. It is seeded from the scene's labelled objects so a
//! repeated run finds what the previous run created: objects created through
//! [`ActorRegistry::update_or_create`] are labelled `prefix + actor_id`.
//!
//! The map sits behind a mutex and every upsert claims its id for the duration
//! of the create/update callback, so tasks running side by side may upsert
//! different ids but never the same one at once.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HostError, RegistryError};
use crate::host::ActorHandle;

/// Which branch an upsert took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub handle: ActorHandle,
    pub action: UpsertAction,
}

#[derive(Debug, Default)]
struct RegistryState {
    actors: HashMap<String, ActorHandle>,
    in_flight: HashSet<String>,
}

#[derive(Debug)]
pub struct ActorRegistry {
    prefix: String,
    state: Mutex<RegistryState>,
}

impl ActorRegistry {
    /// An empty registry.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// A registry pre-filled from `(label, handle)` pairs; labels that do not
    /// start with `prefix` are ignored and the prefix is stripped from the rest.
    pub fn seeded(
        prefix: impl Into<String>,
        labelled: impl IntoIterator<Item = (String, ActorHandle)>,
    ) -> Self {
        let registry = Self::new(prefix);
        {
            let mut state = registry.lock();
            for (label, handle) in labelled {
                if let Some(id) = label.strip_prefix(registry.prefix.as_str()) {
                    if !id.is_empty() {
                        state.actors.insert(id.to_owned(), handle);
                    }
                }
            }
            if !state.actors.is_empty() {
                debug!(
                    "registry seeded with {} actors for prefix '{}'",
                    state.actors.len(),
                    registry.prefix
                );
            }
        }
        registry
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Scene label used for `id`.
    pub fn label_for(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }

    pub fn get(&self, id: &str) -> Option<ActorHandle> {
        self.lock().actors.get(id).cloned()
    }

    /// Register `handle` under `id`, returning the handle it replaced.
    pub fn put(&self, id: impl Into<String>, handle: ActorHandle) -> Option<ActorHandle> {
        self.lock().actors.insert(id.into(), handle)
    }

    pub fn exists(&self, id: &str) -> bool {
        self.lock().actors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().actors.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Forget every entry (after the scene itself was cleared); returns how many.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let n = state.actors.len();
        state.actors.clear();
        n
    }

    pub fn snapshot(&self) -> BTreeMap<String, ActorHandle> {
        self.lock()
            .actors
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Update the object registered under `id`, or create and register one.
    ///
    /// `create` receives the label to stamp on the new object. Nothing is
    /// registered when `create` fails.
    ///
    /// # Errors
    /// - [`RegistryError::Conflict`] if another upsert of `id` is in progress.
    /// - [`RegistryError::Host`] if the callback fails.
    pub fn update_or_create<C, U>(
        &self,
        id: &str,
        create: C,
        update: U,
    ) -> Result<Upserted, RegistryError>
    where
        C: FnOnce(&str) -> Result<ActorHandle, HostError>,
        U: FnOnce(&ActorHandle) -> Result<(), HostError>,
    {
        let existing = {
            let mut state = self.lock();
            if !state.in_flight.insert(id.to_owned()) {
                return Err(RegistryError::Conflict(id.to_owned()));
            }
            state.actors.get(id).cloned()
        };
        let _claim = Claim { registry: self, id };

        match existing {
            Some(handle) => {
                update(&handle)?;
                debug!("updated actor '{id}' ({handle})");
                Ok(Upserted {
                    handle,
                    action: UpsertAction::Updated,
                })
            }
            None => {
                let handle = create(&self.label_for(id))?;
                self.lock().actors.insert(id.to_owned(), handle.clone());
                debug!("created actor '{id}' ({handle})");
                Ok(Upserted {
                    handle,
                    action: UpsertAction::Created,
                })
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases an id claimed by `update_or_create`, even if a callback panics.
struct Claim<'a> {
    registry: &'a ActorRegistry,
    id: &'a str,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.registry.lock().in_flight.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(n: u32) -> ActorHandle {
        ActorHandle::new(format!("h{n}"))
    }

    #[test]
    fn first_upsert_creates_then_updates() {
        let reg = ActorRegistry::new("wf_");
        let mut created_label = String::new();

        let first = reg
            .update_or_create(
                "cube",
                |label| {
                    created_label = label.to_owned();
                    Ok(handle(1))
                },
                |_| panic!("nothing to update yet"),
            )
            .unwrap();
        assert_eq!(first.action, UpsertAction::Created);
        assert_eq!(created_label, "wf_cube");

        let mut updated = None;
        let second = reg
            .update_or_create(
                "cube",
                |_| panic!("must not create twice"),
                |h| {
                    updated = Some(h.clone());
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(second.action, UpsertAction::Updated);
        assert_eq!(second.handle, handle(1));
        assert_eq!(updated, Some(handle(1)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn failed_create_registers_nothing_and_releases_the_id() {
        let reg = ActorRegistry::new("wf_");
        let err = reg
            .update_or_create("x", |_| Err(HostError::Rejected("no".into())), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Host(_)));
        assert!(!reg.exists("x"));

        // The claim was dropped, so a retry goes through.
        assert!(reg.update_or_create("x", |_| Ok(handle(2)), |_| Ok(())).is_ok());
    }

    #[test]
    fn nested_upsert_of_same_id_is_a_conflict() {
        let reg = ActorRegistry::new("wf_");
        let outcome = reg.update_or_create(
            "dup",
            |_| {
                let inner = reg.update_or_create("dup", |_| Ok(handle(9)), |_| Ok(()));
                assert_eq!(inner, Err(RegistryError::Conflict("dup".into())));
                Ok(handle(1))
            },
            |_| Ok(()),
        );
        assert!(outcome.is_ok());

        // A different id may proceed while one is claimed.
        let outcome = reg.update_or_create(
            "a",
            |_| {
                reg.update_or_create("b", |_| Ok(handle(3)), |_| Ok(()))
                    .map_err(|_| HostError::Rejected("b".into()))?;
                Ok(handle(4))
            },
            |_| Ok(()),
        );
        assert!(outcome.is_ok());
        assert_eq!(reg.ids(), vec!["a", "b", "dup"]);
    }

    #[test]
    fn seeding_keeps_only_prefixed_labels() {
        let reg = ActorRegistry::seeded(
            "wf_",
            vec![
                ("wf_light".to_string(), handle(1)),
                ("manual_cube".to_string(), handle(2)),
                ("wf_".to_string(), handle(3)),
            ],
        );
        assert_eq!(reg.ids(), vec!["light"]);
        assert_eq!(reg.get("light"), Some(handle(1)));
    }

    #[test]
    fn put_replaces_and_returns_previous() {
        let reg = ActorRegistry::new("p_");
        assert_eq!(reg.put("a", handle(1)), None);
        assert_eq!(reg.put("a", handle(2)), Some(handle(1)));
        assert_eq!(reg.snapshot().get("a"), Some(&handle(2)));
    }
}
