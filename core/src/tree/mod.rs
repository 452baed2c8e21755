//! The resource tree: a path-addressed hierarchy of entries.
//!
//! Entries live in an arena indexed by `EntryId`, so every reference that
//! crosses an API boundary is a small copyable identifier rather than a
//! pointer. An entry's role can be upgraded in place (namespace or
//! placeholder to a concrete resource) without changing its identity;
//! outstanding ids stay valid across the promotion.
//!
//! Structural operations (lookup, creation, promotion, deletion) live here.
//! The push pipeline and handler bookkeeping are in [`crate::resource`].

pub mod path;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{HubError, HubResult};
use crate::resource::ResourceState;
use crate::sample::DataType;

/// Stable identity of a tree entry. Arena-indexed; never reused while the
/// entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u32);

/// Role of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Interior node; carries no data.
    Namespace,
    /// Referenced but not yet promoted to a concrete resource role.
    Placeholder,
    Input,
    Output,
    Observation,
}

impl EntryKind {
    /// True for the concrete resource roles (Input, Output, Observation).
    pub fn is_resource(self) -> bool {
        matches!(
            self,
            EntryKind::Input | EntryKind::Output | EntryKind::Observation
        )
    }

    /// True for every role that carries resource state (everything except
    /// a namespace).
    pub fn carries_data(self) -> bool {
        !matches!(self, EntryKind::Namespace)
    }
}

/// One node of the resource tree.
#[derive(Debug)]
pub struct Entry {
    name: String,
    parent: Option<EntryId>,
    children: BTreeMap<String, EntryId>,
    kind: EntryKind,
    pub(crate) resource: Option<ResourceState>,
}

impl Entry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    pub fn child(&self, name: &str) -> Option<EntryId> {
        self.children.get(name).copied()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, EntryId)> {
        self.children.iter().map(|(n, id)| (n.as_str(), *id))
    }

    pub fn resource(&self) -> Option<&ResourceState> {
        self.resource.as_ref()
    }

    pub(crate) fn resource_mut(&mut self) -> Option<&mut ResourceState> {
        self.resource.as_mut()
    }
}

/// The tree itself. Single writer: all mutation happens on the dispatch
/// context, so lookups always observe a consistent snapshot.
pub struct Tree {
    slots: Vec<Option<Entry>>,
    free: Vec<u32>,
    root: EntryId,
    default_units: String,
}

impl Tree {
    /// Create a tree holding only the root namespace. `default_units` seeds
    /// the units of placeholders and observations until data arrives.
    pub fn new(default_units: &str) -> Tree {
        let root = Entry {
            name: String::new(),
            parent: None,
            children: BTreeMap::new(),
            kind: EntryKind::Namespace,
            resource: None,
        };
        Tree {
            slots: vec![Some(root)],
            free: Vec::new(),
            root: EntryId(0),
            default_units: default_units.to_string(),
        }
    }

    pub fn root(&self) -> EntryId {
        self.root
    }

    /// Borrow an entry. A stale id is an internal invariant violation.
    pub fn entry(&self, id: EntryId) -> &Entry {
        self.slots[id.0 as usize]
            .as_ref()
            .expect("stale entry id")
    }

    pub(crate) fn entry_mut(&mut self, id: EntryId) -> &mut Entry {
        self.slots[id.0 as usize]
            .as_mut()
            .expect("stale entry id")
    }

    /// True if the id still names a live entry. Useful to validate handles
    /// held across deletions.
    pub fn contains(&self, id: EntryId) -> bool {
        self.slots
            .get(id.0 as usize)
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    /// Absolute path of an entry, for diagnostics.
    pub fn path_of(&self, id: EntryId) -> String {
        let mut segments = Vec::new();
        let mut cursor = id;
        loop {
            let entry = self.entry(cursor);
            match entry.parent {
                Some(parent) => {
                    segments.push(entry.name.clone());
                    cursor = parent;
                }
                None => break,
            }
        }
        if segments.is_empty() {
            return "/".to_string();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    // -----------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------

    /// Resolve a path relative to `base` without creating anything.
    /// Malformed paths resolve as not-found.
    pub fn find_entry(&self, base: EntryId, rel_path: &str) -> Option<EntryId> {
        let segments = path::split(rel_path)?;
        let mut cursor = base;
        for segment in segments {
            cursor = self.entry(cursor).child(segment)?;
        }
        Some(cursor)
    }

    /// Resolve an absolute path. Non-absolute paths resolve as not-found.
    pub fn find_absolute(&self, abs_path: &str) -> Option<EntryId> {
        if !path::is_absolute(abs_path) {
            return None;
        }
        self.find_entry(self.root, abs_path)
    }

    // -----------------------------------------------------------------
    // Creation & promotion
    // -----------------------------------------------------------------

    /// Resolve a path relative to `base`, creating every missing node as a
    /// namespace.
    pub fn get_entry(&mut self, base: EntryId, rel_path: &str) -> HubResult<EntryId> {
        let segments = match path::split(rel_path) {
            Some(s) => s.into_iter().map(str::to_string).collect::<Vec<_>>(),
            None => return Err(HubError::NotFound),
        };
        let mut cursor = base;
        for segment in &segments {
            cursor = match self.entry(cursor).child(segment) {
                Some(child) => child,
                None => self.insert_child(cursor, segment),
            };
        }
        Ok(cursor)
    }

    /// Resolve a path to a data-carrying entry, creating missing interior
    /// nodes as namespaces and materialising the leaf as a placeholder.
    /// An existing namespace at the leaf is promoted in place; entries that
    /// already carry resource state are returned unchanged.
    pub fn get_resource(&mut self, base: EntryId, rel_path: &str) -> HubResult<EntryId> {
        let id = self.get_entry(base, rel_path)?;
        if self.entry(id).kind == EntryKind::Namespace {
            let units = self.default_units.clone();
            let entry = self.entry_mut(id);
            entry.kind = EntryKind::Placeholder;
            entry.resource = Some(ResourceState::placeholder(&units));
        }
        Ok(id)
    }

    /// Get or create an Input at a path, enforcing the promotion rules.
    pub fn get_input(
        &mut self,
        base: EntryId,
        rel_path: &str,
        data_type: DataType,
        units: &str,
    ) -> HubResult<EntryId> {
        self.get_io(base, rel_path, EntryKind::Input, data_type, units)
    }

    /// Get or create an Output at a path, enforcing the promotion rules.
    /// New outputs start mandatory.
    pub fn get_output(
        &mut self,
        base: EntryId,
        rel_path: &str,
        data_type: DataType,
        units: &str,
    ) -> HubResult<EntryId> {
        self.get_io(base, rel_path, EntryKind::Output, data_type, units)
    }

    fn get_io(
        &mut self,
        base: EntryId,
        rel_path: &str,
        kind: EntryKind,
        data_type: DataType,
        units: &str,
    ) -> HubResult<EntryId> {
        let id = self.get_entry(base, rel_path)?;
        let entry = self.entry(id);
        match entry.kind {
            k if k == kind => {
                let state = entry.resource().expect("io entry without state");
                if state.data_type() == data_type && state.units() == units {
                    Ok(id)
                } else {
                    Err(HubError::Duplicate)
                }
            }
            EntryKind::Input | EntryKind::Output | EntryKind::Observation => {
                Err(HubError::Duplicate)
            }
            EntryKind::Namespace | EntryKind::Placeholder => {
                let entry = self.entry_mut(id);
                let mut state = entry.resource.take().unwrap_or_else(ResourceState::bare);
                state.promote(data_type, units, kind == EntryKind::Output);
                entry.kind = kind;
                entry.resource = Some(state);
                Ok(id)
            }
        }
    }

    /// Get or create an Observation at a path. Idempotent on an existing
    /// observation; conflicts with Inputs and Outputs.
    pub fn get_observation(&mut self, base: EntryId, rel_path: &str) -> HubResult<EntryId> {
        let id = self.get_entry(base, rel_path)?;
        match self.entry(id).kind {
            EntryKind::Observation => Ok(id),
            EntryKind::Input | EntryKind::Output => Err(HubError::Duplicate),
            EntryKind::Namespace | EntryKind::Placeholder => {
                let units = self.default_units.clone();
                let entry = self.entry_mut(id);
                let mut state = entry
                    .resource
                    .take()
                    .unwrap_or_else(|| ResourceState::placeholder(&units));
                state.attach_observation();
                entry.kind = EntryKind::Observation;
                entry.resource = Some(state);
                Ok(id)
            }
        }
    }

    // -----------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------

    /// Delete an Input or Output. The entry demotes to a namespace when it
    /// still has children; otherwise it is removed together with any
    /// namespace ancestors left empty. Observations bound to the deleted
    /// resource lose their source.
    pub fn delete_io(&mut self, id: EntryId) {
        let kind = self.entry(id).kind;
        assert!(
            matches!(kind, EntryKind::Input | EntryKind::Output),
            "delete_io called on {:?} entry",
            kind
        );
        self.delete_resource_entry(id);
    }

    /// Delete an Observation (administrative). Unbinds it from its source
    /// and severs any observations fed by it.
    pub fn delete_observation(&mut self, id: EntryId) {
        let kind = self.entry(id).kind;
        assert!(
            kind == EntryKind::Observation,
            "delete_observation called on {:?} entry",
            kind
        );
        // Unhook from the source feeding this observation.
        let source = self
            .entry(id)
            .resource()
            .and_then(|s| s.observation())
            .and_then(|o| o.source());
        if let Some(src) = source {
            if let Some(state) = self.entry_mut(src).resource_mut() {
                state.remove_route(id);
            }
        }
        self.delete_resource_entry(id);
    }

    fn delete_resource_entry(&mut self, id: EntryId) {
        // Sever observations fed by this entry.
        let routes = self
            .entry(id)
            .resource()
            .map(|s| s.routes().to_vec())
            .unwrap_or_default();
        for obs in routes {
            if let Some(state) = self.entry_mut(obs).resource_mut() {
                if let Some(o) = state.observation_mut() {
                    o.clear_source();
                }
            }
        }

        if !self.entry(id).children.is_empty() {
            let entry = self.entry_mut(id);
            entry.kind = EntryKind::Namespace;
            entry.resource = None;
            return;
        }

        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let entry = self.entry(current);
            if !entry.children.is_empty() {
                break;
            }
            let parent = match entry.parent {
                Some(p) => p,
                None => break, // never remove the root
            };
            // Past the first hop, only prune bare namespaces.
            if current != id
                && (self.entry(current).kind != EntryKind::Namespace
                    || self.entry(current).resource.is_some())
            {
                break;
            }
            let name = self.entry(current).name.clone();
            self.entry_mut(parent).children.remove(&name);
            self.release(current);
            cursor = Some(parent);
        }
    }

    // -----------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------

    fn insert_child(&mut self, parent: EntryId, name: &str) -> EntryId {
        let entry = Entry {
            name: name.to_string(),
            parent: Some(parent),
            children: BTreeMap::new(),
            kind: EntryKind::Namespace,
            resource: None,
        };
        let id = self.alloc(entry);
        self.entry_mut(parent).children.insert(name.to_string(), id);
        id
    }

    fn alloc(&mut self, entry: Entry) -> EntryId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(entry);
                EntryId(slot)
            }
            None => {
                self.slots.push(Some(entry));
                EntryId((self.slots.len() - 1) as u32)
            }
        }
    }

    fn release(&mut self, id: EntryId) {
        self.slots[id.0 as usize] = None;
        self.free.push(id.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Tree {
        Tree::new("")
    }

    #[test]
    fn root_path_is_slash() {
        let t = tree();
        assert_eq!(t.path_of(t.root()), "/");
        assert_eq!(t.entry(t.root()).kind(), EntryKind::Namespace);
    }

    #[test]
    fn get_entry_creates_namespaces() {
        let mut t = tree();
        let id = t.get_entry(t.root(), "app/client/sensor").unwrap();
        assert_eq!(t.entry(id).kind(), EntryKind::Namespace);
        assert_eq!(t.path_of(id), "/app/client/sensor");
    }

    #[test]
    fn find_entry_is_deterministic_and_idempotent() {
        let mut t = tree();
        let id = t.get_entry(t.root(), "a/b/c").unwrap();
        assert_eq!(t.find_entry(t.root(), "a/b/c"), Some(id));
        assert_eq!(t.find_entry(t.root(), "a/b/c"), Some(id));
    }

    #[test]
    fn find_entry_missing_is_none() {
        let t = tree();
        assert_eq!(t.find_entry(t.root(), "no/such"), None);
    }

    #[test]
    fn malformed_path_is_not_found() {
        let mut t = tree();
        t.get_entry(t.root(), "a/b").unwrap();
        assert_eq!(t.find_entry(t.root(), "a//b"), None);
        assert!(t.get_entry(t.root(), "a//b").is_err());
    }

    #[test]
    fn find_absolute_requires_leading_slash() {
        let mut t = tree();
        let id = t.get_entry(t.root(), "obs/x").unwrap();
        assert_eq!(t.find_absolute("/obs/x"), Some(id));
        assert_eq!(t.find_absolute("obs/x"), None);
    }

    #[test]
    fn get_input_creates_and_is_idempotent() {
        let mut t = tree();
        let a = t
            .get_input(t.root(), "sensor/temp", DataType::Numeric, "degC")
            .unwrap();
        assert_eq!(t.entry(a).kind(), EntryKind::Input);
        let b = t
            .get_input(t.root(), "sensor/temp", DataType::Numeric, "degC")
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn get_input_mismatched_type_is_duplicate() {
        let mut t = tree();
        t.get_input(t.root(), "x", DataType::Numeric, "m").unwrap();
        assert_eq!(
            t.get_input(t.root(), "x", DataType::Boolean, "m"),
            Err(HubError::Duplicate)
        );
        assert_eq!(
            t.get_input(t.root(), "x", DataType::Numeric, "ft"),
            Err(HubError::Duplicate)
        );
        // State unchanged by the failed attempts.
        let id = t.find_entry(t.root(), "x").unwrap();
        let state = t.entry(id).resource().unwrap();
        assert_eq!(state.data_type(), DataType::Numeric);
        assert_eq!(state.units(), "m");
    }

    #[test]
    fn conflicting_role_is_duplicate() {
        let mut t = tree();
        t.get_input(t.root(), "x", DataType::Numeric, "m").unwrap();
        assert_eq!(
            t.get_output(t.root(), "x", DataType::Numeric, "m"),
            Err(HubError::Duplicate)
        );
        assert_eq!(
            t.get_observation(t.root(), "x"),
            Err(HubError::Duplicate)
        );
    }

    #[test]
    fn namespace_promotes_to_input_preserving_identity_and_children() {
        let mut t = tree();
        let child = t.get_entry(t.root(), "dev/sub").unwrap();
        let ns = t.find_entry(t.root(), "dev").unwrap();
        let promoted = t
            .get_input(t.root(), "dev", DataType::String, "")
            .unwrap();
        assert_eq!(promoted, ns);
        assert_eq!(t.entry(promoted).kind(), EntryKind::Input);
        assert_eq!(t.entry(promoted).child("sub"), Some(child));
    }

    #[test]
    fn placeholder_promotes_to_output_mandatory() {
        let mut t = tree();
        let ph = t.get_resource(t.root(), "act/relay").unwrap();
        assert_eq!(t.entry(ph).kind(), EntryKind::Placeholder);
        let out = t
            .get_output(t.root(), "act/relay", DataType::Boolean, "")
            .unwrap();
        assert_eq!(out, ph);
        assert_eq!(t.entry(out).kind(), EntryKind::Output);
        assert!(t.entry(out).resource().unwrap().is_mandatory());
    }

    #[test]
    fn observation_is_idempotent() {
        let mut t = tree();
        let a = t.get_observation(t.root(), "obs/o1").unwrap();
        let b = t.get_observation(t.root(), "obs/o1").unwrap();
        assert_eq!(a, b);
        assert_eq!(t.entry(a).kind(), EntryKind::Observation);
    }

    #[test]
    fn delete_io_removes_leaf_and_empty_ancestors() {
        let mut t = tree();
        let id = t
            .get_input(t.root(), "a/b/c", DataType::Numeric, "")
            .unwrap();
        t.delete_io(id);
        assert_eq!(t.find_entry(t.root(), "a/b/c"), None);
        assert_eq!(t.find_entry(t.root(), "a/b"), None);
        assert_eq!(t.find_entry(t.root(), "a"), None);
        assert!(!t.contains(id));
    }

    #[test]
    fn delete_io_with_children_demotes_to_namespace() {
        let mut t = tree();
        let id = t
            .get_input(t.root(), "dev", DataType::Numeric, "")
            .unwrap();
        let child = t.get_entry(id, "sub").unwrap();
        t.delete_io(id);
        assert_eq!(t.entry(id).kind(), EntryKind::Namespace);
        assert!(t.entry(id).resource().is_none());
        assert_eq!(t.entry(id).child("sub"), Some(child));
    }

    #[test]
    fn delete_io_keeps_non_empty_ancestors() {
        let mut t = tree();
        let a = t
            .get_input(t.root(), "ns/one", DataType::Numeric, "")
            .unwrap();
        let b = t
            .get_input(t.root(), "ns/two", DataType::Numeric, "")
            .unwrap();
        t.delete_io(a);
        assert_eq!(t.find_entry(t.root(), "ns/one"), None);
        assert_eq!(t.find_entry(t.root(), "ns/two"), Some(b));
        assert!(t.find_entry(t.root(), "ns").is_some());
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut t = tree();
        let id = t.get_input(t.root(), "x", DataType::Numeric, "").unwrap();
        t.delete_io(id);
        let again = t.get_input(t.root(), "y", DataType::Numeric, "").unwrap();
        // The slot is recycled, so the raw index matches the freed one.
        assert_eq!(again, id);
        assert_eq!(t.path_of(again), "/y");
    }

    #[test]
    fn depth_cap_applies_to_creation() {
        let mut t = tree();
        let too_deep = vec!["x"; path::MAX_PATH_DEPTH + 1].join("/");
        assert_eq!(
            t.get_entry(t.root(), &too_deep),
            Err(HubError::NotFound)
        );
    }
}
