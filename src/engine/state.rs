//! Per-session resolution state
//!
//! Dependency-resolution bookkeeping for one loaded subject. Every
//! collection grows monotonically within a session; loading a new
//! subject replaces the whole value. Per key the lifecycle is
//! Unseen -> PendingFetch -> Resolved, never backward.

use std::collections::{HashMap, HashSet};

use super::badge::{BadgeDefinition, BadgeKey};

#[derive(Debug, Default)]
pub struct ResolutionState {
    /// Resolved definitions; first writer wins
    known: HashMap<BadgeKey, BadgeDefinition>,
    /// Keys the subject has been awarded
    received: HashSet<BadgeKey>,
    /// Keys on the subject's public showcase, in first-appearance order
    listed: Vec<BadgeKey>,
    /// Keys with an outstanding definition query
    pending: HashSet<BadgeKey>,
}

impl ResolutionState {
    pub fn definition(&self, key: &BadgeKey) -> Option<&BadgeDefinition> {
        self.known.get(key)
    }

    pub fn is_known(&self, key: &BadgeKey) -> bool {
        self.known.contains_key(key)
    }

    pub fn is_pending(&self, key: &BadgeKey) -> bool {
        self.pending.contains(key)
    }

    pub fn is_received(&self, key: &BadgeKey) -> bool {
        self.received.contains(key)
    }

    pub fn is_listed(&self, key: &BadgeKey) -> bool {
        self.listed.contains(key)
    }

    /// Record an award for the subject.
    pub fn mark_received(&mut self, key: BadgeKey) {
        self.received.insert(key);
    }

    /// Append a showcase key, preserving first-appearance order.
    /// Returns false when the key was already listed.
    pub fn mark_listed(&mut self, key: BadgeKey) -> bool {
        if self.listed.contains(&key) {
            return false;
        }
        self.listed.push(key);
        true
    }

    /// Mark a key as having an outstanding definition query. Returns
    /// false when it already has one; a key is marked at most once
    /// until it resolves.
    pub fn mark_pending(&mut self, key: BadgeKey) -> bool {
        self.pending.insert(key)
    }

    /// Insert a resolved definition and clear the pending mark. Returns
    /// false (leaving the existing entry untouched) when the key is
    /// already known: first writer wins, a later definition for the
    /// same key is a no-op.
    pub fn resolve(&mut self, key: BadgeKey, definition: BadgeDefinition) -> bool {
        self.pending.remove(&key);
        if self.known.contains_key(&key) {
            return false;
        }
        self.known.insert(key, definition);
        true
    }

    /// The showcase projection: listed keys that have resolved, in
    /// listing order. A pure function of the current state.
    pub fn showcase(&self) -> Vec<(BadgeKey, BadgeDefinition)> {
        self.listed
            .iter()
            .filter_map(|key| self.known.get(key).map(|def| (key.clone(), def.clone())))
            .collect()
    }

    pub fn resolved_count(&self) -> usize {
        self.known.len()
    }

    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    pub fn listed_count(&self) -> usize {
        self.listed.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(identifier: &str) -> BadgeKey {
        BadgeKey::new("issuer", identifier)
    }

    fn def(name: &str) -> BadgeDefinition {
        BadgeDefinition {
            name: name.to_string(),
            description: String::new(),
            image_url: String::new(),
            issuer: "issuer".to_string(),
        }
    }

    #[test]
    fn test_resolve_first_writer_wins() {
        let mut state = ResolutionState::default();
        assert!(state.resolve(key("a"), def("First")));
        assert!(!state.resolve(key("a"), def("Second")));
        assert_eq!(state.definition(&key("a")).unwrap().name, "First");
        assert_eq!(state.resolved_count(), 1);
    }

    #[test]
    fn test_resolve_clears_pending() {
        let mut state = ResolutionState::default();
        assert!(state.mark_pending(key("a")));
        assert!(!state.mark_pending(key("a")));
        assert!(state.is_pending(&key("a")));

        state.resolve(key("a"), def("First"));
        assert!(!state.is_pending(&key("a")));
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn test_duplicate_resolve_also_clears_pending() {
        let mut state = ResolutionState::default();
        state.resolve(key("a"), def("First"));
        state.mark_pending(key("a"));
        assert!(!state.resolve(key("a"), def("Second")));
        assert!(!state.is_pending(&key("a")));
    }

    #[test]
    fn test_listed_preserves_order_and_dedups() {
        let mut state = ResolutionState::default();
        assert!(state.mark_listed(key("b")));
        assert!(state.mark_listed(key("a")));
        assert!(!state.mark_listed(key("b")));
        assert_eq!(state.listed_count(), 2);

        state.resolve(key("a"), def("A"));
        state.resolve(key("b"), def("B"));
        let names: Vec<_> = state.showcase().iter().map(|(_, d)| d.name.clone()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_showcase_skips_unresolved_keys() {
        let mut state = ResolutionState::default();
        state.mark_listed(key("a"));
        state.mark_listed(key("b"));
        state.resolve(key("b"), def("B"));

        let entries = state.showcase();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, key("b"));
    }
}
