use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use crate::core::ChannelId;

/// Process-lifetime store of named channel sets. Uniqueness is enforced by
/// the set; order carries no meaning. Persistence is the caller's concern.
/// The store is constructed once at startup and handed to every call site.
#[derive(Clone, Default)]
pub struct ListStore {
    lists: Arc<Mutex<HashMap<String, BTreeSet<ChannelId>>>>,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel set for `list_id`; empty if the list has never been
    /// written.
    pub fn get(&self, list_id: &str) -> BTreeSet<ChannelId> {
        self.lists
            .lock()
            .unwrap()
            .get(list_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Add `id` to the list, creating it on first write. Returns false if the
    /// id was already present.
    pub fn add(&self, list_id: &str, id: ChannelId) -> bool {
        self.lists
            .lock()
            .unwrap()
            .entry(list_id.to_string())
            .or_default()
            .insert(id)
    }

    /// Remove `id` from the list. Returns false if it was not present.
    pub fn remove(&self, list_id: &str, id: &ChannelId) -> bool {
        self.lists
            .lock()
            .unwrap()
            .get_mut(list_id)
            .map(|set| set.remove(id))
            .unwrap_or(false)
    }

    /// Replace the list's contents wholesale.
    pub fn replace(&self, list_id: &str, ids: impl IntoIterator<Item = ChannelId>) {
        self.lists
            .lock()
            .unwrap()
            .insert(list_id.to_string(), ids.into_iter().collect());
    }

    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lists.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ChannelId {
        ChannelId::parse(raw).unwrap()
    }

    #[test]
    fn lists_are_created_on_first_write() {
        let store = ListStore::new();
        assert!(store.get("mine").is_empty());
        assert!(store.add("mine", id("UCXuqSBlHAE6Xw-yeJA0Tunw")));
        assert_eq!(store.get("mine").len(), 1);
        assert_eq!(store.list_ids(), vec!["mine".to_string()]);
    }

    #[test]
    fn duplicate_adds_are_ignored() {
        let store = ListStore::new();
        assert!(store.add("mine", id("UCXuqSBlHAE6Xw-yeJA0Tunw")));
        assert!(!store.add("mine", id("UCXuqSBlHAE6Xw-yeJA0Tunw")));
        assert_eq!(store.get("mine").len(), 1);
    }

    #[test]
    fn remove_and_replace() {
        let store = ListStore::new();
        let a = id("UCXuqSBlHAE6Xw-yeJA0Tunw");
        let b = id("UCBJycsmduvYEL83R_U4JriQ");
        store.add("mine", a.clone());
        assert!(store.remove("mine", &a));
        assert!(!store.remove("mine", &a));
        assert!(!store.remove("other", &a));

        store.replace("mine", [a.clone(), b.clone(), a.clone()]);
        assert_eq!(store.get("mine").len(), 2);
    }
}
