// In-memory registry of monitored subreddits.
//
// The registry is a plain owned value. `FeedService` puts it behind a single
// lock, so nothing in here needs to be thread-safe on its own.

use std::collections::{BTreeMap, HashSet, VecDeque};

use super::feed_models::{FeedError, FeedSummary};

/// How many relayed post ids each feed remembers before evicting the oldest.
pub const SEEN_ID_CAPACITY: usize = 1000;

/// Reddit does not allow subreddit names longer than this.
pub const MAX_FEED_NAME_CHARS: usize = 21;

/// Normalize user input into a registry key.
///
/// `"R/Rust"`, `"/r/rust"` and `" rust "` all map to `"rust"`.
pub fn normalize_feed_name(raw: &str) -> Result<String, FeedError> {
    let lowered = raw.trim().to_lowercase();
    let without_slash = lowered.strip_prefix('/').unwrap_or(&lowered);
    let name = without_slash.strip_prefix("r/").unwrap_or(without_slash);

    if name.is_empty()
        || name.len() > MAX_FEED_NAME_CHARS
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(FeedError::InvalidName(raw.trim().to_string()));
    }

    Ok(name.to_string())
}

/// Bounded set of post ids, evicting in insertion order.
#[derive(Debug, Clone)]
pub struct SeenIds {
    ids: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SeenIds {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: &str) {
        if !self.ids.insert(id.to_string()) {
            return;
        }
        self.order.push_back(id.to_string());

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// State kept for one monitored subreddit.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    generation: u64,
    pub enabled: bool,
    pub channel_id: Option<u64>,
    pub seen: SeenIds,
}

impl FeedEntry {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            enabled: false,
            channel_id: None,
            seen: SeenIds::with_capacity(SEEN_ID_CAPACITY),
        }
    }
}

/// One feed as the poller saw it when a pass started.
///
/// `generation` changes whenever the name is removed and added again, so a
/// target taken before that never matches the new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTarget {
    pub name: String,
    pub channel_id: u64,
    generation: u64,
}

/// Mapping from normalized subreddit name to its state.
#[derive(Debug, Default)]
pub struct FeedRegistry {
    entries: BTreeMap<String, FeedEntry>,
    next_generation: u64,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feed, disabled and without a channel. Returns the normalized name.
    pub fn add(&mut self, raw_name: &str) -> Result<String, FeedError> {
        let name = normalize_feed_name(raw_name)?;
        if self.entries.contains_key(&name) {
            return Err(FeedError::AlreadyExists(name));
        }

        self.next_generation += 1;
        self.entries
            .insert(name.clone(), FeedEntry::new(self.next_generation));
        Ok(name)
    }

    /// Drop a feed together with its seen ids.
    pub fn remove(&mut self, raw_name: &str) -> Result<String, FeedError> {
        let name = normalize_feed_name(raw_name)?;
        match self.entries.remove(&name) {
            Some(_) => Ok(name),
            None => Err(FeedError::NotFound(name)),
        }
    }

    /// Every entry, sorted by name.
    pub fn list(&self) -> Vec<FeedSummary> {
        self.entries
            .iter()
            .map(|(name, entry)| FeedSummary {
                name: name.clone(),
                enabled: entry.enabled,
                channel_id: entry.channel_id,
            })
            .collect()
    }

    pub fn set_enabled(&mut self, raw_name: &str, enabled: bool) -> Result<String, FeedError> {
        let name = normalize_feed_name(raw_name)?;
        let entry = self.entry_mut(&name)?;
        entry.enabled = enabled;
        Ok(name)
    }

    pub fn set_destination(&mut self, raw_name: &str, channel_id: u64) -> Result<String, FeedError> {
        let name = normalize_feed_name(raw_name)?;
        let entry = self.entry_mut(&name)?;
        entry.channel_id = Some(channel_id);
        Ok(name)
    }

    /// Resolve user input to the key of a registered feed.
    pub fn resolve(&self, raw_name: &str) -> Result<String, FeedError> {
        let name = normalize_feed_name(raw_name)?;
        if self.entries.contains_key(&name) {
            Ok(name)
        } else {
            Err(FeedError::NotFound(name))
        }
    }

    #[cfg(test)]
    pub fn get(&self, raw_name: &str) -> Option<&FeedEntry> {
        let name = normalize_feed_name(raw_name).ok()?;
        self.entries.get(&name)
    }

    /// Feeds the poller should visit: enabled and with a destination.
    pub fn eligible(&self) -> Vec<FeedTarget> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .filter_map(|(name, entry)| {
                entry.channel_id.map(|channel_id| FeedTarget {
                    name: name.clone(),
                    channel_id,
                    generation: entry.generation,
                })
            })
            .collect()
    }

    /// True while `target` still describes the live entry and `post_id` has not
    /// gone out yet. Disabling or re-pointing the feed mid-pass ends the pass for it.
    pub fn should_relay(&self, target: &FeedTarget, post_id: &str) -> bool {
        self.entries
            .get(&target.name)
            .filter(|entry| entry.generation == target.generation)
            .filter(|entry| entry.enabled && entry.channel_id == Some(target.channel_id))
            .is_some_and(|entry| !entry.seen.contains(post_id))
    }

    /// Record a relayed post. Ignored if the feed was removed or replaced meanwhile.
    pub fn mark_seen(&mut self, target: &FeedTarget, post_id: &str) {
        if let Some(entry) = self
            .entries
            .get_mut(&target.name)
            .filter(|entry| entry.generation == target.generation)
        {
            entry.seen.insert(post_id);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut FeedEntry, FeedError> {
        self.entries
            .get_mut(name)
            .ok_or_else(|| FeedError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_prefix_and_case() {
        assert_eq!(normalize_feed_name("R/Foo").unwrap(), "foo");
        assert_eq!(normalize_feed_name("/r/rust").unwrap(), "rust");
        assert_eq!(normalize_feed_name("  AskReddit ").unwrap(), "askreddit");
        // A name starting with "r" keeps its first letter
        assert_eq!(normalize_feed_name("rust").unwrap(), "rust");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["R/Foo", "/r/Rust_Lang", "pics"] {
            let once = normalize_feed_name(raw).unwrap();
            assert_eq!(normalize_feed_name(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(matches!(normalize_feed_name(""), Err(FeedError::InvalidName(_))));
        assert!(matches!(normalize_feed_name("r/"), Err(FeedError::InvalidName(_))));
        assert!(matches!(
            normalize_feed_name("foo/../bar"),
            Err(FeedError::InvalidName(_))
        ));
    }

    #[test]
    fn test_normalize_caps_length() {
        let longest = "a".repeat(MAX_FEED_NAME_CHARS);
        assert_eq!(normalize_feed_name(&format!("r/{longest}")).unwrap(), longest);

        let too_long = "a".repeat(MAX_FEED_NAME_CHARS + 1);
        assert!(matches!(
            normalize_feed_name(&too_long),
            Err(FeedError::InvalidName(_))
        ));
        assert!(matches!(
            normalize_feed_name(&"x".repeat(1990)),
            Err(FeedError::InvalidName(_))
        ));
    }

    #[test]
    fn test_add_twice_conflicts() {
        let mut registry = FeedRegistry::new();
        registry.add("sports").unwrap();

        let second = registry.add("Sports");
        assert!(matches!(second, Err(FeedError::AlreadyExists(name)) if name == "sports"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_new_entry_is_inert() {
        let mut registry = FeedRegistry::new();
        registry.add("news").unwrap();

        let entry = registry.get("news").unwrap();
        assert!(!entry.enabled);
        assert_eq!(entry.channel_id, None);
        assert_eq!(entry.seen.len(), 0);
        assert!(registry.eligible().is_empty());
    }

    #[test]
    fn test_remove_unknown_leaves_registry_alone() {
        let mut registry = FeedRegistry::new();
        registry.add("news").unwrap();

        assert!(matches!(registry.remove("sports"), Err(FeedError::NotFound(_))));
        assert_eq!(registry.len(), 1);

        registry.remove("r/NEWS").unwrap();
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_lookup_after_prefixed_add() {
        let mut registry = FeedRegistry::new();
        registry.add("R/Foo").unwrap();
        registry.set_destination("foo", 42).unwrap();

        assert_eq!(registry.get("FOO").unwrap().channel_id, Some(42));
    }

    #[test]
    fn test_enabled_without_destination_is_not_eligible() {
        let mut registry = FeedRegistry::new();
        registry.add("a").unwrap();
        registry.add("b").unwrap();
        registry.set_enabled("a", true).unwrap();
        registry.set_enabled("b", true).unwrap();
        registry.set_destination("b", 7).unwrap();

        let eligible = registry.eligible();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].name, "b");
        assert_eq!(eligible[0].channel_id, 7);
    }

    #[test]
    fn test_mutating_unknown_feed_is_not_found() {
        let mut registry = FeedRegistry::new();
        assert!(matches!(
            registry.set_enabled("ghost", true),
            Err(FeedError::NotFound(_))
        ));
        assert!(matches!(
            registry.set_destination("ghost", 1),
            Err(FeedError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_is_sorted() {
        let mut registry = FeedRegistry::new();
        registry.add("zebra").unwrap();
        registry.add("apple").unwrap();
        registry.set_enabled("apple", true).unwrap();

        let listed = registry.list();
        assert_eq!(listed[0].name, "apple");
        assert!(listed[0].enabled);
        assert_eq!(listed[1].name, "zebra");
        assert!(!listed[1].enabled);
    }

    #[test]
    fn test_seen_ids_evict_oldest() {
        let mut seen = SeenIds::with_capacity(3);
        for id in ["a", "b", "c", "a", "d"] {
            seen.insert(id);
        }

        assert_eq!(seen.len(), 3);
        assert!(!seen.contains("a"));
        assert!(seen.contains("b"));
        assert!(seen.contains("d"));
    }

    fn active(registry: &mut FeedRegistry, name: &str, channel_id: u64) -> FeedTarget {
        registry.add(name).unwrap();
        registry.set_destination(name, channel_id).unwrap();
        registry.set_enabled(name, true).unwrap();
        registry.eligible().into_iter().find(|t| t.name == name).unwrap()
    }

    #[test]
    fn test_should_relay_only_unseen_posts() {
        let mut registry = FeedRegistry::new();
        let target = active(&mut registry, "rust", 1);

        assert!(registry.should_relay(&target, "a"));
        registry.mark_seen(&target, "a");
        assert!(!registry.should_relay(&target, "a"));
        assert!(registry.should_relay(&target, "b"));
    }

    #[test]
    fn test_removed_feed_stops_relaying() {
        let mut registry = FeedRegistry::new();
        let target = active(&mut registry, "rust", 1);

        registry.remove("rust").unwrap();
        assert!(!registry.should_relay(&target, "a"));
    }

    #[test]
    fn test_replaced_feed_ignores_stale_target() {
        let mut registry = FeedRegistry::new();
        let stale = active(&mut registry, "rust", 1);

        registry.remove("rust").unwrap();
        let fresh = active(&mut registry, "rust", 1);
        assert_ne!(stale, fresh);

        // Same name and channel, but a new entry
        assert!(!registry.should_relay(&stale, "a"));
        registry.mark_seen(&stale, "a");
        assert_eq!(registry.get("rust").unwrap().seen.len(), 0);
        assert!(registry.should_relay(&fresh, "a"));
    }

    #[test]
    fn test_disabled_or_repointed_feed_stops_relaying() {
        let mut registry = FeedRegistry::new();
        let target = active(&mut registry, "rust", 1);

        registry.set_enabled("rust", false).unwrap();
        assert!(!registry.should_relay(&target, "a"));

        registry.set_enabled("rust", true).unwrap();
        registry.set_destination("rust", 2).unwrap();
        assert!(!registry.should_relay(&target, "a"));

        // The post went out before the move, so it still counts as seen
        registry.mark_seen(&target, "a");
        assert_eq!(registry.get("rust").unwrap().seen.len(), 1);
    }
}
