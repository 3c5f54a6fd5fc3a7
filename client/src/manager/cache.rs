use std::hash::Hash;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::models::Snowflake;

/// Gives a manager access to the canonical key of a cached entity.
pub trait Identifiable {
    type Id;

    fn id(&self) -> Self::Id;
}

/// The reference shapes a caller may hand to a manager: a bare id, a raw
/// payload carrying an `id` field, or a live instance.
pub enum EntityRef<'a, K, V> {
    Id(K),
    Raw(&'a Value),
    Instance(&'a V),
}

impl<'a, K, V> From<&'a Value> for EntityRef<'a, K, V> {
    fn from(value: &'a Value) -> Self {
        Self::Raw(value)
    }
}

/// A keyed, insertion-ordered store for one entity family.
///
/// The cache is the sole owner of entity lifetime: other components hold
/// only ids and go through the owning manager to read or mutate.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Cache<K: Hash + Eq + Clone, V> {
    items: IndexMap<K, V>,
    max_size: Option<usize>,
}

impl<K: Hash + Eq + Clone, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self { items: IndexMap::new(), max_size: None }
    }
}

impl<K: Hash + Eq + Clone, V> Cache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(max_size: usize) -> Self {
        Self { items: IndexMap::new(), max_size: Some(max_size) }
    }

    pub fn insert(&mut self, id: K, item: V) {
        self.items.insert(id, item);
        self.manage_size();
    }

    pub fn get(&self, id: &K) -> Option<&V> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &K) -> Option<&mut V> {
        self.items.get_mut(id)
    }

    /// Removes an entry, preserving the insertion order of the rest.
    pub fn remove(&mut self, id: &K) -> Option<V> {
        self.items.shift_remove(id)
    }

    pub fn contains(&self, id: &K) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.items.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.items.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.items.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.items.values_mut()
    }

    pub fn set_max_size(&mut self, max_size: Option<usize>) {
        self.max_size = max_size;
        self.manage_size();
    }

    /// Drops the oldest entries once the configured capacity is exceeded.
    fn manage_size(&mut self) {
        let Some(max_size) = self.max_size else { return };

        while self.items.len() > max_size {
            self.items.shift_remove_index(0);
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + From<Snowflake>,
    V: Identifiable<Id = K>,
{
    /// Normalizes any reference shape to a canonical id.
    ///
    /// A raw payload resolves through its `id` field; an instance resolves
    /// through its own identity. No cache lookup is performed.
    pub fn resolve_id(&self, entity: EntityRef<K, V>) -> Option<K> {
        match entity {
            EntityRef::Id(id) => Some(id),
            EntityRef::Raw(data) => data.get("id")
                .and_then(Value::as_str)
                .map(|id| K::from(Snowflake::from(id))),
            EntityRef::Instance(instance) => Some(instance.id()),
        }
    }

    /// Normalizes any reference shape to the cached instance, if present.
    pub fn resolve(&self, entity: EntityRef<K, V>) -> Option<&V> {
        let id = self.resolve_id(entity)?;
        self.items.get(&id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    impl Identifiable for &'static str {
        type Id = Snowflake;

        fn id(&self) -> Snowflake {
            Snowflake::from(*self)
        }
    }

    #[test]
    fn insertion_order_is_kept() {
        let mut cache: Cache<Snowflake, &str> = Cache::new();
        cache.insert("3".into(), "c");
        cache.insert("1".into(), "a");
        cache.insert("2".into(), "b");

        let keys: Vec<String> = cache.keys().map(|k| k.0.clone()).collect();
        assert_eq!(keys, vec!["3", "1", "2"]);
    }

    #[test]
    fn bounded_cache_drops_oldest_first() {
        let mut cache: Cache<Snowflake, &str> = Cache::bounded(2);
        cache.insert("1".into(), "a");
        cache.insert("2".into(), "b");
        cache.insert("3".into(), "c");

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&"1".into()));
        assert!(cache.contains(&"3".into()));
    }

    #[test]
    fn resolve_accepts_raw_payloads() {
        let mut cache: Cache<Snowflake, &str> = Cache::new();
        cache.insert("42".into(), "answer");

        let raw = serde_json::json!({ "id": "42" });
        assert_eq!(cache.resolve(EntityRef::Raw(&raw)), Some(&"answer"));
        assert!(cache.resolve(EntityRef::Id("41".into())).is_none());
    }
}
