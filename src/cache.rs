use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Hierarchical cache key, e.g. `["recurringPlans", "target", "7"]`.
///
/// Invalidation works on prefixes: invalidating `["recurringPlans"]` drops
/// every plan query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryKey(parts.into_iter().map(Into::into).collect())
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    fn id(&self) -> String {
        self.0.join("/")
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub fetched_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

/// Query results keyed by [`QueryKey`], with their fetch time.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct QueryCache {
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
}

impl QueryCache {
    /// Cached value for `key` if it was fetched less than `stale_after` ago
    /// and still decodes as `T`.
    pub fn get_fresh<T: DeserializeOwned>(&self, key: &QueryKey, stale_after: Duration, now: DateTime<Utc>) -> Option<T> {
        let entry = self.entries.get(&key.id())?;
        let age = now.signed_duration_since(entry.fetched_at).to_std().ok()?;
        if age >= stale_after {
            return None;
        }
        serde_json::from_value(entry.data.clone()).ok()
    }

    pub fn put<T: Serialize>(&mut self, key: QueryKey, value: &T, now: DateTime<Utc>) {
        match serde_json::to_value(value) {
            Ok(data) => {
                self.entries.insert(key.id(), CacheEntry { key, fetched_at: now, data });
            }
            Err(e) => tracing::warn!(%key, error = %e, "value not cacheable"),
        }
    }

    /// Drops every entry under `prefix`, returning how many were removed.
    pub fn invalidate(&mut self, prefix: &QueryKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.key.starts_with(prefix));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
    }

    #[test]
    fn fresh_then_stale() {
        let mut cache = QueryCache::default();
        let key = QueryKey::new(["tasks"]);
        cache.put(key.clone(), &vec![1, 2, 3], t0());

        let ttl = Duration::from_secs(60);
        let hit: Option<Vec<i32>> = cache.get_fresh(&key, ttl, t0() + chrono::Duration::seconds(30));
        assert_eq!(hit, Some(vec![1, 2, 3]));

        let miss: Option<Vec<i32>> = cache.get_fresh(&key, ttl, t0() + chrono::Duration::seconds(60));
        assert!(miss.is_none());
    }

    #[test]
    fn prefix_invalidation() {
        let mut cache = QueryCache::default();
        cache.put(QueryKey::new(["recurringPlans", "all"]), &1, t0());
        cache.put(QueryKey::new(["recurringPlans", "target", "7"]), &2, t0());
        cache.put(QueryKey::new(["targets"]), &3, t0());

        assert_eq!(cache.invalidate(&QueryKey::new(["recurringPlans"])), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.invalidate(&QueryKey::new(["recurring"])), 0);
    }

    #[test]
    fn wrong_shape_is_a_miss() {
        let mut cache = QueryCache::default();
        let key = QueryKey::new(["tasks"]);
        cache.put(key.clone(), &"text", t0());
        let hit: Option<Vec<i32>> = cache.get_fresh(&key, Duration::from_secs(60), t0());
        assert!(hit.is_none());
    }
}
