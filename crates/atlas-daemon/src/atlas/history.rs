//! Append-only log of published global roots and the staleness window.

use atlas_types::{AtlasError, AtlasHead, AtlasResult, FieldBytes};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::config::RootHistoryConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub version: u64,
    pub root: FieldBytes,
    pub published_at: DateTime<Utc>,
    pub superseded_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct HistoryInner {
    entries: BTreeMap<u64, HistoryEntry>,
    by_root: HashMap<FieldBytes, u64>,
    current: Option<u64>,
}

impl HistoryInner {
    fn prune(&mut self, max_versions: usize) {
        let keep = max_versions.max(1);
        while self.entries.len() > keep {
            let Some((_, oldest)) = self.entries.pop_first() else {
                break;
            };
            if self.by_root.get(&oldest.root) == Some(&oldest.version) {
                self.by_root.remove(&oldest.root);
            }
        }
    }
}

pub struct RootHistory {
    config: RootHistoryConfig,
    inner: RwLock<HistoryInner>,
}

impl RootHistory {
    pub fn new(config: RootHistoryConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(HistoryInner::default()),
        }
    }

    /// Rebuild from persisted heads, oldest first.
    pub fn from_heads(config: RootHistoryConfig, heads: &[AtlasHead]) -> Self {
        let history = Self::new(config);
        for head in heads {
            history.record(head);
        }
        history
    }

    pub fn config(&self) -> RootHistoryConfig {
        self.config
    }

    /// Append a newly published head; the previous current root is superseded now.
    /// Entries older than the version window are dropped; sled keeps every head.
    pub fn record(&self, head: &AtlasHead) {
        let mut inner = self.inner.write();
        if let Some(previous) = inner.current {
            if previous >= head.version {
                return;
            }
            if let Some(entry) = inner.entries.get_mut(&previous) {
                entry.superseded_at = Some(head.published_at);
            }
        }
        inner.entries.insert(
            head.version,
            HistoryEntry {
                version: head.version,
                root: head.global_root,
                published_at: head.published_at,
                superseded_at: None,
            },
        );
        inner.by_root.entry(head.global_root).or_insert(head.version);
        inner.current = Some(head.version);
        inner.prune(self.config.max_versions);
    }

    pub fn check(&self, root: &FieldBytes) -> AtlasResult<()> {
        self.check_at(root, Utc::now())
    }

    /// Accept the current root, or a superseded one that is both within the
    /// last `max_versions` versions and younger than `max_age_secs`.
    pub fn check_at(&self, root: &FieldBytes, now: DateTime<Utc>) -> AtlasResult<()> {
        let inner = self.inner.read();
        let Some(&version) = inner.by_root.get(root) else {
            return Err(AtlasError::UnknownRoot(root.short_hex()));
        };
        let current = inner.current.unwrap_or(version);
        if version == current {
            return Ok(());
        }

        let within_versions = current - version < self.config.max_versions as u64;
        let max_age = i64::try_from(self.config.max_age_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        let within_age = inner
            .entries
            .get(&version)
            .and_then(|e| e.superseded_at)
            .map(|at| now.signed_duration_since(at) < max_age)
            .unwrap_or(false);

        if within_versions && within_age {
            Ok(())
        } else {
            Err(AtlasError::StaleRoot(format!(
                "root {} from version {} (current {})",
                root.short_hex(),
                version,
                current
            )))
        }
    }

    pub fn current(&self) -> Option<HistoryEntry> {
        let inner = self.inner.read();
        inner.current.and_then(|v| inner.entries.get(&v).copied())
    }

    pub fn lookup(&self, root: &FieldBytes) -> Option<HistoryEntry> {
        let inner = self.inner.read();
        inner
            .by_root
            .get(root)
            .and_then(|v| inner.entries.get(v).copied())
    }

    /// Newest entries first.
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.inner.read().entries.values().rev().take(limit).copied().collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn root(n: u8) -> FieldBytes {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        FieldBytes::from_bytes(bytes)
    }

    fn head(version: u64, at: DateTime<Utc>) -> AtlasHead {
        AtlasHead {
            version,
            global_root: root(version as u8),
            published_at: at,
        }
    }

    fn config(max_versions: usize, max_age_secs: u64) -> RootHistoryConfig {
        RootHistoryConfig {
            max_versions,
            max_age_secs,
        }
    }

    #[test]
    fn test_current_root_always_accepted() {
        let t0 = Utc::now();
        let history = RootHistory::from_heads(config(1, 1), &[head(0, t0), head(1, t0)]);
        assert!(history.check_at(&root(1), t0 + Duration::days(30)).is_ok());
    }

    #[test]
    fn test_unknown_root() {
        let history = RootHistory::from_heads(config(8, 60), &[head(0, Utc::now())]);
        let err = history.check(&root(99)).unwrap_err();
        assert!(matches!(err, AtlasError::UnknownRoot(_)));
        assert_eq!(err.code(), "STALE_ROOT");
    }

    #[test]
    fn test_version_window() {
        let t0 = Utc::now();
        let heads: Vec<_> = (0..=4).map(|v| head(v, t0)).collect();
        let history = RootHistory::from_heads(config(3, 3600), &heads);

        // Latest three versions are 2, 3 and 4.
        assert!(history.check_at(&root(3), t0).is_ok());
        assert!(history.check_at(&root(2), t0).is_ok());
        let err = history.check_at(&root(1), t0).unwrap_err();
        assert_eq!(err.code(), "STALE_ROOT");
    }

    #[test]
    fn test_old_roots_are_pruned() {
        let t0 = Utc::now();
        let heads: Vec<_> = (0..=20).map(|v| head(v, t0)).collect();
        let history = RootHistory::from_heads(config(4, 3600), &heads);

        assert_eq!(history.len(), 4);
        assert!(history.lookup(&root(16)).is_none());
        assert!(matches!(history.check_at(&root(3), t0), Err(AtlasError::UnknownRoot(_))));
        assert!(history.check_at(&root(17), t0).is_ok());
        assert_eq!(history.recent(10).len(), 4);
    }

    #[test]
    fn test_huge_max_age_does_not_overflow() {
        let t0 = Utc::now();
        for max_age_secs in [u64::MAX / 2, u64::MAX] {
            let history = RootHistory::from_heads(
                config(64, max_age_secs),
                &[head(0, t0), head(1, t0)],
            );
            assert!(history.check_at(&root(0), t0 + Duration::seconds(1)).is_ok());
        }
    }

    #[test]
    fn test_age_window() {
        let t0 = Utc::now();
        let history = RootHistory::from_heads(
            config(64, 60),
            &[head(0, t0), head(1, t0 + Duration::seconds(10))],
        );
        assert!(history.check_at(&root(0), t0 + Duration::seconds(30)).is_ok());
        let err = history.check_at(&root(0), t0 + Duration::seconds(71)).unwrap_err();
        assert!(matches!(err, AtlasError::StaleRoot(_)));
    }

    #[test]
    fn test_record_ignores_old_versions() {
        let t0 = Utc::now();
        let history = RootHistory::from_heads(config(64, 60), &[head(0, t0), head(1, t0)]);
        history.record(&head(1, t0));
        history.record(&head(0, t0));
        assert_eq!(history.len(), 2);
        assert_eq!(history.current().unwrap().version, 1);
        assert_eq!(history.recent(1)[0].version, 1);
        assert!(history.lookup(&root(0)).unwrap().superseded_at.is_some());
    }

    proptest::proptest! {
        #[test]
        fn prop_window_is_version_distance(max_versions in 1usize..16, latest in 0u64..40, probe in 0u64..40) {
            let t0 = Utc::now();
            let heads: Vec<_> = (0..=latest).map(|v| head(v, t0)).collect();
            let history = RootHistory::from_heads(config(max_versions, 3600), &heads);
            let probe = probe.min(latest);

            let accepted = history.check_at(&root(probe as u8), t0).is_ok();
            proptest::prop_assert_eq!(accepted, latest - probe < max_versions as u64);
        }
    }
}
