//! Bounded audit trail of streak value changes.
//!
//! The ledger is an observability aid, not authoritative state: it keeps the
//! most recent entries for the whole installation in a ring buffer and
//! evicts the oldest first. A per-family metadata record is refreshed on
//! every streak write and can be rebuilt from the ledger at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::Result;
use crate::storage::{keys, read_json, update_json, KvStore};
use crate::streak::Streak;

/// Entries retained when no capacity is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StreakChangeKind {
    Gained,
    Lost,
    Milestone,
}

/// One recorded streak change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakHistoryEntry {
    pub id: String,
    pub user_id: String,
    pub task_id: String,
    pub family_id: String,
    pub date: DateTime<Utc>,
    pub streak_value: u32,
    #[serde(default)]
    pub previous_value: Option<u32>,
    pub kind: StreakChangeKind,
}

/// Fixed-capacity FIFO of entries, oldest at the front.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HistoryRing {
    entries: VecDeque<StreakHistoryEntry>,
}

impl HistoryRing {
    /// Append, evicting from the front until within `capacity`.
    pub fn push(&mut self, entry: StreakHistoryEntry, capacity: usize) {
        self.entries.push_back(entry);
        while self.entries.len() > capacity.max(1) {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest first.
    pub fn iter_recent(&self) -> impl Iterator<Item = &StreakHistoryEntry> {
        self.entries.iter().rev()
    }
}

/// Read filter for [`StreakHistoryLedger::entries`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryFilter {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub family_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl HistoryFilter {
    fn matches(&self, entry: &StreakHistoryEntry) -> bool {
        self.user_id.as_deref().map_or(true, |u| entry.user_id == u)
            && self.task_id.as_deref().map_or(true, |t| entry.task_id == t)
            && self.family_id.as_deref().map_or(true, |f| entry.family_id == f)
    }
}

/// Advisory per-family summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakMetadata {
    pub family_id: String,
    #[serde(default)]
    pub last_daily_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_streaks_created: u32,
    #[serde(default)]
    pub total_milestones_reached: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StreakMetadata {
    fn new(family_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            family_id: family_id.to_string(),
            last_daily_check: None,
            total_streaks_created: 0,
            total_milestones_reached: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

type MetadataMap = BTreeMap<String, StreakMetadata>;

/// Streak history ledger plus family metadata.
#[derive(Clone)]
pub struct StreakHistoryLedger {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    capacity: usize,
}

impl StreakHistoryLedger {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_capacity(store, clock, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        Self {
            store,
            clock,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn append(&self, entry: StreakHistoryEntry) -> Result<StreakHistoryEntry> {
        let capacity = self.capacity;
        update_json(self.store.as_ref(), keys::STREAK_HISTORY, |ring: &mut HistoryRing| {
            ring.push(entry.clone(), capacity);
            Ok(())
        })?;
        debug!(
            user_id = %entry.user_id,
            task_id = %entry.task_id,
            kind = ?entry.kind,
            value = entry.streak_value,
            "streak history entry recorded"
        );
        Ok(entry)
    }

    fn entry_for(&self, streak: &Streak, previous: Option<u32>, kind: StreakChangeKind) -> StreakHistoryEntry {
        StreakHistoryEntry {
            id: Uuid::new_v4().to_string(),
            user_id: streak.user_id.clone(),
            task_id: streak.task_id.clone(),
            family_id: streak.family_id.clone(),
            date: self.clock.now(),
            streak_value: streak.current_streak,
            previous_value: previous,
            kind,
        }
    }

    /// Record a gain or loss when the current value moved.
    ///
    /// A missing previous streak counts as a previous value of zero.
    pub fn record_change(&self, previous: Option<&Streak>, current: &Streak) -> Result<Option<StreakHistoryEntry>> {
        let before = previous.map_or(0, |p| p.current_streak);
        let after = current.current_streak;
        if before == after {
            return Ok(None);
        }
        let kind = if after > before {
            StreakChangeKind::Gained
        } else {
            StreakChangeKind::Lost
        };
        self.append(self.entry_for(current, Some(before), kind)).map(Some)
    }

    /// Record a threshold crossing reported by an external caller.
    pub fn record_milestone(
        &self,
        user_id: &str,
        task_id: &str,
        family_id: &str,
        streak_value: u32,
    ) -> Result<StreakHistoryEntry> {
        let entry = StreakHistoryEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            task_id: task_id.to_string(),
            family_id: family_id.to_string(),
            date: self.clock.now(),
            streak_value,
            previous_value: None,
            kind: StreakChangeKind::Milestone,
        };
        let entry = self.append(entry)?;
        self.update_metadata(family_id, |meta| meta.total_milestones_reached += 1)?;
        Ok(entry)
    }

    /// Filtered entries, most recent first.
    pub fn entries(&self, filter: &HistoryFilter) -> Result<Vec<StreakHistoryEntry>> {
        let ring: HistoryRing = read_json(self.store.as_ref(), keys::STREAK_HISTORY)?;
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(ring
            .iter_recent()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }

    pub fn len(&self) -> Result<usize> {
        let ring: HistoryRing = read_json(self.store.as_ref(), keys::STREAK_HISTORY)?;
        Ok(ring.len())
    }

    pub fn metadata(&self, family_id: &str) -> Result<Option<StreakMetadata>> {
        let map: MetadataMap = read_json(self.store.as_ref(), keys::STREAK_METADATA)?;
        Ok(map.get(family_id).cloned())
    }

    fn update_metadata(&self, family_id: &str, mut f: impl FnMut(&mut StreakMetadata)) -> Result<StreakMetadata> {
        let now = self.clock.now();
        update_json(self.store.as_ref(), keys::STREAK_METADATA, |map: &mut MetadataMap| {
            let meta = map
                .entry(family_id.to_string())
                .or_insert_with(|| StreakMetadata::new(family_id, now));
            f(meta);
            meta.updated_at = now;
            Ok(meta.clone())
        })
    }

    /// Refresh metadata after a streak write.
    pub fn note_streak_written(&self, family_id: &str, created: bool) -> Result<StreakMetadata> {
        self.update_metadata(family_id, |meta| {
            if created {
                meta.total_streaks_created += 1;
            }
        })
    }

    /// Stamp the time of the latest daily check.
    pub fn note_daily_check(&self, family_id: &str) -> Result<StreakMetadata> {
        let now = self.clock.now();
        self.update_metadata(family_id, |meta| meta.last_daily_check = Some(now))
    }

    /// Recompute the counters from ledger contents.
    ///
    /// Entries evicted from the ring are not counted, so rebuilt totals may
    /// be lower than the incrementally maintained ones.
    pub fn rebuild_metadata(&self, family_id: &str) -> Result<StreakMetadata> {
        let entries = self.entries(&HistoryFilter {
            family_id: Some(family_id.to_string()),
            ..HistoryFilter::default()
        })?;
        let pairs: BTreeSet<(&str, &str)> = entries
            .iter()
            .map(|e| (e.user_id.as_str(), e.task_id.as_str()))
            .collect();
        let total_streaks = pairs.len() as u32;
        let milestones = entries
            .iter()
            .filter(|e| e.kind == StreakChangeKind::Milestone)
            .count() as u32;

        self.update_metadata(family_id, |meta| {
            meta.total_streaks_created = total_streaks;
            meta.total_milestones_reached = milestones;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::MemoryStore;
    use crate::streak::TaskFrequency;
    use chrono::NaiveDate;

    fn ledger(capacity: usize) -> StreakHistoryLedger {
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        StreakHistoryLedger::with_capacity(Arc::new(MemoryStore::new()), Arc::new(clock), capacity)
    }

    fn streak(user: &str, task: &str, value: u32) -> Streak {
        let mut s = Streak::empty(user, task, TaskFrequency::Daily, "fam");
        s.current_streak = value;
        s.longest_streak = value;
        s
    }

    #[test]
    fn records_gain_and_loss_only_on_change() {
        let ledger = ledger(10);
        let one = streak("kid", "dishes", 1);
        let two = streak("kid", "dishes", 2);
        let zero = streak("kid", "dishes", 0);

        let gained = ledger.record_change(None, &one).unwrap().unwrap();
        assert_eq!(gained.kind, StreakChangeKind::Gained);
        assert_eq!(gained.previous_value, Some(0));
        assert!(ledger.record_change(Some(&one), &one).unwrap().is_none());
        ledger.record_change(Some(&one), &two).unwrap();
        let lost = ledger.record_change(Some(&two), &zero).unwrap().unwrap();
        assert_eq!(lost.kind, StreakChangeKind::Lost);

        let values: Vec<_> = ledger
            .entries(&HistoryFilter::default())
            .unwrap()
            .into_iter()
            .map(|e| e.streak_value)
            .collect();
        assert_eq!(values, vec![0, 2, 1]);
    }

    #[test]
    fn ring_evicts_oldest_first() {
        let ledger = ledger(3);
        for value in 1..=5 {
            ledger
                .record_change(Some(&streak("kid", "dishes", value - 1)), &streak("kid", "dishes", value))
                .unwrap();
        }
        assert_eq!(ledger.len().unwrap(), 3);
        let values: Vec<_> = ledger
            .entries(&HistoryFilter::default())
            .unwrap()
            .into_iter()
            .map(|e| e.streak_value)
            .collect();
        assert_eq!(values, vec![5, 4, 3]);
    }

    #[test]
    fn filters_and_limit() {
        let ledger = ledger(100);
        ledger.record_change(None, &streak("kid", "dishes", 1)).unwrap();
        ledger.record_change(None, &streak("kid", "trash", 1)).unwrap();
        ledger.record_change(None, &streak("sib", "dishes", 1)).unwrap();

        let kid = ledger
            .entries(&HistoryFilter {
                user_id: Some("kid".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(kid.len(), 2);
        assert_eq!(kid[0].task_id, "trash");

        let limited = ledger
            .entries(&HistoryFilter {
                task_id: Some("dishes".into()),
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].user_id, "sib");
    }

    #[test]
    fn milestones_update_metadata() {
        let ledger = ledger(100);
        ledger.note_streak_written("fam", true).unwrap();
        ledger.note_streak_written("fam", false).unwrap();
        ledger.record_milestone("kid", "dishes", "fam", 7).unwrap();

        let meta = ledger.metadata("fam").unwrap().unwrap();
        assert_eq!(meta.total_streaks_created, 1);
        assert_eq!(meta.total_milestones_reached, 1);
        assert!(meta.last_daily_check.is_none());
        assert!(ledger.metadata("other").unwrap().is_none());
    }

    #[test]
    fn rebuild_counts_from_ledger() {
        let ledger = ledger(100);
        ledger.record_change(None, &streak("kid", "dishes", 1)).unwrap();
        ledger.record_change(None, &streak("kid", "trash", 1)).unwrap();
        ledger.record_milestone("kid", "dishes", "fam", 5).unwrap();
        ledger.record_milestone("kid", "dishes", "fam", 10).unwrap();

        let meta = ledger.rebuild_metadata("fam").unwrap();
        assert_eq!(meta.total_streaks_created, 2);
        assert_eq!(meta.total_milestones_reached, 2);
    }
}
