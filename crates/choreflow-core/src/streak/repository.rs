//! Persisted streaks, one per (user, task).

use std::sync::Arc;

use super::Streak;
use crate::error::{ChoreError, Result};
use crate::storage::{keys, Collection, KvStore};

/// Before/after pair from a streak write.
#[derive(Debug, Clone)]
pub struct StreakWrite {
    pub previous: Option<Streak>,
    pub current: Streak,
}

impl StreakWrite {
    pub fn created(&self) -> bool {
        self.previous.is_none()
    }

    pub fn value_changed(&self) -> bool {
        self.previous.as_ref().map_or(0, |p| p.current_streak) != self.current.current_streak
    }
}

#[derive(Clone)]
pub struct StreakRepository {
    streaks: Collection<Streak>,
}

impl StreakRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            streaks: Collection::new(store, keys::STREAKS),
        }
    }

    pub fn all(&self) -> Result<Vec<Streak>> {
        Ok(self.streaks.load()?)
    }

    pub fn get(&self, user_id: &str, task_id: &str) -> Result<Option<Streak>> {
        Ok(self
            .all()?
            .into_iter()
            .find(|s| s.user_id == user_id && s.task_id == task_id))
    }

    pub fn for_family(&self, family_id: &str) -> Result<Vec<Streak>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|s| s.family_id == family_id)
            .collect())
    }

    pub fn for_user(&self, user_id: &str) -> Result<Vec<Streak>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect())
    }

    /// Insert or replace the streak for (user, task) under the collection lock.
    ///
    /// `build` receives the stored streak, if any, and returns the new one.
    /// Returning `None` leaves the collection untouched.
    pub fn upsert(
        &self,
        user_id: &str,
        task_id: &str,
        mut build: impl FnMut(Option<&Streak>) -> Result<Option<Streak>>,
    ) -> Result<Option<StreakWrite>> {
        self.streaks.mutate(|items| {
            let position = items
                .iter()
                .position(|s| s.user_id == user_id && s.task_id == task_id);
            let previous = position.map(|i| items[i].clone());
            let Some(current) = build(previous.as_ref())? else {
                return Ok(None);
            };
            match position {
                Some(i) => items[i] = current.clone(),
                None => items.push(current.clone()),
            }
            Ok(Some(StreakWrite { previous, current }))
        })
    }

    /// Modify an existing streak; `NotFound` when absent.
    pub fn modify(
        &self,
        user_id: &str,
        task_id: &str,
        mut f: impl FnMut(&mut Streak) -> Result<()>,
    ) -> Result<StreakWrite> {
        self.streaks.mutate(|items| {
            let streak = items
                .iter_mut()
                .find(|s| s.user_id == user_id && s.task_id == task_id)
                .ok_or_else(|| ChoreError::not_found("Streak", format!("{user_id}/{task_id}")))?;
            let previous = streak.clone();
            let mut updated = streak.clone();
            f(&mut updated)?;
            *streak = updated.clone();
            Ok(StreakWrite {
                previous: Some(previous),
                current: updated,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::streak::TaskFrequency;

    #[test]
    fn upsert_inserts_then_replaces() {
        let repo = StreakRepository::new(Arc::new(MemoryStore::new()));
        let first = repo
            .upsert("kid", "dishes", |prev| {
                assert!(prev.is_none());
                let mut s = Streak::empty("kid", "dishes", TaskFrequency::Daily, "fam");
                s.current_streak = 1;
                s.longest_streak = 1;
                Ok(Some(s))
            })
            .unwrap()
            .unwrap();
        assert!(first.created());
        assert!(first.value_changed());

        let second = repo
            .upsert("kid", "dishes", |prev| {
                let mut s = prev.cloned().unwrap();
                s.current_streak = 2;
                s.longest_streak = 2;
                Ok(Some(s))
            })
            .unwrap()
            .unwrap();
        assert!(!second.created());
        assert_eq!(second.previous.unwrap().current_streak, 1);
        assert_eq!(repo.all().unwrap().len(), 1);
    }

    #[test]
    fn declined_upsert_stores_nothing() {
        let repo = StreakRepository::new(Arc::new(MemoryStore::new()));
        let write = repo.upsert("kid", "dishes", |_| Ok(None)).unwrap();
        assert!(write.is_none());
        assert!(repo.all().unwrap().is_empty());
    }

    #[test]
    fn modify_missing_is_not_found() {
        let repo = StreakRepository::new(Arc::new(MemoryStore::new()));
        let err = repo.modify("kid", "dishes", |_| Ok(())).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
