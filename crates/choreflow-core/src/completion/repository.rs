//! Authoritative store of completion records.

use std::sync::Arc;

use super::TaskCompletion;
use crate::error::{ChoreError, Result};
use crate::storage::{keys, Collection, KvStore};

/// Completion records kept under the `completions` key.
#[derive(Clone)]
pub struct CompletionRepository {
    completions: Collection<TaskCompletion>,
}

impl CompletionRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            completions: Collection::new(store, keys::COMPLETIONS),
        }
    }

    pub fn all(&self) -> Result<Vec<TaskCompletion>> {
        Ok(self.completions.load()?)
    }

    pub fn get(&self, id: &str) -> Result<Option<TaskCompletion>> {
        Ok(self.all()?.into_iter().find(|c| c.id == id))
    }

    /// Insert a pending completion unless one is already pending for the
    /// same user and task. The check and the insert are one atomic update.
    pub fn insert_pending(&self, completion: TaskCompletion) -> Result<TaskCompletion> {
        self.completions.mutate(|items| {
            if let Some(existing) = items.iter().find(|c| {
                c.is_pending() && c.user_id == completion.user_id && c.task_id == completion.task_id
            }) {
                return Err(ChoreError::DuplicatePending {
                    user_id: completion.user_id.clone(),
                    task_id: completion.task_id.clone(),
                    existing_id: existing.id.clone(),
                });
            }
            items.push(completion.clone());
            Ok(completion.clone())
        })
    }

    /// Atomically modify one completion and return the stored result.
    ///
    /// Nothing is written when `f` fails.
    pub fn modify(
        &self,
        id: &str,
        mut f: impl FnMut(&mut TaskCompletion) -> Result<()>,
    ) -> Result<TaskCompletion> {
        self.completions.mutate(|items| {
            let completion = items
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| ChoreError::not_found("Completion", id))?;
            let mut updated = completion.clone();
            f(&mut updated)?;
            *completion = updated.clone();
            Ok(updated)
        })
    }

    /// Approved completions for (family, user, task), oldest first.
    pub fn approved_for(&self, family_id: &str, user_id: &str, task_id: &str) -> Result<Vec<TaskCompletion>> {
        let mut approved: Vec<_> = self
            .all()?
            .into_iter()
            .filter(|c| {
                c.is_approved() && c.family_id == family_id && c.user_id == user_id && c.task_id == task_id
            })
            .collect();
        approved.sort_by_key(|c| c.completed_at);
        Ok(approved)
    }

    /// Most recent approved completion for (family, user, task).
    pub fn latest_approved(&self, family_id: &str, user_id: &str, task_id: &str) -> Result<Option<TaskCompletion>> {
        Ok(self.approved_for(family_id, user_id, task_id)?.pop())
    }

    /// Pending completions in a family, oldest first.
    pub fn pending_for_family(&self, family_id: &str) -> Result<Vec<TaskCompletion>> {
        let mut pending: Vec<_> = self
            .all()?
            .into_iter()
            .filter(|c| c.is_pending() && c.family_id == family_id)
            .collect();
        pending.sort_by_key(|c| c.completed_at);
        Ok(pending)
    }

    /// Completions submitted by a user, newest first, optionally for one task.
    pub fn for_user(&self, user_id: &str, task_id: Option<&str>) -> Result<Vec<TaskCompletion>> {
        let mut mine: Vec<_> = self
            .all()?
            .into_iter()
            .filter(|c| c.user_id == user_id && task_id.map_or(true, |t| c.task_id == t))
            .collect();
        mine.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(mine)
    }

    pub fn for_family(&self, family_id: &str) -> Result<Vec<TaskCompletion>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|c| c.family_id == family_id)
            .collect())
    }
}
