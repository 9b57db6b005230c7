//! Family calendar exceptions that relax streak continuity.
//!
//! A holiday widens the allowed gap between two completions when it falls
//! strictly between them. Scope is additive: an exception applies when it
//! affects all tasks, names the task, or names the user.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::completion::require_non_empty;
use crate::error::Result;
use crate::storage::{keys, Collection, KvStore};

/// A configured holiday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HolidayException {
    pub id: String,
    pub family_id: String,
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub affects_all_tasks: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_ids: Vec<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HolidayException {
    /// Additive scope test.
    pub fn applies_to(&self, task_id: Option<&str>, user_id: Option<&str>) -> bool {
        if self.affects_all_tasks {
            return true;
        }
        if let Some(task_id) = task_id {
            if self.task_ids.iter().any(|t| t == task_id) {
                return true;
            }
        }
        match (user_id, self.user_id.as_deref()) {
            (Some(user), Some(scoped)) => user == scoped,
            _ => false,
        }
    }

    /// Whether any scope rule is set at all.
    pub fn has_scope(&self) -> bool {
        self.affects_all_tasks || !self.task_ids.is_empty() || self.user_id.is_some()
    }
}

/// Caller-supplied data for a new holiday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewHolidayException {
    pub family_id: String,
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub affects_all_tasks: bool,
    #[serde(default)]
    pub task_ids: Vec<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl NewHolidayException {
    /// Family-wide holiday covering every task.
    pub fn all_tasks(family_id: impl Into<String>, date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            family_id: family_id.into(),
            date,
            name: name.into(),
            affects_all_tasks: true,
            task_ids: Vec::new(),
            user_id: None,
        }
    }

    pub fn for_tasks(
        family_id: impl Into<String>,
        date: NaiveDate,
        name: impl Into<String>,
        task_ids: Vec<String>,
    ) -> Self {
        Self {
            affects_all_tasks: false,
            task_ids,
            ..Self::all_tasks(family_id, date, name)
        }
    }

    pub fn for_user(
        family_id: impl Into<String>,
        date: NaiveDate,
        name: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            affects_all_tasks: false,
            user_id: Some(user_id.into()),
            ..Self::all_tasks(family_id, date, name)
        }
    }
}

/// Per-family holiday calendar.
#[derive(Clone)]
pub struct HolidayExceptionRegistry {
    holidays: Collection<HolidayException>,
    clock: Arc<dyn Clock>,
}

impl HolidayExceptionRegistry {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            holidays: Collection::new(store, keys::HOLIDAY_EXCEPTIONS),
            clock,
        }
    }

    /// Store a new exception.
    pub fn add(&self, new: NewHolidayException) -> Result<HolidayException> {
        require_non_empty("family_id", &new.family_id)?;
        require_non_empty("name", &new.name)?;

        let holiday = HolidayException {
            id: Uuid::new_v4().to_string(),
            family_id: new.family_id,
            date: new.date,
            name: new.name,
            affects_all_tasks: new.affects_all_tasks,
            task_ids: new.task_ids,
            user_id: new.user_id,
            created_at: self.clock.now(),
        };
        if !holiday.has_scope() {
            warn!(
                holiday_id = %holiday.id,
                family_id = %holiday.family_id,
                "holiday exception has no scope and will never match"
            );
        }

        self.holidays.mutate(|items| {
            items.push(holiday.clone());
            Ok(())
        })?;
        info!(holiday_id = %holiday.id, date = %holiday.date, "holiday exception added");
        Ok(holiday)
    }

    /// Exceptions for a family, ordered by date.
    pub fn list(&self, family_id: &str) -> Result<Vec<HolidayException>> {
        let mut holidays: Vec<_> = self
            .holidays
            .load()?
            .into_iter()
            .filter(|h| h.family_id == family_id)
            .collect();
        holidays.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
        Ok(holidays)
    }

    /// Remove by id. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.holidays.mutate(|items| {
            let before = items.len();
            items.retain(|h| h.id != id);
            Ok(items.len() != before)
        })?;
        if removed {
            info!(holiday_id = %id, "holiday exception removed");
        }
        Ok(removed)
    }

    /// Whether an applicable exception is dated within `[start, end]`.
    pub fn try_exception_falls_in(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        family_id: &str,
        task_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<bool> {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        Ok(self.holidays.load()?.iter().any(|h| {
            h.family_id == family_id && h.date >= lo && h.date <= hi && h.applies_to(task_id, user_id)
        }))
    }

    /// Like [`Self::try_exception_falls_in`], but a lookup failure counts as
    /// "no holiday" so streak calculation degrades instead of failing.
    pub fn exception_falls_in(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        family_id: &str,
        task_id: Option<&str>,
        user_id: Option<&str>,
    ) -> bool {
        match self.try_exception_falls_in(start, end, family_id, task_id, user_id) {
            Ok(found) => found,
            Err(e) => {
                warn!(family_id = %family_id, error = %e, "holiday lookup failed; assuming no holiday");
                false
            }
        }
    }
}
