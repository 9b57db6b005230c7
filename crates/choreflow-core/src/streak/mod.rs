//! Streak continuity.
//!
//! A streak counts consecutive approved completions of one task by one
//! user. Whether two completions are "consecutive" depends on the task's
//! recurrence frequency and on holiday exceptions that fall in the gap
//! (see [`gap`]).

pub mod engine;
pub mod gap;
pub mod repository;
pub mod stats;

pub use engine::{DailyCheckReport, StreakEngine};
pub use repository::StreakRepository;
pub use stats::{StreakStats, TaskStreakBreakdown, UserStreakSummary};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ChoreError, Result};

/// Recurrence cadence of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskFrequency {
    Daily,
    Weekly,
    Monthly,
    /// One-shot tasks never form a streak.
    Once,
}

impl TaskFrequency {
    /// Largest day gap still counted as consecutive, `None` for one-shot tasks.
    pub fn max_gap_days(&self, holiday_in_gap: bool) -> Option<i64> {
        let (base, holiday_bonus) = match self {
            TaskFrequency::Daily => (2, 1),
            TaskFrequency::Weekly => (10, 2),
            TaskFrequency::Monthly => (35, 3),
            TaskFrequency::Once => return None,
        };
        Some(if holiday_in_gap { base + holiday_bonus } else { base })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFrequency::Daily => "daily",
            TaskFrequency::Weekly => "weekly",
            TaskFrequency::Monthly => "monthly",
            TaskFrequency::Once => "once",
        }
    }
}

impl fmt::Display for TaskFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskFrequency {
    type Err = ChoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(TaskFrequency::Daily),
            "weekly" => Ok(TaskFrequency::Weekly),
            "monthly" => Ok(TaskFrequency::Monthly),
            "once" => Ok(TaskFrequency::Once),
            other => Err(ChoreError::invalid_input(
                "frequency",
                format!("unknown frequency '{other}'"),
            )),
        }
    }
}

/// Task lookup result supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRef {
    pub task_id: String,
    pub frequency: TaskFrequency,
    pub family_id: String,
}

impl TaskRef {
    pub fn new(
        task_id: impl Into<String>,
        frequency: TaskFrequency,
        family_id: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            frequency,
            family_id: family_id.into(),
        }
    }
}

/// Continuity state of one user's completions of one task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Streak {
    pub id: String,
    pub user_id: String,
    pub task_id: String,
    pub family_id: String,
    /// Frequency the streak was last computed with.
    pub frequency: TaskFrequency,
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(default)]
    pub last_completion_date: Option<NaiveDate>,
    /// Would a completion today still continue the run?
    pub is_active: bool,
    /// First day of the current or most recent unbroken run.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

impl Streak {
    /// Stable id for (family, user, task), so recomputation is repeatable.
    pub fn id_for(family_id: &str, user_id: &str, task_id: &str) -> String {
        Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!("streak/{family_id}/{user_id}/{task_id}").as_bytes(),
        )
        .to_string()
    }

    /// Streak with no approved completions behind it.
    pub fn empty(user_id: &str, task_id: &str, frequency: TaskFrequency, family_id: &str) -> Self {
        Self {
            id: Self::id_for(family_id, user_id, task_id),
            user_id: user_id.to_string(),
            task_id: task_id.to_string(),
            family_id: family_id.to_string(),
            frequency,
            current_streak: 0,
            longest_streak: 0,
            last_completion_date: None,
            is_active: true,
            start_date: None,
        }
    }

    /// Drop the live run, keeping the historical maximum.
    pub fn deactivate(&mut self) {
        self.current_streak = 0;
        self.is_active = false;
    }
}

/// Capability the approval workflow uses to refresh a streak.
pub trait StreakUpdater: Send + Sync {
    fn update_streak(
        &self,
        user_id: &str,
        task_id: &str,
        frequency: TaskFrequency,
        family_id: &str,
    ) -> Result<Streak>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_table() {
        assert_eq!(TaskFrequency::Daily.max_gap_days(false), Some(2));
        assert_eq!(TaskFrequency::Daily.max_gap_days(true), Some(3));
        assert_eq!(TaskFrequency::Weekly.max_gap_days(false), Some(10));
        assert_eq!(TaskFrequency::Weekly.max_gap_days(true), Some(12));
        assert_eq!(TaskFrequency::Monthly.max_gap_days(false), Some(35));
        assert_eq!(TaskFrequency::Monthly.max_gap_days(true), Some(38));
        assert_eq!(TaskFrequency::Once.max_gap_days(true), None);
    }

    #[test]
    fn streak_id_is_stable() {
        assert_eq!(
            Streak::id_for("fam", "kid", "dishes"),
            Streak::id_for("fam", "kid", "dishes")
        );
        assert_ne!(
            Streak::id_for("fam", "kid", "dishes"),
            Streak::id_for("fam", "kid", "trash")
        );
    }

    #[test]
    fn deactivate_keeps_longest() {
        let mut streak = Streak::empty("kid", "dishes", TaskFrequency::Daily, "fam");
        streak.current_streak = 4;
        streak.longest_streak = 6;
        streak.deactivate();
        assert_eq!(streak.current_streak, 0);
        assert_eq!(streak.longest_streak, 6);
        assert!(!streak.is_active);
    }

    #[test]
    fn stored_streak_requires_frequency() {
        let mut value = serde_json::to_value(Streak::empty("kid", "trash", TaskFrequency::Weekly, "fam")).unwrap();
        let restored: Streak = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(restored.frequency, TaskFrequency::Weekly);

        value.as_object_mut().unwrap().remove("frequency");
        assert!(serde_json::from_value::<Streak>(value).is_err());
    }

    #[test]
    fn parse_frequency() {
        assert_eq!("Weekly".parse::<TaskFrequency>().unwrap(), TaskFrequency::Weekly);
        assert!("hourly".parse::<TaskFrequency>().is_err());
    }
}
