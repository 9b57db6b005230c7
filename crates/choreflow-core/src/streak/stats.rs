//! Read-only streak aggregations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Streak;

/// Per-task rollup of streaks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStreakBreakdown {
    pub task_id: String,
    pub streak_count: u32,
    pub active_count: u32,
    pub max_current: u32,
    pub max_longest: u32,
}

/// Aggregate over a set of streaks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreakStats {
    pub total_streaks: u32,
    pub active_streaks: u32,
    pub max_current_streak: u32,
    pub max_longest_streak: u32,
    /// Mean `current_streak` over active streaks, 0 when none are active.
    pub average_active_streak: f64,
    /// Ordered by task id.
    pub by_task: Vec<TaskStreakBreakdown>,
}

impl StreakStats {
    pub fn from_streaks(streaks: &[Streak]) -> Self {
        let mut by_task: BTreeMap<&str, TaskStreakBreakdown> = BTreeMap::new();
        let mut stats = StreakStats::default();
        let mut active_total = 0u64;

        for streak in streaks {
            stats.total_streaks += 1;
            stats.max_current_streak = stats.max_current_streak.max(streak.current_streak);
            stats.max_longest_streak = stats.max_longest_streak.max(streak.longest_streak);
            if streak.is_active {
                stats.active_streaks += 1;
                active_total += u64::from(streak.current_streak);
            }

            let entry = by_task
                .entry(streak.task_id.as_str())
                .or_insert_with(|| TaskStreakBreakdown {
                    task_id: streak.task_id.clone(),
                    ..Default::default()
                });
            entry.streak_count += 1;
            if streak.is_active {
                entry.active_count += 1;
            }
            entry.max_current = entry.max_current.max(streak.current_streak);
            entry.max_longest = entry.max_longest.max(streak.longest_streak);
        }

        if stats.active_streaks > 0 {
            stats.average_active_streak = active_total as f64 / f64::from(stats.active_streaks);
        }
        stats.by_task = by_task.into_values().collect();
        stats
    }
}

/// One user's streaks across tasks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStreakSummary {
    pub user_id: String,
    pub total_streaks: u32,
    pub active_streaks: u32,
    pub best_current_streak: u32,
    pub best_longest_streak: u32,
    /// Task holding the best current streak, if any streak is running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_current_task: Option<String>,
    /// Longest current streak first.
    pub streaks: Vec<Streak>,
}

impl UserStreakSummary {
    pub fn from_streaks(user_id: &str, streaks: &[Streak]) -> Self {
        let mut mine: Vec<Streak> = streaks
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| {
            b.current_streak
                .cmp(&a.current_streak)
                .then_with(|| b.longest_streak.cmp(&a.longest_streak))
                .then_with(|| a.task_id.cmp(&b.task_id))
        });

        let best_current_task = mine
            .first()
            .filter(|s| s.current_streak > 0)
            .map(|s| s.task_id.clone());

        Self {
            user_id: user_id.to_string(),
            total_streaks: mine.len() as u32,
            active_streaks: mine.iter().filter(|s| s.is_active).count() as u32,
            best_current_streak: mine.iter().map(|s| s.current_streak).max().unwrap_or(0),
            best_longest_streak: mine.iter().map(|s| s.longest_streak).max().unwrap_or(0),
            best_current_task,
            streaks: mine,
        }
    }
}
