//! Streak recomputation and the daily continuity check.
//!
//! Streaks are always recomputed from the full ordered history of approved
//! completions; nothing is incremented in place. The recomputation for a
//! (user, task) pair runs inside the streak collection's atomic update, so
//! the last writer always reflects the latest committed history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::gap::{self, gap_days};
use super::repository::StreakWrite;
use super::stats::{StreakStats, UserStreakSummary};
use super::{Streak, StreakRepository, StreakUpdater, TaskFrequency, TaskRef};
use crate::clock::Clock;
use crate::completion::CompletionRepository;
use crate::error::Result;
use crate::history::StreakHistoryLedger;
use crate::holiday::HolidayExceptionRegistry;

/// Result of [`StreakEngine::perform_daily_streak_check`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyCheckReport {
    pub family_id: String,
    /// Active streaks evaluated against the grace period.
    pub updated: u32,
    /// Streaks reset to zero because the grace period elapsed.
    pub deactivated: u32,
    /// One message per streak that could not be processed.
    pub errors: Vec<String>,
}

enum CheckOutcome {
    Skipped,
    StillActive,
    Deactivated,
}

pub struct StreakEngine {
    completions: CompletionRepository,
    streaks: StreakRepository,
    holidays: HolidayExceptionRegistry,
    ledger: StreakHistoryLedger,
    clock: Arc<dyn Clock>,
    daily_check_grace_days: Option<u32>,
}

impl StreakEngine {
    pub fn new(
        completions: CompletionRepository,
        streaks: StreakRepository,
        holidays: HolidayExceptionRegistry,
        ledger: StreakHistoryLedger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            completions,
            streaks,
            holidays,
            ledger,
            clock,
            daily_check_grace_days: None,
        }
    }

    /// Use a fixed grace period in the daily check for every frequency.
    pub fn with_daily_check_grace_days(mut self, days: Option<u32>) -> Self {
        self.daily_check_grace_days = days;
        self
    }

    pub fn repository(&self) -> &StreakRepository {
        &self.streaks
    }

    fn holiday_between(
        &self,
        prev: NaiveDate,
        next: NaiveDate,
        family_id: &str,
        task_id: &str,
        user_id: &str,
    ) -> bool {
        match gap::interior(prev, next) {
            Some((start, end)) => {
                self.holidays
                    .exception_falls_in(start, end, family_id, Some(task_id), Some(user_id))
            }
            None => false,
        }
    }

    /// Apply the gap rule, consulting holidays only when they could matter.
    fn consecutive(
        &self,
        prev: NaiveDate,
        next: NaiveDate,
        frequency: TaskFrequency,
        family_id: &str,
        task_id: &str,
        user_id: &str,
    ) -> bool {
        let holiday = gap::needs_holiday_check(prev, next, frequency)
            && self.holiday_between(prev, next, family_id, task_id, user_id);
        let consecutive = gap::is_consecutive(prev, next, frequency, holiday);
        debug!(
            %prev,
            %next,
            gap = gap_days(prev, next),
            %frequency,
            holiday,
            consecutive,
            "gap evaluated"
        );
        consecutive
    }

    /// Compute the streak for (user, task) from approved history.
    ///
    /// Pure with respect to the store: repeated calls with the same history
    /// and the same clock produce the same streak.
    pub fn calculate_streak(
        &self,
        user_id: &str,
        task_id: &str,
        frequency: TaskFrequency,
        family_id: &str,
    ) -> Result<Streak> {
        let mut days: Vec<NaiveDate> = self
            .completions
            .approved_for(family_id, user_id, task_id)?
            .iter()
            .map(|c| c.completed_at.date_naive())
            .collect();
        days.sort();

        let mut streak = Streak::empty(user_id, task_id, frequency, family_id);
        let Some((&first, rest)) = days.split_first() else {
            return Ok(streak);
        };

        let mut longest = 0u32;
        let mut temp = 1u32;
        let mut run_start = first;
        let mut prev = first;
        for &day in rest {
            if self.consecutive(prev, day, frequency, family_id, task_id, user_id) {
                temp += 1;
            } else {
                longest = longest.max(temp);
                temp = 1;
                run_start = day;
            }
            prev = day;
        }

        let today = self.clock.today();
        let active = self.consecutive(prev, today, frequency, family_id, task_id, user_id);

        streak.current_streak = if active { temp } else { 0 };
        streak.longest_streak = longest.max(temp);
        streak.is_active = active;
        streak.last_completion_date = Some(prev);
        streak.start_date = Some(run_start);
        Ok(streak)
    }

    /// Recompute and persist the streak for (user, task).
    ///
    /// An existing streak keeps its id and start date; counters, activity
    /// and the last completion date are replaced. A pair with no approved
    /// completion gets no stored streak; the empty calculation is returned.
    pub fn update_streak(
        &self,
        user_id: &str,
        task_id: &str,
        frequency: TaskFrequency,
        family_id: &str,
    ) -> Result<Streak> {
        let write = self.streaks.upsert(user_id, task_id, |existing| {
            let calculated = self.calculate_streak(user_id, task_id, frequency, family_id)?;
            Ok(match existing {
                Some(prev) => Some(Streak {
                    id: prev.id.clone(),
                    start_date: prev.start_date.or(calculated.start_date),
                    ..calculated
                }),
                None if calculated.last_completion_date.is_none() => None,
                None => Some(calculated),
            })
        })?;

        let Some(write) = write else {
            debug!(user_id = %user_id, task_id = %task_id, "no approved history, streak not stored");
            return Ok(Streak::empty(user_id, task_id, frequency, family_id));
        };

        info!(
            user_id = %user_id,
            task_id = %task_id,
            current = write.current.current_streak,
            longest = write.current.longest_streak,
            active = write.current.is_active,
            "streak updated"
        );
        self.record_write(&write);
        Ok(write.current)
    }

    /// Ledger and metadata bookkeeping for a completed streak write.
    ///
    /// Failures are logged; the streak itself is already persisted.
    fn record_write(&self, write: &StreakWrite) {
        if let Err(e) = self.ledger.record_change(write.previous.as_ref(), &write.current) {
            warn!(streak_id = %write.current.id, error = %e, "failed to record streak history");
        }
        if let Err(e) = self
            .ledger
            .note_streak_written(&write.current.family_id, write.created())
        {
            warn!(family_id = %write.current.family_id, error = %e, "failed to refresh streak metadata");
        }
    }

    /// Best-effort batch: one result per task, in input order.
    pub fn update_all_streaks_for_user(&self, user_id: &str, tasks: &[TaskRef]) -> Vec<Result<Streak>> {
        tasks
            .iter()
            .map(|task| {
                let result = self.update_streak(user_id, &task.task_id, task.frequency, &task.family_id);
                if let Err(e) = &result {
                    warn!(user_id = %user_id, task_id = %task.task_id, error = %e, "streak update failed");
                }
                result
            })
            .collect()
    }

    /// Grace period in days for the daily check.
    ///
    /// Defaults to the holiday-widened gap for the frequency so the check
    /// never breaks a streak the full recomputation would keep alive.
    fn grace_days(&self, frequency: TaskFrequency) -> i64 {
        match self.daily_check_grace_days {
            Some(days) => i64::from(days),
            None => frequency.max_gap_days(true).unwrap_or(0),
        }
    }

    fn check_streak(&self, streak: &Streak, today: NaiveDate) -> Result<CheckOutcome> {
        let Some(latest) = self
            .completions
            .latest_approved(&streak.family_id, &streak.user_id, &streak.task_id)?
        else {
            return Ok(CheckOutcome::Skipped);
        };

        let days_since = gap_days(latest.completed_at.date_naive(), today);
        if days_since <= self.grace_days(streak.frequency) {
            return Ok(CheckOutcome::StillActive);
        }

        let write = self.streaks.modify(&streak.user_id, &streak.task_id, |s| {
            s.deactivate();
            Ok(())
        })?;
        info!(
            user_id = %streak.user_id,
            task_id = %streak.task_id,
            days_since,
            longest = write.current.longest_streak,
            "streak deactivated by daily check"
        );
        self.record_write(&write);
        Ok(CheckOutcome::Deactivated)
    }

    /// Deactivate lapsed streaks in a family.
    ///
    /// Meant to be invoked once a day by the host environment. A failure on
    /// one streak is reported and the rest are still processed.
    pub fn perform_daily_streak_check(&self, family_id: &str) -> Result<DailyCheckReport> {
        let today = self.clock.today();
        let mut report = DailyCheckReport {
            family_id: family_id.to_string(),
            ..DailyCheckReport::default()
        };

        let active: Vec<Streak> = self
            .streaks
            .for_family(family_id)?
            .into_iter()
            .filter(|s| s.is_active)
            .collect();

        for streak in &active {
            match self.check_streak(streak, today) {
                Ok(CheckOutcome::Skipped) => {}
                Ok(CheckOutcome::StillActive) => report.updated += 1,
                Ok(CheckOutcome::Deactivated) => {
                    report.updated += 1;
                    report.deactivated += 1;
                }
                Err(e) => {
                    warn!(streak_id = %streak.id, error = %e, "daily check failed for streak");
                    report
                        .errors
                        .push(format!("{}/{}: {}", streak.user_id, streak.task_id, e));
                }
            }
        }

        if let Err(e) = self.ledger.note_daily_check(family_id) {
            warn!(family_id = %family_id, error = %e, "failed to stamp daily check");
        }
        info!(
            family_id = %family_id,
            checked = active.len(),
            deactivated = report.deactivated,
            errors = report.errors.len(),
            "daily streak check finished"
        );
        Ok(report)
    }

    /// Administrative reset to (0, inactive); longest is kept.
    pub fn reset_streak(&self, user_id: &str, task_id: &str) -> Result<Streak> {
        let write = self.streaks.modify(user_id, task_id, |s| {
            s.deactivate();
            Ok(())
        })?;
        info!(user_id = %user_id, task_id = %task_id, "streak reset");
        self.record_write(&write);
        Ok(write.current)
    }

    pub fn get_streak(&self, user_id: &str, task_id: &str) -> Result<Option<Streak>> {
        self.streaks.get(user_id, task_id)
    }

    pub fn streaks_for_family(&self, family_id: &str) -> Result<Vec<Streak>> {
        self.streaks.for_family(family_id)
    }

    /// Aggregate over persisted streaks, optionally limited to one family.
    pub fn get_streak_stats(&self, family_id: Option<&str>) -> Result<StreakStats> {
        let streaks = match family_id {
            Some(family_id) => self.streaks.for_family(family_id)?,
            None => self.streaks.all()?,
        };
        Ok(StreakStats::from_streaks(&streaks))
    }

    pub fn get_user_streak_summary(&self, user_id: &str) -> Result<UserStreakSummary> {
        Ok(UserStreakSummary::from_streaks(
            user_id,
            &self.streaks.for_user(user_id)?,
        ))
    }
}

impl StreakUpdater for StreakEngine {
    fn update_streak(
        &self,
        user_id: &str,
        task_id: &str,
        frequency: TaskFrequency,
        family_id: &str,
    ) -> Result<Streak> {
        StreakEngine::update_streak(self, user_id, task_id, frequency, family_id)
    }
}
