//! Points and allowance totals over reviewed completions.
//!
//! Amounts are summed exactly as they were fixed at submission; nothing is
//! recomputed here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::completion::{CompletionRepository, CompletionStatus, TaskCompletion};
use crate::error::{ChoreError, Result};

/// Inclusive calendar range over `completed_at` (UTC day).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(ChoreError::invalid_input(
                "range",
                format!("end {end} is before start {start}"),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }
}

/// One user's totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AllowanceTotals {
    pub user_id: String,
    pub approved_count: u32,
    pub pending_count: u32,
    pub rejected_count: u32,
    pub points: u64,
    pub allowance: f64,
}

impl AllowanceTotals {
    fn add(&mut self, completion: &TaskCompletion) {
        match completion.status {
            CompletionStatus::Approved => {
                self.approved_count += 1;
                self.points += u64::from(completion.points_awarded);
                self.allowance += completion.allowance_awarded.unwrap_or(0.0);
            }
            CompletionStatus::Pending => self.pending_count += 1,
            CompletionStatus::Rejected => self.rejected_count += 1,
        }
    }
}

/// Family totals, one row per user ordered by user id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AllowanceSummary {
    pub family_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<DateRange>,
    pub users: Vec<AllowanceTotals>,
    pub total_points: u64,
    pub total_allowance: f64,
}

impl AllowanceSummary {
    pub fn from_completions(
        family_id: &str,
        completions: &[TaskCompletion],
        user_id: Option<&str>,
        range: Option<DateRange>,
    ) -> Self {
        let mut users: BTreeMap<&str, AllowanceTotals> = BTreeMap::new();
        for c in completions {
            if c.family_id != family_id || user_id.is_some_and(|u| u != c.user_id) {
                continue;
            }
            if range.is_some_and(|r| !r.contains(c.completed_at.date_naive())) {
                continue;
            }
            users
                .entry(c.user_id.as_str())
                .or_insert_with(|| AllowanceTotals {
                    user_id: c.user_id.clone(),
                    ..Default::default()
                })
                .add(c);
        }

        let users: Vec<_> = users.into_values().collect();
        Self {
            family_id: family_id.to_string(),
            range,
            total_points: users.iter().map(|u| u.points).sum(),
            total_allowance: users.iter().map(|u| u.allowance).sum(),
            users,
        }
    }

    pub fn for_user(&self, user_id: &str) -> Option<&AllowanceTotals> {
        self.users.iter().find(|u| u.user_id == user_id)
    }
}

/// Summarize a family's completions from the repository.
pub fn allowance_summary(
    completions: &CompletionRepository,
    family_id: &str,
    user_id: Option<&str>,
    range: Option<DateRange>,
) -> Result<AllowanceSummary> {
    Ok(AllowanceSummary::from_completions(
        family_id,
        &completions.for_family(family_id)?,
        user_id,
        range,
    ))
}
