//! Single entry point wiring the workflow, streak engine, holiday registry
//! and history ledger over one store.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::allowance::{self, AllowanceSummary, DateRange};
use crate::clock::Clock;
use crate::completion::{
    ApprovalOutcome, CompletionApprovalWorkflow, CompletionRepository, NewCompletion,
    TaskCompletion, WorkflowAction, WorkflowValidation,
};
use crate::error::Result;
use crate::history::{HistoryFilter, StreakHistoryEntry, StreakHistoryLedger, StreakMetadata};
use crate::holiday::{HolidayException, HolidayExceptionRegistry, NewHolidayException};
use crate::storage::{Config, KvStore};
use crate::streak::{
    DailyCheckReport, Streak, StreakEngine, StreakRepository, StreakStats, TaskFrequency, TaskRef,
    UserStreakSummary,
};

pub struct Choreflow {
    completions: CompletionRepository,
    workflow: CompletionApprovalWorkflow,
    engine: Arc<StreakEngine>,
    holidays: HolidayExceptionRegistry,
    ledger: StreakHistoryLedger,
}

impl Choreflow {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        let completions = CompletionRepository::new(Arc::clone(&store));
        let holidays = HolidayExceptionRegistry::new(Arc::clone(&store), Arc::clone(&clock));
        let ledger = StreakHistoryLedger::with_capacity(
            Arc::clone(&store),
            Arc::clone(&clock),
            config.history.capacity,
        );
        let engine = Arc::new(
            StreakEngine::new(
                completions.clone(),
                StreakRepository::new(Arc::clone(&store)),
                holidays.clone(),
                ledger.clone(),
                Arc::clone(&clock),
            )
            .with_daily_check_grace_days(config.streak.daily_check_grace_days),
        );
        let workflow = CompletionApprovalWorkflow::new(completions.clone(), engine.clone(), clock)
            .with_self_approval(config.workflow.allow_self_approval);

        Self {
            completions,
            workflow,
            engine,
            holidays,
            ledger,
        }
    }

    pub fn workflow(&self) -> &CompletionApprovalWorkflow {
        &self.workflow
    }

    pub fn engine(&self) -> &StreakEngine {
        &self.engine
    }

    pub fn holidays(&self) -> &HolidayExceptionRegistry {
        &self.holidays
    }

    pub fn ledger(&self) -> &StreakHistoryLedger {
        &self.ledger
    }

    // Completions

    pub fn create_completion(&self, new: NewCompletion) -> Result<TaskCompletion> {
        self.workflow.create(new)
    }

    pub fn approve_completion(
        &self,
        completion_id: &str,
        approver_id: &str,
        notes: Option<String>,
        frequency: TaskFrequency,
    ) -> Result<ApprovalOutcome> {
        self.workflow.approve(completion_id, approver_id, notes, frequency)
    }

    pub fn reject_completion(
        &self,
        completion_id: &str,
        rejecter_id: &str,
        reason: Option<String>,
    ) -> Result<TaskCompletion> {
        self.workflow.reject(completion_id, rejecter_id, reason)
    }

    pub fn validate_workflow(
        &self,
        completion_id: &str,
        action: WorkflowAction,
        acting_user_id: &str,
    ) -> Result<WorkflowValidation> {
        self.workflow.validate_workflow(completion_id, action, acting_user_id)
    }

    pub fn get_completion(&self, completion_id: &str) -> Result<TaskCompletion> {
        self.workflow.get(completion_id)
    }

    pub fn pending_completions(&self, family_id: &str) -> Result<Vec<TaskCompletion>> {
        self.workflow.pending_for_family(family_id)
    }

    pub fn completions_for_user(
        &self,
        user_id: &str,
        task_id: Option<&str>,
    ) -> Result<Vec<TaskCompletion>> {
        self.workflow.completions_for_user(user_id, task_id)
    }

    // Streaks

    pub fn calculate_streak(
        &self,
        user_id: &str,
        task_id: &str,
        frequency: TaskFrequency,
        family_id: &str,
    ) -> Result<Streak> {
        self.engine.calculate_streak(user_id, task_id, frequency, family_id)
    }

    pub fn update_streak(
        &self,
        user_id: &str,
        task_id: &str,
        frequency: TaskFrequency,
        family_id: &str,
    ) -> Result<Streak> {
        self.engine.update_streak(user_id, task_id, frequency, family_id)
    }

    pub fn update_all_streaks_for_user(&self, user_id: &str, tasks: &[TaskRef]) -> Vec<Result<Streak>> {
        self.engine.update_all_streaks_for_user(user_id, tasks)
    }

    pub fn perform_daily_streak_check(&self, family_id: &str) -> Result<DailyCheckReport> {
        self.engine.perform_daily_streak_check(family_id)
    }

    pub fn get_streak(&self, user_id: &str, task_id: &str) -> Result<Option<Streak>> {
        self.engine.get_streak(user_id, task_id)
    }

    pub fn streaks_for_family(&self, family_id: &str) -> Result<Vec<Streak>> {
        self.engine.streaks_for_family(family_id)
    }

    pub fn get_streak_stats(&self, family_id: Option<&str>) -> Result<StreakStats> {
        self.engine.get_streak_stats(family_id)
    }

    pub fn get_user_streak_summary(&self, user_id: &str) -> Result<UserStreakSummary> {
        self.engine.get_user_streak_summary(user_id)
    }

    pub fn reset_streak(&self, user_id: &str, task_id: &str) -> Result<Streak> {
        self.engine.reset_streak(user_id, task_id)
    }

    // Holidays

    pub fn add_holiday_exception(&self, new: NewHolidayException) -> Result<HolidayException> {
        self.holidays.add(new)
    }

    pub fn get_holiday_exceptions(&self, family_id: &str) -> Result<Vec<HolidayException>> {
        self.holidays.list(family_id)
    }

    pub fn remove_holiday_exception(&self, id: &str) -> Result<bool> {
        self.holidays.remove(id)
    }

    pub fn exception_falls_in(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        family_id: &str,
        task_id: Option<&str>,
        user_id: Option<&str>,
    ) -> bool {
        self.holidays
            .exception_falls_in(start, end, family_id, task_id, user_id)
    }

    // History

    pub fn record_milestone(
        &self,
        user_id: &str,
        task_id: &str,
        family_id: &str,
        streak_value: u32,
    ) -> Result<StreakHistoryEntry> {
        self.ledger.record_milestone(user_id, task_id, family_id, streak_value)
    }

    pub fn streak_history(&self, filter: &HistoryFilter) -> Result<Vec<StreakHistoryEntry>> {
        self.ledger.entries(filter)
    }

    pub fn streak_metadata(&self, family_id: &str) -> Result<Option<StreakMetadata>> {
        self.ledger.metadata(family_id)
    }

    pub fn rebuild_streak_metadata(&self, family_id: &str) -> Result<StreakMetadata> {
        self.ledger.rebuild_metadata(family_id)
    }

    // Allowance

    pub fn allowance_summary(
        &self,
        family_id: &str,
        user_id: Option<&str>,
        range: Option<DateRange>,
    ) -> Result<AllowanceSummary> {
        allowance::allowance_summary(&self.completions, family_id, user_id, range)
    }
}
