//! Parent review of submitted completions.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    CompletionRepository, NewCompletion, TaskCompletion, WorkflowAction, WorkflowValidation,
};
use crate::clock::Clock;
use crate::error::{ChoreError, Result};
use crate::streak::{Streak, StreakUpdater, TaskFrequency};

/// Result of an approval.
///
/// `streak` is `None` when the streak refresh failed; the approval itself
/// still stands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovalOutcome {
    pub completion: TaskCompletion,
    pub streak: Option<Streak>,
}

/// Drives completions through `pending -> approved | rejected`.
pub struct CompletionApprovalWorkflow {
    completions: CompletionRepository,
    streaks: Arc<dyn StreakUpdater>,
    clock: Arc<dyn Clock>,
    allow_self_approval: bool,
}

impl CompletionApprovalWorkflow {
    pub fn new(
        completions: CompletionRepository,
        streaks: Arc<dyn StreakUpdater>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            completions,
            streaks,
            clock,
            allow_self_approval: false,
        }
    }

    /// Permit submitters to review their own completions.
    pub fn with_self_approval(mut self, allowed: bool) -> Self {
        self.allow_self_approval = allowed;
        self
    }

    /// Submit a completion for review.
    pub fn create(&self, new: NewCompletion) -> Result<TaskCompletion> {
        new.validate()?;
        let completion = self
            .completions
            .insert_pending(new.into_pending(Uuid::new_v4().to_string()))?;
        info!(
            completion_id = %completion.id,
            user_id = %completion.user_id,
            task_id = %completion.task_id,
            "completion submitted"
        );
        Ok(completion)
    }

    /// Check, transition and persist under the collection lock.
    fn review(
        &self,
        completion_id: &str,
        action: WorkflowAction,
        actor_id: &str,
        notes: Option<String>,
    ) -> Result<TaskCompletion> {
        let now = self.clock.now();
        self.completions.modify(completion_id, |completion| {
            completion.ensure_pending(action)?;
            if !self.allow_self_approval && completion.user_id == actor_id {
                return Err(ChoreError::SelfApproval {
                    user_id: actor_id.to_string(),
                });
            }
            completion.transition_to(action, actor_id, now, notes.clone())
        })
    }

    /// Approve a pending completion and refresh the submitter's streak.
    pub fn approve(
        &self,
        completion_id: &str,
        approver_id: &str,
        notes: Option<String>,
        frequency: TaskFrequency,
    ) -> Result<ApprovalOutcome> {
        let completion = self.review(completion_id, WorkflowAction::Approve, approver_id, notes)?;
        info!(
            completion_id = %completion.id,
            approver_id = %approver_id,
            points = completion.points_awarded,
            "completion approved"
        );

        let streak = match self.streaks.update_streak(
            &completion.user_id,
            &completion.task_id,
            frequency,
            &completion.family_id,
        ) {
            Ok(streak) => Some(streak),
            Err(e) => {
                warn!(
                    completion_id = %completion.id,
                    user_id = %completion.user_id,
                    task_id = %completion.task_id,
                    error = %e,
                    "streak update failed after approval"
                );
                None
            }
        };

        Ok(ApprovalOutcome { completion, streak })
    }

    /// Reject a pending completion. Streaks are unaffected.
    pub fn reject(
        &self,
        completion_id: &str,
        rejecter_id: &str,
        reason: Option<String>,
    ) -> Result<TaskCompletion> {
        let completion = self.review(completion_id, WorkflowAction::Reject, rejecter_id, reason)?;
        info!(completion_id = %completion.id, rejecter_id = %rejecter_id, "completion rejected");
        Ok(completion)
    }

    /// Would `action` by `acting_user_id` succeed right now?
    pub fn validate_workflow(
        &self,
        completion_id: &str,
        action: WorkflowAction,
        acting_user_id: &str,
    ) -> Result<WorkflowValidation> {
        let Some(completion) = self.completions.get(completion_id)? else {
            return Ok(WorkflowValidation::invalid("Completion not found"));
        };
        if let Err(e) = completion.ensure_pending(action) {
            return Ok(WorkflowValidation::invalid(e.user_message()));
        }
        if !self.allow_self_approval && completion.user_id == acting_user_id {
            return Ok(WorkflowValidation::invalid(format!(
                "Cannot {} your own completion",
                action.verb()
            )));
        }
        Ok(WorkflowValidation::ok())
    }

    pub fn get(&self, completion_id: &str) -> Result<TaskCompletion> {
        self.completions
            .get(completion_id)?
            .ok_or_else(|| ChoreError::not_found("Completion", completion_id))
    }

    pub fn pending_for_family(&self, family_id: &str) -> Result<Vec<TaskCompletion>> {
        self.completions.pending_for_family(family_id)
    }

    pub fn completions_for_user(
        &self,
        user_id: &str,
        task_id: Option<&str>,
    ) -> Result<Vec<TaskCompletion>> {
        self.completions.for_user(user_id, task_id)
    }
}
