//! Task completions and their approval lifecycle.
//!
//! A completion is one attempt by a family member to satisfy one occurrence
//! of a task. It starts out pending and is reviewed exactly once:
//!
//! ```text
//!   PENDING ──approve──> APPROVED  (terminal)
//!      |
//!      +─────reject───> REJECTED  (terminal)
//! ```

pub mod repository;
pub mod workflow;

pub use repository::CompletionRepository;
pub use workflow::{ApprovalOutcome, CompletionApprovalWorkflow};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ChoreError, Result};

/// Review state of a completion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    /// Submitted, awaiting review (initial state)
    Pending,
    /// Accepted by a reviewer (terminal state)
    Approved,
    /// Turned down by a reviewer (terminal state)
    Rejected,
}

impl CompletionStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &CompletionStatus) -> bool {
        match self {
            CompletionStatus::Pending => {
                matches!(to, CompletionStatus::Approved | CompletionStatus::Rejected)
            }
            CompletionStatus::Approved | CompletionStatus::Rejected => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CompletionStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Pending => "pending",
            CompletionStatus::Approved => "approved",
            CompletionStatus::Rejected => "rejected",
        }
    }
}

impl Default for CompletionStatus {
    fn default() -> Self {
        CompletionStatus::Pending
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompletionStatus {
    type Err = ChoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(CompletionStatus::Pending),
            "approved" => Ok(CompletionStatus::Approved),
            "rejected" => Ok(CompletionStatus::Rejected),
            other => Err(ChoreError::invalid_input(
                "status",
                format!("unknown status '{other}'"),
            )),
        }
    }
}

/// Review actions a parent can take on a pending completion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowAction {
    Approve,
    Reject,
}

impl WorkflowAction {
    /// Status the completion lands in after this action.
    pub fn target_status(&self) -> CompletionStatus {
        match self {
            WorkflowAction::Approve => CompletionStatus::Approved,
            WorkflowAction::Reject => CompletionStatus::Rejected,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            WorkflowAction::Approve => "approve",
            WorkflowAction::Reject => "reject",
        }
    }
}

impl FromStr for WorkflowAction {
    type Err = ChoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(WorkflowAction::Approve),
            "reject" => Ok(WorkflowAction::Reject),
            other => Err(ChoreError::invalid_input(
                "action",
                format!("unknown action '{other}'"),
            )),
        }
    }
}

/// One submitted instance of performing a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskCompletion {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub family_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub status: CompletionStatus,
    /// Fixed by the caller at creation time.
    pub points_awarded: u32,
    #[serde(default)]
    pub allowance_awarded: Option<f64>,
    /// Who approved or rejected the completion.
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TaskCompletion {
    pub fn is_pending(&self) -> bool {
        self.status == CompletionStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == CompletionStatus::Approved
    }

    /// Fail with `InvalidState` unless the completion can still be reviewed.
    pub fn ensure_pending(&self, action: WorkflowAction) -> Result<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(ChoreError::InvalidState {
                id: self.id.clone(),
                status: self.status,
                action: action.verb(),
            })
        }
    }

    /// Apply a review action.
    ///
    /// Returns an error if the completion is no longer pending. `notes`
    /// replaces any existing notes only when provided.
    pub fn transition_to(
        &mut self,
        action: WorkflowAction,
        actor_id: &str,
        at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<()> {
        let target = action.target_status();
        if !self.status.can_transition_to(&target) {
            return Err(ChoreError::InvalidState {
                id: self.id.clone(),
                status: self.status,
                action: action.verb(),
            });
        }

        self.status = target;
        self.approved_by = Some(actor_id.to_string());
        self.approved_at = Some(at);
        if notes.is_some() {
            self.notes = notes;
        }
        Ok(())
    }
}

/// Caller-supplied data for a new completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCompletion {
    pub task_id: String,
    pub user_id: String,
    pub family_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub points_awarded: u32,
    #[serde(default)]
    pub allowance_awarded: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewCompletion {
    pub fn new(
        task_id: impl Into<String>,
        user_id: impl Into<String>,
        family_id: impl Into<String>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            user_id: user_id.into(),
            family_id: family_id.into(),
            completed_at,
            points_awarded: 0,
            allowance_awarded: None,
            notes: None,
        }
    }

    pub fn with_points(mut self, points: u32) -> Self {
        self.points_awarded = points;
        self
    }

    pub fn with_allowance(mut self, amount: f64) -> Self {
        self.allowance_awarded = Some(amount);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<()> {
        require_non_empty("task_id", &self.task_id)?;
        require_non_empty("user_id", &self.user_id)?;
        require_non_empty("family_id", &self.family_id)?;
        if let Some(amount) = self.allowance_awarded {
            if !amount.is_finite() || amount < 0.0 {
                return Err(ChoreError::invalid_input(
                    "allowance_awarded",
                    format!("must be a non-negative amount, got {amount}"),
                ));
            }
        }
        Ok(())
    }

    /// Materialize as a pending completion with the given id.
    pub fn into_pending(self, id: String) -> TaskCompletion {
        TaskCompletion {
            id,
            task_id: self.task_id,
            user_id: self.user_id,
            family_id: self.family_id,
            completed_at: self.completed_at,
            status: CompletionStatus::Pending,
            points_awarded: self.points_awarded,
            allowance_awarded: self.allowance_awarded,
            approved_by: None,
            approved_at: None,
            notes: self.notes,
        }
    }
}

/// Outcome of a read-only workflow pre-check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl WorkflowValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(ChoreError::invalid_input(field, "must not be empty"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> TaskCompletion {
        NewCompletion::new("dishes", "kid", "fam", Utc::now())
            .with_points(10)
            .into_pending("c1".to_string())
    }

    #[test]
    fn status_transitions() {
        use CompletionStatus::*;
        assert!(Pending.can_transition_to(&Approved));
        assert!(Pending.can_transition_to(&Rejected));
        assert!(!Pending.can_transition_to(&Pending));
        assert!(!Approved.can_transition_to(&Rejected));
        assert!(!Approved.can_transition_to(&Pending));
        assert!(!Rejected.can_transition_to(&Approved));
        assert!(Approved.is_terminal() && Rejected.is_terminal());
    }

    #[test]
    fn approve_sets_reviewer_fields() {
        let mut c = pending();
        let at = Utc::now();
        c.transition_to(WorkflowAction::Approve, "parent", at, None)
            .unwrap();
        assert_eq!(c.status, CompletionStatus::Approved);
        assert_eq!(c.approved_by.as_deref(), Some("parent"));
        assert_eq!(c.approved_at, Some(at));
        assert_eq!(c.points_awarded, 10);
    }

    #[test]
    fn second_transition_is_invalid_state() {
        let mut c = pending();
        c.transition_to(WorkflowAction::Reject, "parent", Utc::now(), Some("redo".into()))
            .unwrap();
        let before = c.clone();
        let err = c
            .transition_to(WorkflowAction::Approve, "parent", Utc::now(), None)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        assert_eq!(c, before);
    }

    #[test]
    fn validate_rejects_blank_ids_and_negative_allowance() {
        let base = NewCompletion::new("dishes", "kid", "fam", Utc::now());
        assert!(base.validate().is_ok());

        let mut blank = base.clone();
        blank.user_id = "  ".into();
        assert_eq!(blank.validate().unwrap_err().code(), "INVALID_INPUT");

        let negative = base.clone().with_allowance(-1.0);
        assert_eq!(negative.validate().unwrap_err().code(), "INVALID_INPUT");

        let nan = base.with_allowance(f64::NAN);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn parse_status_and_action() {
        assert_eq!("Approved".parse::<CompletionStatus>().unwrap(), CompletionStatus::Approved);
        assert_eq!("reject".parse::<WorkflowAction>().unwrap(), WorkflowAction::Reject);
        assert!("done".parse::<CompletionStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CompletionStatus::Rejected).unwrap(),
            "\"rejected\""
        );
    }
}
