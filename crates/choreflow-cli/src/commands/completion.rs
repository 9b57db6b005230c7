use chrono::{DateTime, Utc};
use choreflow_core::{NewCompletion, TaskFrequency, WorkflowAction};
use clap::Subcommand;

use super::{open_flow, print_json, CliResult};

#[derive(Subcommand)]
pub enum CompletionAction {
    /// Submit a completion for review
    Create {
        #[arg(long)]
        task: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        family: String,
        /// Points awarded on approval
        #[arg(long, default_value_t = 0)]
        points: u32,
        /// Allowance amount awarded on approval
        #[arg(long)]
        allowance: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
        /// Completion time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Approve a pending completion
    Approve {
        id: String,
        /// Approving user
        #[arg(long = "by")]
        approver: String,
        #[arg(long)]
        notes: Option<String>,
        /// Task frequency used for the streak refresh
        #[arg(long, default_value = "daily")]
        frequency: TaskFrequency,
    },
    /// Reject a pending completion
    Reject {
        id: String,
        /// Rejecting user
        #[arg(long = "by")]
        rejecter: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Check whether an action would be allowed
    Validate {
        id: String,
        /// approve or reject
        #[arg(long)]
        action: WorkflowAction,
        #[arg(long)]
        user: String,
    },
    /// Show one completion
    Get { id: String },
    /// Pending completions in a family
    Pending {
        #[arg(long)]
        family: String,
    },
    /// Completions submitted by a user
    List {
        #[arg(long)]
        user: String,
        #[arg(long)]
        task: Option<String>,
    },
}

pub fn run(action: CompletionAction) -> CliResult {
    let flow = open_flow()?;

    match action {
        CompletionAction::Create {
            task,
            user,
            family,
            points,
            allowance,
            notes,
            at,
        } => {
            let mut new = NewCompletion::new(task, user, family, at.unwrap_or_else(Utc::now))
                .with_points(points);
            new.allowance_awarded = allowance;
            new.notes = notes;
            print_json(&flow.create_completion(new)?)
        }
        CompletionAction::Approve {
            id,
            approver,
            notes,
            frequency,
        } => print_json(&flow.approve_completion(&id, &approver, notes, frequency)?),
        CompletionAction::Reject {
            id,
            rejecter,
            reason,
        } => print_json(&flow.reject_completion(&id, &rejecter, reason)?),
        CompletionAction::Validate { id, action, user } => {
            print_json(&flow.validate_workflow(&id, action, &user)?)
        }
        CompletionAction::Get { id } => print_json(&flow.get_completion(&id)?),
        CompletionAction::Pending { family } => print_json(&flow.pending_completions(&family)?),
        CompletionAction::List { user, task } => {
            print_json(&flow.completions_for_user(&user, task.as_deref())?)
        }
    }
}
