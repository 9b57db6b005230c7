use choreflow_core::{TaskFrequency, TaskRef};
use clap::Subcommand;
use serde::Serialize;

use super::{open_flow, print_json, CliResult};

#[derive(Subcommand)]
pub enum StreakAction {
    /// Compute a streak without saving it
    Calc {
        #[arg(long)]
        user: String,
        #[arg(long)]
        task: String,
        #[arg(long)]
        family: String,
        #[arg(long, default_value = "daily")]
        frequency: TaskFrequency,
    },
    /// Recompute and save streaks
    Update {
        #[arg(long)]
        user: String,
        /// Task as ID or ID:FREQUENCY, repeatable
        #[arg(long = "task", required = true)]
        tasks: Vec<String>,
        #[arg(long)]
        family: String,
        /// Frequency for tasks given without one
        #[arg(long, default_value = "daily")]
        frequency: TaskFrequency,
    },
    /// Deactivate lapsed streaks in a family
    Check {
        #[arg(long)]
        family: String,
    },
    /// Streaks in a family
    List {
        #[arg(long)]
        family: String,
    },
    /// Aggregate streak statistics
    Stats {
        #[arg(long)]
        family: Option<String>,
    },
    /// One user's streaks across tasks
    Summary {
        #[arg(long)]
        user: String,
    },
    /// Reset a streak to zero
    Reset {
        #[arg(long)]
        user: String,
        #[arg(long)]
        task: String,
    },
    /// Record a milestone reached
    Milestone {
        #[arg(long)]
        user: String,
        #[arg(long)]
        task: String,
        #[arg(long)]
        family: String,
        #[arg(long)]
        value: u32,
    },
}

#[derive(Serialize)]
struct UpdateResult {
    task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    streak: Option<choreflow_core::Streak>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_task(arg: &str, family: &str, default: TaskFrequency) -> Result<TaskRef, choreflow_core::ChoreError> {
    match arg.split_once(':') {
        Some((task, frequency)) => Ok(TaskRef::new(task, frequency.parse()?, family)),
        None => Ok(TaskRef::new(arg, default, family)),
    }
}

pub fn run(action: StreakAction) -> CliResult {
    let flow = open_flow()?;

    match action {
        StreakAction::Calc {
            user,
            task,
            family,
            frequency,
        } => print_json(&flow.calculate_streak(&user, &task, frequency, &family)?),
        StreakAction::Update {
            user,
            tasks,
            family,
            frequency,
        } => {
            let refs = tasks
                .iter()
                .map(|t| parse_task(t, &family, frequency))
                .collect::<Result<Vec<_>, _>>()?;
            let results: Vec<UpdateResult> = refs
                .iter()
                .zip(flow.update_all_streaks_for_user(&user, &refs))
                .map(|(task, result)| match result {
                    Ok(streak) => UpdateResult {
                        task_id: task.task_id.clone(),
                        streak: Some(streak),
                        error: None,
                    },
                    Err(e) => UpdateResult {
                        task_id: task.task_id.clone(),
                        streak: None,
                        error: Some(e.to_string()),
                    },
                })
                .collect();
            print_json(&results)
        }
        StreakAction::Check { family } => print_json(&flow.perform_daily_streak_check(&family)?),
        StreakAction::List { family } => print_json(&flow.streaks_for_family(&family)?),
        StreakAction::Stats { family } => print_json(&flow.get_streak_stats(family.as_deref())?),
        StreakAction::Summary { user } => print_json(&flow.get_user_streak_summary(&user)?),
        StreakAction::Reset { user, task } => print_json(&flow.reset_streak(&user, &task)?),
        StreakAction::Milestone {
            user,
            task,
            family,
            value,
        } => print_json(&flow.record_milestone(&user, &task, &family, value)?),
    }
}
