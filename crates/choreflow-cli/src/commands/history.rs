use choreflow_core::HistoryFilter;
use clap::Subcommand;

use super::{open_flow, print_json, CliResult};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Recent streak changes, newest first
    List {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        family: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Family streak metadata
    Metadata {
        #[arg(long)]
        family: String,
        /// Recompute counters from the history first
        #[arg(long)]
        rebuild: bool,
    },
}

pub fn run(action: HistoryAction) -> CliResult {
    let flow = open_flow()?;

    match action {
        HistoryAction::List {
            user,
            task,
            family,
            limit,
        } => {
            let filter = HistoryFilter {
                user_id: user,
                task_id: task,
                family_id: family,
                limit: Some(limit),
            };
            print_json(&flow.streak_history(&filter)?)
        }
        HistoryAction::Metadata { family, rebuild } => {
            if rebuild {
                print_json(&flow.rebuild_streak_metadata(&family)?)
            } else {
                print_json(&flow.streak_metadata(&family)?)
            }
        }
    }
}
