use chrono::NaiveDate;
use choreflow_core::NewHolidayException;
use clap::Subcommand;
use serde_json::json;

use super::{open_flow, print_json, CliResult};

#[derive(Subcommand)]
pub enum HolidayAction {
    /// Add a holiday exception
    Add {
        #[arg(long)]
        family: String,
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        name: String,
        /// Limit to these tasks (repeatable); applies to all tasks when
        /// neither --task nor --user is given
        #[arg(long = "task")]
        tasks: Vec<String>,
        /// Limit to one user
        #[arg(long)]
        user: Option<String>,
    },
    /// List a family's holiday exceptions
    List {
        #[arg(long)]
        family: String,
    },
    /// Remove a holiday exception
    Remove { id: String },
}

pub fn run(action: HolidayAction) -> CliResult {
    let flow = open_flow()?;

    match action {
        HolidayAction::Add {
            family,
            date,
            name,
            tasks,
            user,
        } => {
            let new = NewHolidayException {
                affects_all_tasks: tasks.is_empty() && user.is_none(),
                task_ids: tasks,
                user_id: user,
                ..NewHolidayException::all_tasks(family, date, name)
            };
            print_json(&flow.add_holiday_exception(new)?)
        }
        HolidayAction::List { family } => print_json(&flow.get_holiday_exceptions(&family)?),
        HolidayAction::Remove { id } => {
            let removed = flow.remove_holiday_exception(&id)?;
            print_json(&json!({ "id": id, "removed": removed }))
        }
    }
}
