use chrono::NaiveDate;
use choreflow_core::DateRange;
use clap::Subcommand;

use super::{open_flow, print_json, CliResult};

#[derive(Subcommand)]
pub enum AllowanceAction {
    /// Points and allowance per user
    Summary {
        #[arg(long)]
        family: String,
        #[arg(long)]
        user: Option<String>,
        /// First day to include (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
}

pub fn run(action: AllowanceAction) -> CliResult {
    let flow = open_flow()?;

    match action {
        AllowanceAction::Summary {
            family,
            user,
            from,
            to,
        } => {
            let range = match (from, to) {
                (Some(start), Some(end)) => Some(DateRange::new(start, end)?),
                _ => None,
            };
            print_json(&flow.allowance_summary(&family, user.as_deref(), range)?)
        }
    }
}
