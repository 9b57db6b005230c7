pub mod allowance;
pub mod completion;
pub mod config;
pub mod history;
pub mod holiday;
pub mod streak;

use choreflow_core::{Choreflow, Config, SqliteStore, SystemClock};
use serde::Serialize;
use std::sync::Arc;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the default store with the saved configuration.
pub fn open_flow() -> Result<Choreflow, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = SqliteStore::open()?;
    tracing::debug!(path = ?store.path(), "store opened");
    Ok(Choreflow::new(Arc::new(store), Arc::new(SystemClock), &config))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
