//! # Choreflow Core Library
//!
//! This library provides the core business logic of a household chore
//! tracker: parents review the task completions their children submit, and
//! approved completions feed per-task streaks. Everything is available via
//! the standalone `choreflow-cli` binary, which is a thin layer over the
//! same library.
//!
//! ## Architecture
//!
//! - **Approval workflow**: `pending -> approved | rejected`, with duplicate
//!   and self-approval guards checked inside one atomic store update
//! - **Streak engine**: recomputes streaks from approved history using a
//!   frequency-aware gap rule, widened by holiday exceptions
//! - **History ledger**: bounded record of streak gains, losses and
//!   milestones, plus advisory per-family metadata
//! - **Storage**: JSON documents in a key-value store (SQLite or memory)
//!   and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Choreflow`]: Facade over every operation
//! - [`CompletionApprovalWorkflow`]: Completion review state machine
//! - [`StreakEngine`]: Streak calculation and the daily continuity check
//! - [`HolidayExceptionRegistry`]: Family calendar exceptions
//! - [`StreakHistoryLedger`]: Streak change log
//! - [`KvStore`]: Trait for the backing store

pub mod allowance;
pub mod clock;
pub mod completion;
pub mod error;
pub mod history;
pub mod holiday;
pub mod service;
pub mod storage;
pub mod streak;

pub use allowance::{AllowanceSummary, AllowanceTotals, DateRange};
pub use clock::{Clock, FixedClock, SystemClock};
pub use completion::{
    ApprovalOutcome, CompletionApprovalWorkflow, CompletionRepository, CompletionStatus,
    NewCompletion, TaskCompletion, WorkflowAction, WorkflowValidation,
};
pub use error::{ChoreError, ConfigError, Result, StorageError};
pub use history::{
    HistoryFilter, StreakChangeKind, StreakHistoryEntry, StreakHistoryLedger, StreakMetadata,
};
pub use holiday::{HolidayException, HolidayExceptionRegistry, NewHolidayException};
pub use service::Choreflow;
pub use storage::{Config, KvStore, MemoryStore, SqliteStore};
pub use streak::{
    DailyCheckReport, Streak, StreakEngine, StreakRepository, StreakStats, StreakUpdater,
    TaskFrequency, TaskRef, TaskStreakBreakdown, UserStreakSummary,
};
