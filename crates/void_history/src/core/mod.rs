//! Core history types and the editor front-end.

mod config;
mod editor;
mod history;

pub use config::HistoryConfig;
pub use editor::Editor;
pub use history::{
    EntrySummary,
    History,
    HistoryEntry,
    HistoryEvent,
    MergeHint,
    SubscriberId,
    Transaction,
};
