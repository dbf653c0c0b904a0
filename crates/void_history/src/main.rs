//! Project history inspector
//!
//! Loads a project file the way the editor does (scene first, then the
//! history against the finished graph) and prints the history panel.
//!
//! Run with: cargo run -p void_history -- <project.json>

use std::path::PathBuf;
use std::process::ExitCode;

use void_history::{Editor, HistoryConfig};

fn load_config() -> HistoryConfig {
    let Some(path) = HistoryConfig::default_path().filter(|p| p.exists()) else {
        return HistoryConfig::default();
    };
    match HistoryConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring {:?}: {}", path, e);
            HistoryConfig::default()
        }
    }
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: void_history <project.json>");
        return ExitCode::from(2);
    };

    let mut editor = Editor::new(load_config());
    let report = match editor.load_project(&path) {
        Ok(report) => report,
        Err(e) => {
            log::error!("Failed to load {:?}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    println!("{}: {} objects", path.display(), editor.scene().len());
    println!("History ({} entries):", editor.history().undo_count());
    for entry in editor.undo_entries() {
        println!("  #{:<4} {}", entry.id, entry.display_name);
    }
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }

    ExitCode::SUCCESS
}
