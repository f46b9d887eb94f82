//! # History File
//!
//! REPL history lives in `~/.coldb_history`. `COLDB_HISTORY` overrides the
//! location; setting it to an empty string disables history.
//!
//! The path is resolved once at startup and handed to rustyline, which does
//! the file I/O.

use std::env;
use std::path::PathBuf;

const DEFAULT_HISTORY_FILE: &str = ".coldb_history";
pub const HISTORY_ENV_VAR: &str = "COLDB_HISTORY";

pub fn history_path() -> Option<PathBuf> {
    resolve(env::var(HISTORY_ENV_VAR).ok(), env::var("HOME").ok())
}

fn resolve(custom: Option<String>, home: Option<String>) -> Option<PathBuf> {
    match custom {
        Some(path) if path.is_empty() => None,
        Some(path) => Some(PathBuf::from(path)),
        None => home.map(|h| PathBuf::from(h).join(DEFAULT_HISTORY_FILE)),
    }
}
