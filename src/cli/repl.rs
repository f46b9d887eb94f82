//! # REPL
//!
//! Interactive loop over a [`Database`]:
//!
//! ```text
//! read line ──► starts with '.'? ──yes──► dot command
//!                    │ no
//!                    ▼
//!              Database::execute ──► print output / error
//!                    │
//!                    ▼
//!              shutdown? ──yes──► exit
//! ```
//!
//! Every line is one statement. Errors are printed and the loop continues;
//! `shutdown`, `.quit` and Ctrl+D end it. Leaving the loop without `shutdown`
//! still persists the database.
//!
//! [`run_script`] feeds a file through the same path without line editing.

use std::fs;
use std::io::Write;
use std::path::Path;

use eyre::{Result, WrapErr};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::cli::commands::{CommandHandler, CommandResult};
use crate::cli::history::history_path;
use crate::query::ExecuteResult;
use crate::Database;

const PROMPT: &str = "coldb> ";

pub struct Repl {
    db: Database,
    editor: DefaultEditor,
}

/// What happened to one line of input.
#[derive(Debug, PartialEq)]
enum Step {
    Continue,
    Exit,
}

impl Repl {
    pub fn new(db: Database) -> Result<Self> {
        let mut editor = DefaultEditor::new().wrap_err("failed to initialize line editor")?;

        if let Some(history_file) = history_path() {
            let _ = editor.load_history(&history_file);
        }

        Ok(Self { db, editor })
    }

    pub fn run(&mut self) -> Result<()> {
        self.print_welcome();

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        self.editor.add_history_entry(trimmed).ok();
                    }
                    let mut stdout = std::io::stdout().lock();
                    if handle_line(&self.db, trimmed, &mut stdout)? == Step::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye");
                    break;
                }
                Err(err) => {
                    eprintln!("Error reading input: {}", err);
                    break;
                }
            }
        }

        self.save_history();
        finish(&self.db);
        Ok(())
    }

    fn print_welcome(&self) {
        println!("coldb version {}", env!("CARGO_PKG_VERSION"));
        println!("Enter \".help\" for usage hints.");
        println!("Storage root: {}", self.db.path().display());
        match self.db.database_name() {
            Some(name) => println!("Active database: {}", name),
            None => println!("No active database; create one with create(db,\"NAME\")."),
        }
        if let Some(report) = self.db.load_report() {
            for warning in &report.warnings {
                println!("Warning: {}", warning);
            }
        }
        println!();
    }

    fn save_history(&mut self) {
        if let Some(history_file) = history_path() {
            if let Err(e) = self.editor.save_history(&history_file) {
                eprintln!("Warning: could not save history: {}", e);
            }
        }
    }
}

/// Runs every line of `path` in order, writing `print` output to `out`.
///
/// Failing statements are reported on stderr and do not stop the script.
/// Returns the number of failed statements.
pub fn run_script(db: &Database, path: &Path, out: &mut impl Write) -> Result<usize> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read script '{}'", path.display()))?;

    let mut failures = 0;
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if CommandHandler::is_command(line) {
            match CommandHandler::execute(line, db) {
                CommandResult::Exit => break,
                CommandResult::Output(text) => {
                    writeln!(out, "{}", text).wrap_err("failed to write output")?;
                }
                CommandResult::Continue => {}
                CommandResult::Error(msg) => {
                    failures += 1;
                    eprintln!("{}:{}: Error: {}", path.display(), n + 1, msg);
                }
            }
            continue;
        }
        match db.execute(line) {
            Ok(ExecuteResult::Shutdown(_)) => return Ok(failures),
            Ok(result) => {
                if let Some(text) = result.output() {
                    writeln!(out, "{}", text).wrap_err("failed to write output")?;
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}:{}: Error: {}", path.display(), n + 1, e);
            }
        }
    }

    finish(db);
    Ok(failures)
}

fn handle_line(db: &Database, line: &str, out: &mut impl Write) -> Result<Step> {
    if line.is_empty() {
        return Ok(Step::Continue);
    }

    if CommandHandler::is_command(line) {
        return Ok(match CommandHandler::execute(line, db) {
            CommandResult::Exit => Step::Exit,
            CommandResult::Output(text) => {
                writeln!(out, "{}", text).wrap_err("failed to write output")?;
                Step::Continue
            }
            CommandResult::Continue => Step::Continue,
            CommandResult::Error(msg) => {
                eprintln!("Error: {}", msg);
                Step::Continue
            }
        });
    }

    match db.execute(line) {
        Ok(ExecuteResult::Shutdown(report)) => {
            for failure in &report.failures {
                eprintln!("Warning: {}", failure);
            }
            Ok(Step::Exit)
        }
        Ok(result) => {
            if let Some(text) = result.output() {
                writeln!(out, "{}", text).wrap_err("failed to write output")?;
            }
            Ok(Step::Continue)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(Step::Continue)
        }
    }
}

/// Persists and closes `db` unless a `shutdown` already did.
fn finish(db: &Database) {
    if db.is_closed() {
        return;
    }
    match db.close() {
        Ok(report) => {
            for failure in &report.failures {
                eprintln!("Warning: {}", failure);
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lines_print_and_shutdown_exits() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("disk")).unwrap();
        let mut out = Vec::new();

        for line in [
            "create(db,\"db1\")",
            "create(tbl,\"t\",db1,1)",
            "create(col,\"c\",db1.t)",
            "relational_insert(db1.t,4)",
            "s=select(db1.t.c,null,null)",
            "f=fetch(db1.t.c,s)",
            "not_a_command(1)",
            "print(f)",
        ] {
            assert_eq!(handle_line(&db, line, &mut out).unwrap(), Step::Continue);
        }
        assert_eq!(handle_line(&db, "shutdown", &mut out).unwrap(), Step::Exit);

        assert_eq!(String::from_utf8(out).unwrap(), "4\n");
        assert!(db.is_closed());
    }

    #[test]
    fn script_reports_failures_and_keeps_going() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("script.dsl");
        fs::write(
            &script,
            "-- setup\ncreate(db,\"db1\")\ncreate(tbl,\"t\",db1,1)\n\
             create(col,\"c\",db1.t)\nrelational_insert(db1.t,1,2)\n\
             relational_insert(db1.t,9)\na=sum(db1.t.c)\nprint(a)\n",
        )
        .unwrap();
        let db = Database::open(dir.path().join("disk")).unwrap();
        let mut out = Vec::new();

        let failures = run_script(&db, &script, &mut out).unwrap();

        assert_eq!(failures, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "9\n");
        assert!(db.is_closed());
    }
}
