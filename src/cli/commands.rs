//! # Dot Command Handler
//!
//! Dot commands inspect the open database and control the REPL. They start with
//! a period and are never sent to the query parser.
//!
//! | Command              | Description                                   |
//! |----------------------|-----------------------------------------------|
//! | `.quit` / `.exit`    | Exit the REPL (persists like `shutdown`)      |
//! | `.tables`            | List tables with row and column counts        |
//! | `.columns TABLE`     | List a table's columns with their aggregates  |
//! | `.handles`           | List live handles, most recent first          |
//! | `.help`              | Show available commands                       |
//!
//! Command words are case-insensitive; arguments are whitespace-separated.

use crate::cli::table::TableFormatter;
use crate::Database;

#[derive(Debug, PartialEq)]
pub enum CommandResult {
    Output(String),
    Exit,
    Continue,
    Error(String),
}

pub struct CommandHandler;

impl CommandHandler {
    pub fn is_command(input: &str) -> bool {
        input.trim().starts_with('.')
    }

    pub fn execute(input: &str, db: &Database) -> CommandResult {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return CommandResult::Continue;
        };

        let cmd = first.to_lowercase();
        let args = &parts[1..];

        match cmd.as_str() {
            ".quit" | ".exit" | ".q" => CommandResult::Exit,
            ".help" | ".h" | ".?" => CommandResult::Output(help_text()),
            ".tables" => list_tables(db),
            ".columns" => list_columns(db, args),
            ".handles" => list_handles(db),
            _ => CommandResult::Error(format!(
                "Unknown command: {}. Type .help for available commands.",
                cmd
            )),
        }
    }
}

fn help_text() -> String {
    r#"coldb commands:

  .quit, .exit, .q     Persist and exit
  .help, .h, .?        Show this help message
  .tables              List tables in the active database
  .columns TABLE       List columns of TABLE (db.table or table)
  .handles             List live handles

Query language, one statement per line:
  create(db,"db1")                      create(tbl,"t",db1,2)
  create(col,"c",db1.t[,sorted])        create(idx,db1.t.c,btree|sorted,unclustered)
  relational_insert(db1.t,1,2)          load("file.csv")
  s=select(db1.t.c,low|null,high|null)  s=select(pos,vals,low,high)
  f=fetch(db1.t.c,s)                    a=avg|sum|min|max(f)
  r=add|sub(x,y)                        l,r=join(v1,p1,v2,p2,hash)
  print(h1,h2,...)                      shutdown
Lines starting with -- are comments."#
        .to_string()
}

fn list_tables(db: &Database) -> CommandResult {
    let rows = db.with_catalog(|catalog| {
        catalog
            .tables()
            .iter()
            .map(|t| {
                vec![
                    format!("{}.{}", catalog.name(), t.name()),
                    t.num_rows().to_string(),
                    format!("{}/{}", t.columns().len(), t.capacity()),
                ]
            })
            .collect::<Vec<_>>()
    });

    match rows {
        Ok(rows) if rows.is_empty() => CommandResult::Output("No tables found.".to_string()),
        Ok(rows) => CommandResult::Output(
            TableFormatter::new(&["table", "rows", "columns"], rows).render(),
        ),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

fn list_columns(db: &Database, args: &[&str]) -> CommandResult {
    let Some(&table) = args.first() else {
        return CommandResult::Error("Usage: .columns TABLE".to_string());
    };

    let rows = db.with_catalog(|catalog| {
        let qualified = if table.contains('.') {
            table.to_string()
        } else {
            format!("{}.{}", catalog.name(), table)
        };
        let t = catalog.table(catalog.lookup_table(&qualified)?)?;
        Ok::<_, crate::Error>(
            t.columns()
                .iter()
                .map(|c| {
                    let opt = |v: Option<i64>| v.map_or("-".to_string(), |v| v.to_string());
                    vec![
                        c.name().to_string(),
                        c.num_elements().to_string(),
                        opt(c.min()),
                        opt(c.max()),
                        c.sum().to_string(),
                        c.index_kind().map_or("-", |k| k.as_str()).to_string(),
                    ]
                })
                .collect::<Vec<_>>(),
        )
    });

    match rows {
        Ok(Ok(rows)) => CommandResult::Output(
            TableFormatter::new(&["column", "rows", "min", "max", "sum", "index"], rows).render(),
        ),
        Ok(Err(e)) | Err(e) => CommandResult::Error(e.to_string()),
    }
}

fn list_handles(db: &Database) -> CommandResult {
    match db.handles() {
        Ok(handles) if handles.is_empty() => CommandResult::Output("No handles.".to_string()),
        Ok(handles) => {
            let rows = handles
                .into_iter()
                .map(|h| vec![h.name, h.kind.to_string(), h.len.to_string()])
                .collect();
            CommandResult::Output(TableFormatter::new(&["handle", "type", "len"], rows).render())
        }
        Err(e) => CommandResult::Error(e.to_string()),
    }
}
