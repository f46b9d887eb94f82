//! # coldb CLI Entry Point
//!
//! ```bash
//! coldb [-d|--data-dir DIR] [SCRIPT]
//! coldb --help
//! coldb --version
//! ```
//!
//! The storage root defaults to `$COLDB_DATA_DIR`, then `./disk`. Log output
//! goes to stderr, filtered by `$COLDB_LOG` (default `warn`).

use std::env;
use std::path::PathBuf;

use coldb::cli::{run_script, Repl};
use coldb::config::DEFAULT_DATA_DIR;
use coldb::Database;
use eyre::{bail, Result, WrapErr};
use tracing_subscriber::EnvFilter;

const DATA_DIR_ENV_VAR: &str = "COLDB_DATA_DIR";
const LOG_ENV_VAR: &str = "COLDB_LOG";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut data_dir: Option<PathBuf> = None;
    let mut script: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-v" => {
                println!("coldb {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--data-dir" | "-d" => {
                i += 1;
                let Some(dir) = args.get(i) else {
                    bail!("{} needs a directory", args[i - 1]);
                };
                data_dir = Some(PathBuf::from(dir));
            }
            arg if arg.starts_with('-') => {
                bail!("Unknown option: {}", arg);
            }
            path => {
                if script.is_some() {
                    bail!("Multiple scripts specified");
                }
                script = Some(PathBuf::from(path));
            }
        }
        i += 1;
    }

    init_logging();

    let data_dir = data_dir
        .or_else(|| env::var_os(DATA_DIR_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    let db = Database::open(&data_dir)
        .wrap_err_with(|| format!("failed to open storage root {:?}", data_dir))?;

    match script {
        Some(path) => {
            let mut stdout = std::io::stdout().lock();
            let failures = run_script(&db, &path, &mut stdout)?;
            if failures > 0 {
                bail!("{} statement(s) failed in {:?}", failures, path);
            }
        }
        None => Repl::new(db)?.run()?,
    }

    Ok(())
}

fn print_usage() {
    println!("coldb - memory-mapped column store");
    println!();
    println!("USAGE:");
    println!("    coldb [OPTIONS] [SCRIPT]");
    println!();
    println!("ARGS:");
    println!("    [SCRIPT]              Run statements from SCRIPT instead of the REPL");
    println!();
    println!("OPTIONS:");
    println!("    -d, --data-dir DIR    Storage root (default: $COLDB_DATA_DIR or ./disk)");
    println!("    -h, --help            Print help information");
    println!("    -v, --version         Print version information");
    println!();
    println!("ENVIRONMENT:");
    println!("    COLDB_LOG             Log filter, e.g. info or coldb=debug (default: warn)");
    println!("    COLDB_HISTORY         REPL history file; empty disables history");
}
