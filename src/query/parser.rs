//! # DSL Parser
//!
//! Turns one line of the query language into a [`Statement`]. The language is a
//! flat sequence of function-call commands, optionally binding their outputs to
//! handle names:
//!
//! ```text
//! create(db,"db1")
//! create(tbl,"grades",db1,2)
//! create(col,"project",db1.grades,sorted)
//! create(idx,db1.grades.project,btree,unclustered)
//! relational_insert(db1.grades,107,80)
//! s=select(db1.grades.project,90,null)
//! f=fetch(db1.grades.project,s)
//! a=avg(f)
//! l,r=join(v1,p1,v2,p2,hash)
//! print(a)
//! load("data.csv")
//! -- comment
//! shutdown
//! ```
//!
//! Command words are matched through a static `phf` table. Whitespace outside
//! quoted strings is insignificant. The parser does not consult the catalog; it
//! produces name references that the executor resolves.

use phf::phf_map;
use smallvec::SmallVec;

use super::operator::{
    AggregateKind, ArithmeticKind, JoinKind, Operator, Predicate, Source, Statement,
};
use crate::btree::IndexKind;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Create,
    Insert,
    Select,
    Fetch,
    Aggregate(AggregateKind),
    Arithmetic(ArithmeticKind),
    Join,
    Print,
    Load,
    Shutdown,
}

static COMMANDS: phf::Map<&'static str, Command> = phf_map! {
    "create" => Command::Create,
    "relational_insert" => Command::Insert,
    "select" => Command::Select,
    "fetch" => Command::Fetch,
    "avg" => Command::Aggregate(AggregateKind::Avg),
    "sum" => Command::Aggregate(AggregateKind::Sum),
    "min" => Command::Aggregate(AggregateKind::Min),
    "max" => Command::Aggregate(AggregateKind::Max),
    "add" => Command::Arithmetic(ArithmeticKind::Add),
    "sub" => Command::Arithmetic(ArithmeticKind::Sub),
    "join" => Command::Join,
    "print" => Command::Print,
    "load" => Command::Load,
    "shutdown" => Command::Shutdown,
};

static JOIN_KINDS: phf::Map<&'static str, JoinKind> = phf_map! {
    "nested-loop" => JoinKind::NestedLoop,
    "hash" => JoinKind::Hash,
    "naive-hash" => JoinKind::NaiveHash,
    "grace-hash" => JoinKind::GraceHash,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arg<'a> {
    Quoted(&'a str),
    Word(&'a str),
}

type Args<'a> = SmallVec<[Arg<'a>; 8]>;

fn parse_err(msg: impl Into<String>) -> Error {
    Error::Parse(msg.into())
}

/// Parses one line. Blank lines and `--` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<Statement>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("--") {
        return Ok(None);
    }

    let (outputs, call) = split_outputs(line)?;
    let (word, args) = split_call(call)?;

    let command = COMMANDS
        .get(word)
        .copied()
        .ok_or_else(|| parse_err(format!("unknown command '{}'", word)))?;

    let operator = build_operator(command, &args)?;

    if outputs.len() != operator.output_count() {
        return Err(parse_err(format!(
            "'{}' binds {} handle(s), got {}",
            word,
            operator.output_count(),
            outputs.len()
        )));
    }

    Ok(Some(Statement { outputs, operator }))
}

/// Splits `a,b=rest` into the bound handle names and the call text.
fn split_outputs(line: &str) -> Result<(Vec<String>, &str)> {
    let paren = line.find('(').unwrap_or(line.len());
    let Some(eq) = line[..paren].find('=') else {
        return Ok((Vec::new(), line));
    };

    let outputs: Vec<String> = line[..eq]
        .split(',')
        .map(|s| s.trim().to_string())
        .collect();
    if outputs.iter().any(String::is_empty) {
        return Err(parse_err(format!("empty handle name in '{}'", &line[..eq])));
    }

    Ok((outputs, line[eq + 1..].trim()))
}

/// Splits `word(arg, arg, ...)` into the command word and its arguments.
fn split_call(call: &str) -> Result<(&str, Args<'_>)> {
    let Some(open) = call.find('(') else {
        return Ok((call, Args::new()));
    };

    let word = call[..open].trim();
    let rest = call[open + 1..].trim_end();
    let inner = rest
        .strip_suffix(')')
        .ok_or_else(|| parse_err(format!("missing ')' in '{}'", call)))?;

    Ok((word, split_args(inner)?))
}

fn split_args(inner: &str) -> Result<Args<'_>> {
    let mut args = Args::new();
    if inner.trim().is_empty() {
        return Ok(args);
    }

    let mut start = 0;
    let mut in_quotes = false;
    for (i, ch) in inner.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                args.push(classify(&inner[start..i])?);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(parse_err(format!("unterminated string in '{}'", inner)));
    }
    args.push(classify(&inner[start..])?);

    Ok(args)
}

fn classify(raw: &str) -> Result<Arg<'_>> {
    let arg = raw.trim();
    if arg.is_empty() {
        return Err(parse_err("empty argument"));
    }

    if let Some(body) = arg.strip_prefix('"') {
        let inner = body
            .strip_suffix('"')
            .ok_or_else(|| parse_err(format!("malformed string {}", arg)))?;
        return Ok(Arg::Quoted(inner));
    }

    if arg.chars().any(|c| c.is_whitespace() || c == '"') {
        return Err(parse_err(format!("malformed argument '{}'", arg)));
    }
    Ok(Arg::Word(arg))
}

fn expect_args(command: &str, args: &[Arg<'_>], counts: &[usize]) -> Result<()> {
    if counts.contains(&args.len()) {
        return Ok(());
    }
    Err(parse_err(format!(
        "'{}' takes {} argument(s), got {}",
        command,
        counts
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(" or "),
        args.len()
    )))
}

fn word<'a>(arg: &Arg<'a>) -> Result<&'a str> {
    match *arg {
        Arg::Word(w) => Ok(w),
        Arg::Quoted(q) => Err(parse_err(format!("expected a name, got \"{}\"", q))),
    }
}

fn quoted<'a>(arg: &Arg<'a>) -> Result<&'a str> {
    match *arg {
        Arg::Quoted(q) => Ok(q),
        Arg::Word(w) => Err(parse_err(format!("expected a quoted string, got {}", w))),
    }
}

fn integer(arg: &Arg<'_>) -> Result<i64> {
    let w = word(arg)?;
    w.parse::<i64>()
        .map_err(|_| parse_err(format!("expected an integer, got '{}'", w)))
}

fn bound(arg: &Arg<'_>) -> Result<Option<i64>> {
    match word(arg)? {
        "null" => Ok(None),
        _ => integer(arg).map(Some),
    }
}

fn source(arg: &Arg<'_>) -> Result<Source> {
    Ok(Source::from_name(word(arg)?))
}

fn build_operator(command: Command, args: &[Arg<'_>]) -> Result<Operator> {
    match command {
        Command::Create => build_create(args),
        Command::Insert => {
            if args.len() < 2 {
                return Err(parse_err("'relational_insert' needs a table and values"));
            }
            let values = args[1..].iter().map(integer).collect::<Result<Vec<_>>>()?;
            Ok(Operator::Insert {
                table: word(&args[0])?.to_string(),
                values,
            })
        }
        Command::Select => {
            expect_args("select", args, &[3, 4])?;
            let (source, reference, rest) = if args.len() == 3 {
                (self::source(&args[0])?, None, &args[1..])
            } else {
                (
                    Source::Handle(word(&args[1])?.to_string()),
                    Some(word(&args[0])?.to_string()),
                    &args[2..],
                )
            };
            Ok(Operator::Select {
                source,
                reference,
                predicate: Predicate::from_bounds(bound(&rest[0])?, bound(&rest[1])?),
            })
        }
        Command::Fetch => {
            expect_args("fetch", args, &[2])?;
            Ok(Operator::Fetch {
                column: word(&args[0])?.to_string(),
                positions: word(&args[1])?.to_string(),
            })
        }
        Command::Aggregate(kind) => {
            expect_args("aggregate", args, &[1])?;
            Ok(Operator::Aggregate {
                kind,
                input: source(&args[0])?,
            })
        }
        Command::Arithmetic(kind) => {
            expect_args("arithmetic", args, &[2])?;
            Ok(Operator::Arithmetic {
                kind,
                left: source(&args[0])?,
                right: source(&args[1])?,
            })
        }
        Command::Join => {
            expect_args("join", args, &[5])?;
            let kind_word = word(&args[4])?;
            let kind = JOIN_KINDS
                .get(kind_word)
                .copied()
                .ok_or_else(|| parse_err(format!("unknown join type '{}'", kind_word)))?;
            Ok(Operator::Join {
                kind,
                left_values: word(&args[0])?.to_string(),
                left_positions: word(&args[1])?.to_string(),
                right_values: word(&args[2])?.to_string(),
                right_positions: word(&args[3])?.to_string(),
            })
        }
        Command::Print => {
            if args.is_empty() {
                return Err(parse_err("'print' needs at least one input"));
            }
            let inputs = args.iter().map(source).collect::<Result<Vec<_>>>()?;
            Ok(Operator::Print { inputs })
        }
        Command::Load => {
            expect_args("load", args, &[1])?;
            Ok(Operator::Load {
                path: quoted(&args[0])?.to_string(),
            })
        }
        Command::Shutdown => {
            expect_args("shutdown", args, &[0])?;
            Ok(Operator::Shutdown)
        }
    }
}

fn build_create(args: &[Arg<'_>]) -> Result<Operator> {
    let Some(first) = args.first() else {
        return Err(parse_err("'create' needs an object kind"));
    };

    match word(first)? {
        "db" => {
            expect_args("create(db)", args, &[2])?;
            Ok(Operator::CreateDatabase {
                name: quoted(&args[1])?.to_string(),
            })
        }
        "tbl" => {
            expect_args("create(tbl)", args, &[4])?;
            let columns = integer(&args[3])?;
            let columns = usize::try_from(columns)
                .map_err(|_| Error::InvalidArgument(format!("column count {}", columns)))?;
            Ok(Operator::CreateTable {
                name: quoted(&args[1])?.to_string(),
                db: word(&args[2])?.to_string(),
                columns,
            })
        }
        "col" => {
            expect_args("create(col)", args, &[3, 4])?;
            let sorted = match args.get(3).map(word).transpose()? {
                None | Some("unsorted") => false,
                Some("sorted") => true,
                Some(other) => return Err(parse_err(format!("unknown column hint '{}'", other))),
            };
            Ok(Operator::CreateColumn {
                name: quoted(&args[1])?.to_string(),
                table: word(&args[2])?.to_string(),
                sorted,
            })
        }
        "idx" => {
            expect_args("create(idx)", args, &[4])?;
            let kind = match word(&args[2])? {
                "btree" => IndexKind::BTree,
                "sorted" => IndexKind::Sorted,
                other => return Err(parse_err(format!("unknown index type '{}'", other))),
            };
            let clustered = match word(&args[3])? {
                "clustered" => true,
                "unclustered" => false,
                other => return Err(parse_err(format!("unknown index organization '{}'", other))),
            };
            Ok(Operator::CreateIndex {
                column: word(&args[1])?.to_string(),
                kind,
                clustered,
            })
        }
        other => Err(parse_err(format!("cannot create '{}'", other))),
    }
}
