//! # ASCII Table Formatter
//!
//! Renders dot-command listings:
//!
//! ```text
//! +--------+------+-----+-----+-----+-------+
//! | column | rows | min | max | sum | index |
//! +--------+------+-----+-----+-----+-------+
//! | score  |    2 |  -3 |   7 |   4 | -     |
//! +--------+------+-----+-----+-----+-------+
//! ```
//!
//! A column whose cells are all integers (or `-` for "none") is right-aligned;
//! anything else is left-aligned. Headers are always left-aligned. Cells wider
//! than `MAX_CELL_WIDTH` characters are cut and end in `...`.

use std::fmt::Write;

const MAX_CELL_WIDTH: usize = 50;
const NONE_MARKER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

pub struct TableFormatter {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    widths: Vec<usize>,
    aligns: Vec<Align>,
}

impl TableFormatter {
    pub fn new(headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        let widths = (0..headers.len())
            .map(|c| {
                rows.iter()
                    .filter_map(|row| row.get(c))
                    .map(|cell| cell.chars().count())
                    .fold(headers[c].chars().count(), usize::max)
                    .min(MAX_CELL_WIDTH)
            })
            .collect();
        let aligns = (0..headers.len()).map(|c| column_align(&rows, c)).collect();

        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
            widths,
            aligns,
        }
    }

    pub fn render(&self) -> String {
        let rule = self.rule();
        let mut out = String::with_capacity(rule.len() * (self.rows.len() + 4));

        out.push_str(&rule);
        self.write_cells(&mut out, &self.headers, |_| Align::Left);
        out.push_str(&rule);
        for row in &self.rows {
            self.write_cells(&mut out, row, |c| self.aligns[c]);
        }
        out.push_str(&rule);

        out
    }

    fn rule(&self) -> String {
        let mut rule = String::from("+");
        for &width in &self.widths {
            rule.extend(std::iter::repeat('-').take(width + 2));
            rule.push('+');
        }
        rule.push('\n');
        rule
    }

    fn write_cells(&self, out: &mut String, cells: &[String], align: impl Fn(usize) -> Align) {
        out.push('|');
        for (c, &width) in self.widths.iter().enumerate() {
            let cell = clip(cells.get(c).map_or("", String::as_str), width);
            // Writing into a String cannot fail.
            let _ = match align(c) {
                Align::Left => write!(out, " {:<width$} |", cell),
                Align::Right => write!(out, " {:>width$} |", cell),
            };
        }
        out.push('\n');
    }
}

fn column_align(rows: &[Vec<String>], c: usize) -> Align {
    let cells = || rows.iter().filter_map(|row| row.get(c));
    let numeric = cells().any(|cell| cell.parse::<i64>().is_ok())
        && cells().all(|cell| cell == NONE_MARKER || cell.parse::<i64>().is_ok());

    if numeric {
        Align::Right
    } else {
        Align::Left
    }
}

fn clip(cell: &str, width: usize) -> String {
    if cell.chars().count() <= width {
        return cell.to_string();
    }
    if width <= 3 {
        return cell.chars().take(width).collect();
    }
    let mut clipped: String = cell.chars().take(width - 3).collect();
    clipped.push_str("...");
    clipped
}
