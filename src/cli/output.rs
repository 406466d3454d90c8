use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use super::OutputFormat;

/// Print rows as a table, `|`-separated lines, or a JSON array.
///
/// Status lines go to stderr so stdout only ever carries the data.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(data),
        OutputFormat::Table if data.is_empty() => print_info("Nothing found"),
        OutputFormat::Table => println!("{}", Table::new(data)),
        OutputFormat::Plain => {
            for line in plain_lines(data) {
                println!("{}", line);
            }
        }
    }
}

/// One line per row, columns in declaration order
fn plain_lines<T: Tabled>(data: &[T]) -> Vec<String> {
    data.iter().map(|row| row.fields().join("|")).collect()
}

pub fn print_json<T: Serialize + ?Sized>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize output: {}", e)),
    }
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message);
}
