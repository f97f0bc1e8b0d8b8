//! Row output for list and report commands
//!
//! Documents and report rows are JSON objects; this module renders a set of
//! them in any [`OutputFormat`]. Status-like columns (stock status, priority,
//! risk, reconciliation status) are colored in the terminal table view.

use console::style;
use serde_json::{Map, Value};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::core::envelope::Envelope;
use crate::core::fields;

/// Widest a text cell may grow in the aligned table view
const MAX_CELL_WIDTH: usize = 32;

/// One cell as plain text (no styling)
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        Some(v @ (Value::Array(_) | Value::Object(_))) => v.to_string(),
        Some(v) => fields::text_of(v).unwrap_or_default(),
    }
}

/// Two decimals, trailing zeros trimmed
fn format_number(f: f64) -> String {
    let s = format!("{:.2}", f);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn styled_cell(column: &str, text: &str, width: usize) -> String {
    let shown = truncate_str(text, width);
    let styled = match (column, text) {
        (_, "") => style("-".to_string()).dim(),
        ("stock_status", "out_of_stock") => style(shown).red().bold(),
        ("stock_status", "low_stock") => style(shown).yellow(),
        ("stock_status", "normal") => style(shown).green(),
        ("priority_level", "urgent") | ("risk_level", "high") => style(shown).red().bold(),
        ("priority_level", "high") | ("risk_level", "medium") => style(shown).yellow(),
        ("priority_level" | "risk_level", "none") => style(shown).dim(),
        ("status", "overpaid") => style(shown).magenta(),
        ("turnover_category", "fast_moving") => style(shown).green(),
        ("turnover_category", "slow_moving") => style(shown).yellow(),
        _ => style(shown),
    };
    format!("{}", styled)
}

/// Pad to a display width, counting characters
fn pad(text: &str, visible: usize, width: usize, right: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(visible));
    if right {
        format!("{}{}", fill, text)
    } else {
        format!("{}{}", text, fill)
    }
}

/// Renders JSON rows with a fixed column order
pub struct RowTable<'a> {
    columns: Vec<String>,
    key_field: &'a str,
    noun: &'a str,
    show_summary: bool,
}

impl<'a> RowTable<'a> {
    pub fn new<S: AsRef<str>>(columns: &[S], key_field: &'a str, noun: &'a str) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            key_field,
            noun,
            show_summary: true,
        }
    }

    /// Omit the trailing "N row(s)" line
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }

    /// Print rows in the requested format; `Auto` means `fallback`
    pub fn output(
        &self,
        rows: &[Map<String, Value>],
        format: OutputFormat,
        fallback: OutputFormat,
    ) {
        let format = match format {
            OutputFormat::Auto => fallback,
            f => f,
        };
        match format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string());
                println!("{}", json);
            }
            OutputFormat::Yaml => match serde_yml::to_string(rows) {
                Ok(yaml) => print!("{}", yaml),
                Err(e) => eprintln!("{} failed to render YAML: {}", style("✗").red(), e),
            },
            OutputFormat::Csv => self.output_csv(rows),
            OutputFormat::Md => self.output_md(rows),
            OutputFormat::Id => {
                for row in rows {
                    println!("{}", cell_text(row.get(self.key_field)));
                }
            }
            OutputFormat::Tsv | OutputFormat::Auto => self.output_tsv(rows),
        }
    }

    fn is_numeric_column(&self, rows: &[Map<String, Value>], column: &str) -> bool {
        rows.iter()
            .filter_map(|r| r.get(column))
            .any(Value::is_number)
    }

    fn output_tsv(&self, rows: &[Map<String, Value>]) {
        let texts: Vec<Vec<String>> = rows
            .iter()
            .map(|r| self.columns.iter().map(|c| cell_text(r.get(c))).collect())
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let content = texts
                    .iter()
                    .map(|t| t[i].chars().count())
                    .max()
                    .unwrap_or(0)
                    .min(MAX_CELL_WIDTH);
                content.max(c.chars().count()).max(1)
            })
            .collect();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| {
                let title = style(c.to_uppercase()).bold().to_string();
                pad(&title, c.chars().count(), *w, false)
            })
            .collect();
        println!("{}", header.join("  "));
        let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        println!("{}", "-".repeat(total));

        let numeric: Vec<bool> = self
            .columns
            .iter()
            .map(|c| self.is_numeric_column(rows, c))
            .collect();
        for text_row in &texts {
            let parts: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    let raw = &text_row[i];
                    let visible = truncate_str(raw, widths[i]).chars().count().max(1);
                    pad(&styled_cell(c, raw, widths[i]), visible, widths[i], numeric[i])
                })
                .collect();
            println!("{}", parts.join("  "));
        }

        if self.show_summary {
            println!();
            println!("{} {}(s)", style(rows.len()).cyan(), self.noun);
        }
    }

    fn output_csv(&self, rows: &[Map<String, Value>]) {
        println!("{}", self.columns.join(","));
        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|c| escape_csv(&cell_text(row.get(c))))
                .collect();
            println!("{}", values.join(","));
        }
    }

    fn output_md(&self, rows: &[Map<String, Value>]) {
        println!("{}", markdown_table(&self.columns, rows));
    }
}

/// Markdown table via tabled; pipes in cells are escaped
pub fn markdown_table<S: AsRef<str>>(columns: &[S], rows: &[Map<String, Value>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.as_ref().to_string()));
    for row in rows {
        builder.push_record(
            columns
                .iter()
                .map(|c| cell_text(row.get(c.as_ref())).replace('|', "\\|")),
        );
    }
    builder.build().with(Style::markdown()).to_string()
}

/// Print a single document (show/get commands); `Auto` means YAML
pub fn print_document(doc: &Map<String, Value>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(doc).unwrap_or_else(|_| "{}".to_string()));
        }
        OutputFormat::Tsv | OutputFormat::Csv | OutputFormat::Md => {
            let columns: Vec<&String> = doc.keys().collect();
            RowTable::new(&columns, "", "document")
                .without_summary()
                .output(std::slice::from_ref(doc), format, OutputFormat::Tsv);
        }
        OutputFormat::Id => {
            if let Some((_, v)) = doc.iter().next() {
                println!("{}", cell_text(Some(v)));
            }
        }
        OutputFormat::Yaml | OutputFormat::Auto => match serde_yml::to_string(doc) {
            Ok(yaml) => print!("{}", yaml),
            Err(e) => eprintln!("{} failed to render YAML: {}", style("✗").red(), e),
        },
    }
}

/// Print an envelope on stdout; YAML when asked, pretty JSON otherwise
pub fn print_envelope(envelope: &Envelope, format: OutputFormat) {
    match format {
        OutputFormat::Yaml => match serde_yml::to_string(&envelope.to_value()) {
            Ok(yaml) => print!("{}", yaml),
            Err(_) => println!("{}", envelope.to_json_pretty()),
        },
        _ => println!("{}", envelope.to_json_pretty()),
    }
}

/// Print an envelope and end the process with its exit code when it is a
/// failure
pub fn emit_envelope(envelope: &Envelope, format: OutputFormat) {
    print_envelope(envelope, format);
    if !envelope.is_success() {
        std::process::exit(envelope.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_cell_text_numbers() {
        assert_eq!(cell_text(Some(&json!(12))), "12");
        assert_eq!(cell_text(Some(&json!(12.5))), "12.5");
        assert_eq!(cell_text(Some(&json!(1.0 / 3.0))), "0.33");
        assert_eq!(cell_text(Some(&json!(2.0))), "2");
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&Value::Null)), "");
    }

    #[test]
    fn test_cell_text_nested() {
        assert_eq!(cell_text(Some(&json!(["a", "b"]))), r#"["a","b"]"#);
        assert_eq!(cell_text(Some(&json!("ACME"))), "ACME");
    }

    #[test]
    fn test_markdown_table_escapes_pipes() {
        let rows = vec![row(json!({"name": "a|b", "qty": 3}))];
        let md = markdown_table(&["name", "qty"], &rows);
        assert!(md.contains("a\\|b"));
        assert!(md.lines().next().unwrap().contains("name"));
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad("ab", 2, 4, false), "ab  ");
        assert_eq!(pad("ab", 2, 4, true), "  ab");
        assert_eq!(pad("abcdef", 6, 4, false), "abcdef");
    }
}
