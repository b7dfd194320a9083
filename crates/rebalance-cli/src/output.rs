//! Terminal rendering: row tables, KPI sheets and status lines.

use std::io::{self, Write};

use colored::{ColoredString, Colorize};
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::cli::OutputFormat;

/// Renders rows as a rounded table with the key column left-aligned.
pub fn render_table<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::left()))
        .to_string()
}

/// Writes rows in `format`.
///
/// `Minimal` writes the row count; commands with a headline figure print
/// that instead.
pub fn write_rows<W, T>(out: &mut W, rows: &[T], format: OutputFormat) -> anyhow::Result<()>
where
    W: Write,
    T: Serialize + Tabled,
{
    match format {
        OutputFormat::Table => writeln!(out, "{}", render_table(rows))?,
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(rows)?)?,
        OutputFormat::Csv => write_csv(out, rows)?,
        OutputFormat::Minimal => writeln!(out, "{}", rows.len())?,
    }
    Ok(())
}

/// [`write_rows`] to stdout.
pub fn print_rows<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) -> anyhow::Result<()> {
    write_rows(&mut io::stdout().lock(), rows, format)
}

fn write_csv<W: Write, T: Serialize>(out: W, rows: &[T]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Rows as CSV on stdout, header first.
pub fn print_csv<T: Serialize>(rows: &[T]) -> anyhow::Result<()> {
    write_csv(io::stdout().lock(), rows)
}

/// Pretty JSON of one document on stdout.
pub fn print_json<T: Serialize + ?Sized>(document: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(document)?);
    Ok(())
}

/// Exposures and profits: two decimals.
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

/// Exposure changes, always signed.
pub fn format_change(value: f64) -> String {
    format!("{:+.2}", value)
}

/// Rates shown as percentages.
pub fn format_percent(value: f64) -> String {
    format!("{:.4}%", value * 100.0)
}

/// Exposure multipliers.
pub fn format_multiplier(value: f64) -> String {
    format!("{:.6}", value)
}

/// Risk weights and other unitless ratios.
pub fn format_ratio(value: f64) -> String {
    format!("{:.4}", value)
}

/// One labelled figure of a [`KpiSheet`].
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct KpiRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// A titled list of KPIs, printed as a two-column table.
///
/// ```ignore
/// KpiSheet::new("Realized KPIs")
///     .amount("Net profit", 118.0)
///     .optional_amount("Downside risk", None)
///     .print();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KpiSheet {
    title: String,
    rows: Vec<KpiRow>,
}

impl KpiSheet {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
        }
    }

    /// Adds a preformatted value.
    #[must_use]
    pub fn text(mut self, metric: impl Into<String>, value: impl ToString) -> Self {
        self.rows.push(KpiRow {
            metric: metric.into(),
            value: value.to_string(),
        });
        self
    }

    #[must_use]
    pub fn amount(self, metric: impl Into<String>, value: f64) -> Self {
        self.text(metric, format_amount(value))
    }

    #[must_use]
    pub fn percent(self, metric: impl Into<String>, value: f64) -> Self {
        self.text(metric, format_percent(value))
    }

    #[must_use]
    pub fn ratio(self, metric: impl Into<String>, value: f64) -> Self {
        self.text(metric, format_ratio(value))
    }

    /// Adds an amount, or `-` when the figure does not apply.
    #[must_use]
    pub fn optional_amount(self, metric: impl Into<String>, value: Option<f64>) -> Self {
        self.text(metric, value.map_or_else(|| "-".to_string(), format_amount))
    }

    /// Adds a percentage, or `-` when the figure does not apply.
    #[must_use]
    pub fn optional_percent(self, metric: impl Into<String>, value: Option<f64>) -> Self {
        self.text(metric, value.map_or_else(|| "-".to_string(), format_percent))
    }

    pub fn rows(&self) -> &[KpiRow] {
        &self.rows
    }

    pub fn render(&self) -> String {
        format!("{}\n{}", section_title(&self.title), render_table(&self.rows))
    }

    pub fn print(&self) {
        println!("{}", self.render());
    }
}

fn section_title(title: &str) -> String {
    format!("\n{}", title.bold().underline())
}

/// Prints a section title above a table.
pub fn print_section(title: &str) {
    println!("{}", section_title(title));
}

/// Kind of a one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Success,
    Info,
    Warning,
    Error,
}

impl Notice {
    fn marker(self) -> ColoredString {
        match self {
            Notice::Success => "✓".green(),
            Notice::Info => "ℹ".blue(),
            Notice::Warning => "⚠".yellow(),
            Notice::Error => "✗".red(),
        }
    }
}

/// Prints a status line. Warnings and errors go to stderr so that piped
/// JSON and CSV stay clean.
pub fn notify(kind: Notice, message: &str) {
    match kind {
        Notice::Success | Notice::Info => println!("{} {}", kind.marker(), message),
        Notice::Warning | Notice::Error => eprintln!("{} {}", kind.marker(), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Tabled)]
    struct Row {
        asset: String,
        exposure: f64,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                asset: "A1".into(),
                exposure: 1200.0,
            },
            Row {
                asset: "A2".into(),
                exposure: 800.0,
            },
        ]
    }

    fn written(format: OutputFormat) -> String {
        let mut out = Vec::new();
        write_rows(&mut out, &rows(), format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_formatters() {
        assert_eq!(format_amount(120.0), "120.00");
        assert_eq!(format_change(-200.0), "-200.00");
        assert_eq!(format_change(200.0), "+200.00");
        assert_eq!(format_percent(0.2), "20.0000%");
        assert_eq!(format_multiplier(1.2), "1.200000");
        assert_eq!(format_ratio(0.3), "0.3000");
    }

    #[test]
    fn test_write_rows_formats() {
        assert_eq!(written(OutputFormat::Csv), "asset,exposure\nA1,1200.0\nA2,800.0\n");
        assert_eq!(written(OutputFormat::Minimal), "2\n");

        let json: serde_json::Value = serde_json::from_str(&written(OutputFormat::Json)).unwrap();
        assert_eq!(json[1]["asset"], "A2");

        let table = written(OutputFormat::Table);
        assert!(table.contains("A1"));
        assert!(table.contains("1200"));
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render_table::<Row>(&[]), "(no rows)");
    }

    #[test]
    fn test_kpi_sheet() {
        let sheet = KpiSheet::new("Realized KPIs")
            .amount("Net profit", 118.0)
            .percent("Profit stdev", 0.025)
            .optional_amount("Downside risk", None)
            .text("Iterations", 12);
        let values: Vec<&str> = sheet.rows().iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["118.00", "2.5000%", "-", "12"]);

        let rendered = sheet.render();
        assert!(rendered.contains("Realized KPIs"));
        assert!(rendered.contains("Net profit"));
    }
}
