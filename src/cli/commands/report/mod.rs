//! `ims report` command - Business reports
//!
//! Each subcommand maps onto one report method. With `--format json` the
//! method's envelope is printed as-is; otherwise the report is rendered as
//! a markdown document (summary table, then rows) and written to stdout or
//! `--output`.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

use crate::analysis;
use crate::cli::helpers::StoreContext;
use crate::cli::output::{cell_text, emit_envelope, markdown_table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::export::{self, ExportFormat};
use crate::core::paginate::Paginator;
use crate::core::params::{validate_method_params, ParamTable};
use crate::reports::ReportQuery;

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Stock levels with low/out-of-stock flags
    #[clap(alias = "inv")]
    Inventory(ReportArgs),

    /// Sales grouped by customer and material
    Sales(ReportArgs),

    /// Purchases grouped by supplier and material
    #[clap(alias = "purchase")]
    Purchases(ReportArgs),

    /// Customer balances with aging buckets
    #[clap(alias = "ar")]
    Receivables(ReportArgs),

    /// Supplier balances with aging buckets
    #[clap(alias = "ap")]
    Payables(ReportArgs),

    /// Purchases against payments per supplier
    #[clap(alias = "supplier-recon")]
    SupplierReconciliation(ReportArgs),

    /// Sales against receipts per customer
    #[clap(alias = "customer-recon")]
    CustomerReconciliation(ReportArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct ReportArgs {
    /// First date included (YYYY-MM-DD and common variants)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Last date included
    #[arg(long)]
    pub end_date: Option<String>,

    /// Customer or supplier name (substring)
    #[arg(long, alias = "customer", alias = "supplier")]
    pub party: Option<String>,

    /// Material code (substring)
    #[arg(long)]
    pub material: Option<String>,

    /// Product name (inventory)
    #[arg(long)]
    pub product: Option<String>,

    /// Stock status: normal, low_stock, out_of_stock (inventory)
    #[arg(long)]
    pub status: Option<String>,

    /// Low stock threshold (default from config)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Length of top-N lists in summaries
    #[arg(long)]
    pub top_n: Option<i64>,

    /// Aging reference date (receivables/payables)
    #[arg(long)]
    pub as_of: Option<String>,

    /// Show only this page of rows
    #[arg(long)]
    pub page: Option<i64>,

    /// Rows per page (default from config)
    #[arg(long)]
    pub page_size: Option<i64>,

    /// Print the summary method instead of the row report
    #[arg(long)]
    pub summary: bool,

    /// Output to file instead of stdout (.md, .csv, .xlsx, .json)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

impl ReportArgs {
    /// Raw parameters for `method`; flags the method does not take are left
    /// out
    fn params_for(&self, method: &str) -> Value {
        let mut raw = Map::new();
        let mut put = |name: &str, value: Option<Value>| {
            if let Some(v) = value {
                raw.insert(name.to_string(), v);
            }
        };
        put("start_date", self.start_date.clone().map(Value::from));
        put("end_date", self.end_date.clone().map(Value::from));
        put("customer_name", self.party.clone().map(Value::from));
        put("supplier_name", self.party.clone().map(Value::from));
        put("material_code", self.material.clone().map(Value::from));
        put("product_name", self.product.clone().map(Value::from));
        put("stock_status", self.status.clone().map(Value::from));
        put("low_stock_threshold", self.threshold.map(Value::from));
        put("top_n", self.top_n.map(Value::from));
        put("as_of", self.as_of.clone().map(Value::from));
        put("page", self.page.map(Value::from));
        put("page_size", self.page_size.map(Value::from));

        if let Some(table) = ParamTable::for_method(method) {
            raw.retain(|name, _| table.spec(name).is_some());
        }
        Value::Object(raw)
    }
}

impl ReportCommands {
    fn into_parts(self) -> (&'static str, Option<&'static str>, ReportArgs) {
        match self {
            ReportCommands::Inventory(a) => ("inventory_report", None, a),
            ReportCommands::Sales(a) => ("sales_report", Some("sales_summary"), a),
            ReportCommands::Purchases(a) => ("purchase_report", Some("purchase_summary"), a),
            ReportCommands::Receivables(a) => {
                ("receivables_report", Some("receivables_summary"), a)
            }
            ReportCommands::Payables(a) => ("payables_report", Some("payables_summary"), a),
            ReportCommands::SupplierReconciliation(a) => ("supplier_reconciliation", None, a),
            ReportCommands::CustomerReconciliation(a) => ("customer_reconciliation", None, a),
        }
    }
}

pub fn run(cmd: ReportCommands, global: &GlobalOpts) -> Result<()> {
    let (report_method, summary_method, args) = cmd.into_parts();
    let method = match (args.summary, summary_method) {
        (true, Some(m)) => m,
        (true, None) => {
            return Err(miette::miette!(
                help = "the row report already carries a summary block",
                "{} has no separate summary",
                report_method
            ))
        }
        (false, _) => report_method,
    };
    let ctx = StoreContext::open(global)?;
    let raw = args.params_for(method);

    if global.format == OutputFormat::Json && args.output.is_none() {
        emit_envelope(&analysis::call(&ctx.store, &ctx.config, method, &raw), global.format);
        return Ok(());
    }

    let params = validate_method_params(method, &raw)?;
    let mut query = ReportQuery::from_params(&params);
    if args.threshold.is_none() {
        query.low_stock_threshold = ctx.config.low_stock_threshold();
    }

    if method != report_method {
        let (data, _) = analysis::run(&ctx.store, method, &params, &query)?;
        let title = format!("{} Summary", heading(report_method));
        let mut content = format!("# {}\n\n", title);
        render_summary(&data, &mut content);
        return write_output(&content, args.output);
    }

    let report = analysis::report_output(&ctx.store, method, &query)?;

    if let Some(path) = &args.output {
        if !is_markdown(path) {
            let columns: Vec<String> = report.columns.iter().map(|c| c.to_string()).collect();
            let written = export::export_rows(path, &columns, &report.rows)?;
            if !global.quiet {
                println!(
                    "{} Wrote {} row(s) to {}",
                    style("✓").green(),
                    style(written).cyan(),
                    style(path.display()).cyan()
                );
            }
            return Ok(());
        }
    }

    let total = report.rows.len();
    let (rows, page_note) = if args.page.is_some() || args.page_size.is_some() {
        let paginator = Paginator::with_max(
            args.page.unwrap_or(1),
            args.page_size
                .unwrap_or(ctx.config.default_page_size() as i64),
            ctx.config.max_page_size(),
        );
        let (rows, info) = paginator.paginate(report.rows);
        let note = format!(
            "Page {} of {} (rows {}-{} of {})",
            info.current_page, info.total_pages, info.start_index, info.end_index, info.total_count
        );
        (rows, Some(note))
    } else {
        (report.rows, None)
    };

    let mut content = format!("# {}\n\n", report.title);
    content.push_str("## Summary\n\n");
    render_summary(&report.summary, &mut content);
    content.push_str("\n## Rows\n\n");
    if total == 0 {
        content.push_str("*No rows match the given filters.*\n");
    } else {
        content.push_str(&markdown_table(report.columns, &rows));
        content.push('\n');
        if let Some(note) = page_note {
            content.push_str(&format!("\n{}\n", note));
        }
    }
    write_output(&content, args.output)
}

fn heading(method: &str) -> String {
    method
        .trim_end_matches("_report")
        .split('_')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn is_markdown(path: &Path) -> bool {
    !matches!(
        ExportFormat::from_path(path),
        Ok(ExportFormat::Csv | ExportFormat::Xlsx | ExportFormat::Json)
    )
}

/// Flatten nested objects into dotted metric names
fn collect_metrics(prefix: &str, value: &Value, metrics: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let name = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", prefix, k)
                };
                if !matches!(v, Value::Array(_)) {
                    collect_metrics(&name, v, metrics);
                }
            }
        }
        Value::Array(_) => {}
        scalar => metrics.push((prefix.to_string(), cell_text(Some(scalar)))),
    }
}

/// Summary as a Metric/Value table followed by one table per list
fn render_summary(summary: &Value, out: &mut String) {
    let mut metrics = Vec::new();
    collect_metrics("", summary, &mut metrics);
    if !metrics.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Metric", "Value"]);
        for (name, value) in &metrics {
            builder.push_record([name.as_str(), value.as_str()]);
        }
        out.push_str(&builder.build().with(Style::markdown()).to_string());
        out.push('\n');
    }

    let Value::Object(map) = summary else {
        return;
    };
    for (name, value) in map {
        let Value::Array(items) = value else {
            continue;
        };
        let rows: Vec<Map<String, Value>> = items
            .iter()
            .filter_map(|v| v.as_object().cloned())
            .collect();
        out.push_str(&format!("\n### {}\n\n", name));
        if rows.is_empty() {
            let listed: Vec<String> = items.iter().map(|v| cell_text(Some(v))).collect();
            let text = if listed.is_empty() {
                "-".to_string()
            } else {
                listed.join(", ")
            };
            out.push_str(&format!("{}\n", text));
            continue;
        }
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        out.push_str(&markdown_table(&columns, &rows));
        out.push('\n');
    }
}

pub(crate) fn write_output(content: &str, output_path: Option<PathBuf>) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            println!("Report written to: {}", path.display());
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
