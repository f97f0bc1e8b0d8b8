//! `ims call` command - Run any analysis or report method by name
//!
//! The answer is always a JSON envelope on stdout. A failed call exits
//! non-zero after printing its failure envelope.

use console::style;
use miette::Result;
use serde_json::{json, Value};

use crate::analysis;
use crate::cli::helpers::StoreContext;
use crate::cli::output::{emit_envelope, print_envelope};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::envelope::Envelope;
use crate::core::error::ImsError;
use crate::core::params::METHODS;

#[derive(clap::Args, Debug)]
pub struct CallArgs {
    /// Method name, e.g. get_dashboard_summary or sales_report
    #[arg(required_unless_present_any = ["list", "analysis_type"])]
    pub method: Option<String>,

    /// Parameters as a JSON object
    #[arg(long, short = 'p')]
    pub params: Option<String>,

    /// Legacy analysis selector (overview, sales_trend, customer_value,
    /// inventory_turnover, comparison)
    #[arg(long, conflicts_with = "method")]
    pub analysis_type: Option<String>,

    /// List available methods
    #[arg(long)]
    pub list: bool,
}

pub fn run(args: CallArgs, global: &GlobalOpts) -> Result<()> {
    if args.list {
        list_methods(global);
        return Ok(());
    }

    let method = match (&args.method, &args.analysis_type) {
        (Some(m), _) => m.trim().to_string(),
        (None, Some(kind)) => match analysis::legacy_method(kind) {
            Ok(m) => m.to_string(),
            Err(e) => {
                emit_envelope(&Envelope::from_error(None, &e), OutputFormat::Json);
                return Ok(());
            }
        },
        (None, None) => return Err(miette::miette!("a method name is required")),
    };

    let raw = match args.params.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => json!({}),
        Some(text) => match serde_json::from_str::<Value>(text) {
            Ok(v) => v,
            Err(e) => {
                let err = ImsError::from(e);
                emit_envelope(&Envelope::from_error(Some(method.as_str()), &err), global.format);
                return Ok(());
            }
        },
    };

    let ctx = StoreContext::open(global)?;
    let envelope = analysis::call(&ctx.store, &ctx.config, &method, &raw);
    emit_envelope(&envelope, global.format);
    Ok(())
}

fn list_methods(global: &GlobalOpts) {
    if global.format == OutputFormat::Json {
        let methods: Vec<Value> = METHODS
            .iter()
            .map(|t| {
                json!({
                    "method": t.method,
                    "description": t.description,
                    "params": t.params.iter().map(|p| p.name).collect::<Vec<_>>(),
                })
            })
            .collect();
        print_envelope(&Envelope::success("call.list", json!(methods)), global.format);
        return;
    }
    let width = METHODS.iter().map(|t| t.method.len()).max().unwrap_or(0);
    for table in METHODS {
        println!(
            "{}  {}",
            style(format!("{:<width$}", table.method, width = width)).cyan(),
            table.description
        );
    }
    println!();
    println!(
        "{}",
        style("Run `ims params <method>` to see a method's parameters").dim()
    );
}
