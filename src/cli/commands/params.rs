//! `ims params` command - Inspect and check method parameters

use console::style;
use miette::Result;
use serde_json::{json, Value};
use tabled::{builder::Builder, settings::Style};

use crate::cli::output::{emit_envelope, print_envelope};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::envelope::Envelope;
use crate::core::error::{ImsError, ImsResult};
use crate::core::params::{validate_method_params, ParamDefault, ParamSpec, ParamTable, METHODS};

#[derive(clap::Args, Debug)]
pub struct ParamsArgs {
    /// Method whose parameters to show or check
    #[arg(required_unless_present = "list")]
    pub method: Option<String>,

    /// Check these parameters (JSON object) and print the cleaned result
    #[arg(long, short = 'p')]
    pub params: Option<String>,

    /// List every method with its parameter names
    #[arg(long)]
    pub list: bool,
}

pub fn run(args: ParamsArgs, global: &GlobalOpts) -> Result<()> {
    if args.list {
        print_all(global);
        return Ok(());
    }
    let method = args.method.as_deref().map(str::trim).unwrap_or_default();

    match args.params.as_deref() {
        Some(text) => {
            let method_name = format!("params.{}", method);
            let envelope = match check(method, text) {
                Ok(cleaned) => Envelope::success(method_name, cleaned),
                Err(e) => Envelope::from_error(Some(method_name.as_str()), &e),
            };
            emit_envelope(&envelope, global.format);
            Ok(())
        }
        None => {
            let table = ParamTable::for_method(method)
                .ok_or_else(|| ImsError::UnknownMethod(method.to_string()))?;
            describe(table, global);
            Ok(())
        }
    }
}

/// Validate a raw JSON parameter object for `method`
fn check(method: &str, text: &str) -> ImsResult<Value> {
    let raw: Value = if text.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(text)?
    };
    Ok(Value::Object(validate_method_params(method, &raw)?))
}

fn default_text(default: ParamDefault) -> String {
    match default {
        ParamDefault::None => String::new(),
        ParamDefault::Int(i) => i.to_string(),
        ParamDefault::Number(n) => n.to_string(),
        ParamDefault::Text(s) => s.to_string(),
        ParamDefault::List(items) => items.join(","),
        ParamDefault::Today => "today".to_string(),
    }
}

fn constraint_text(spec: &ParamSpec) -> String {
    if !spec.allowed.is_empty() {
        return spec.allowed.join(" | ");
    }
    match (spec.min, spec.max) {
        (Some(lo), Some(hi)) => format!("{}..{}", lo, hi),
        (Some(lo), None) => format!(">= {}", lo),
        (None, Some(hi)) => format!("<= {}", hi),
        (None, None) => String::new(),
    }
}

fn spec_json(spec: &ParamSpec) -> Value {
    json!({
        "name": spec.name,
        "type": spec.kind.to_string(),
        "default": default_text(spec.default),
        "constraint": constraint_text(spec),
        "help": spec.help,
    })
}

fn describe(table: &ParamTable, global: &GlobalOpts) {
    if global.format == OutputFormat::Json {
        let data = json!({
            "method": table.method,
            "description": table.description,
            "params": table.params.iter().map(spec_json).collect::<Vec<_>>(),
        });
        print_envelope(&Envelope::success("params.describe", data), global.format);
        return;
    }

    println!("{} {}", style(table.method).cyan().bold(), style(table.description).dim());
    println!();
    if table.params.is_empty() {
        println!("{}", style("(no parameters)").dim());
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["Name", "Type", "Default", "Allowed", "Description"]);
    for spec in table.params {
        builder.push_record([
            spec.name.to_string(),
            spec.kind.to_string(),
            default_text(spec.default),
            constraint_text(spec),
            spec.help.to_string(),
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));
}

fn print_all(global: &GlobalOpts) {
    if global.format == OutputFormat::Json {
        let data: Vec<Value> = METHODS
            .iter()
            .map(|t| {
                let params: Vec<Value> = t.params.iter().map(spec_json).collect();
                json!({"method": t.method, "params": params})
            })
            .collect();
        print_envelope(&Envelope::success("params.list", json!(data)), global.format);
        return;
    }
    for table in METHODS {
        let names: Vec<&str> = table.params.iter().map(|p| p.name).collect();
        println!(
            "{}  {}",
            style(table.method).cyan(),
            if names.is_empty() {
                style("-".to_string()).dim().to_string()
            } else {
                names.join(", ")
            }
        );
    }
}
