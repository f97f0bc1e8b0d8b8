//! `ims sup` command - Supplier management

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use miette::{IntoDiagnostic, Result};
use serde_json::{json, Value};

use crate::cli::helpers::{build_document, StoreContext};
use crate::cli::output::{emit_envelope, RowTable};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::collection::Collection;
use crate::core::crud;
use crate::core::envelope::Envelope;
use crate::core::store::{Document, Filter};
use crate::entities::party::{plan_supplier_codes, Supplier, MAX_SUPPLIER_CODE};
use crate::entities::DocExt;
use crate::reports::reconciliation::{balances, Ledger};
use crate::reports::ReportQuery;

#[derive(Subcommand, Debug)]
pub enum SupCommands {
    /// List suppliers with filtering
    List(ListArgs),

    /// Create a new supplier
    New(NewArgs),

    /// Show a supplier with its purchase/payment balance
    Show(ShowArgs),

    /// Set supplier fields
    Edit(EditArgs),

    /// Assign two-digit codes 01..99 to suppliers sorted by name
    AssignCodes(AssignCodesArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Search in every field
    #[arg(long)]
    pub search: Option<String>,

    /// Only suppliers without a code
    #[arg(long)]
    pub uncoded: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Supplier name (required)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Two-digit supplier code
    #[arg(long)]
    pub code: Option<String>,

    #[arg(long)]
    pub contact: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long)]
    pub address: Option<String>,

    /// Interactive mode (prompt for fields)
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Supplier name
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Supplier name
    pub name: String,

    /// Field value as field=value (repeatable)
    #[arg(long = "set", short = 's', value_name = "FIELD=VALUE", required = true)]
    pub sets: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct AssignCodesArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Show the plan without writing
    #[arg(long)]
    pub dry_run: bool,
}

/// Run a supplier subcommand
pub fn run(cmd: SupCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SupCommands::List(args) => run_list(args, global),
        SupCommands::New(args) => run_new(args, global),
        SupCommands::Show(args) => run_show(args, global),
        SupCommands::Edit(args) => run_edit(args, global),
        SupCommands::AssignCodes(args) => run_assign_codes(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let filter = match &args.search {
        Some(text) => Filter::new().search(text.as_str()),
        None => Filter::new(),
    };
    let mut rows: Vec<Document> = ctx
        .store
        .find(Collection::Suppliers, &filter)?
        .into_iter()
        .filter(|d| !args.uncoded || d.text("supplier_code").is_none())
        .collect();
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }

    if args.count {
        println!("{}", rows.len());
        return Ok(());
    }
    if global.format == OutputFormat::Json {
        emit_envelope(&Envelope::success("sup.list", json!(rows)), global.format);
        return Ok(());
    }
    RowTable::new(Collection::Suppliers.columns(), "supplier_name", "supplier").output(
        &rows,
        global.format,
        OutputFormat::Tsv,
    );
    Ok(())
}

fn prompt(label: &str, initial: Option<String>, required: bool) -> Result<Option<String>> {
    let theme = ColorfulTheme::default();
    let mut input = Input::<String>::with_theme(&theme)
        .with_prompt(label)
        .allow_empty(!required);
    if let Some(v) = initial {
        input = input.with_initial_text(v);
    }
    let value = input.interact_text().into_diagnostic()?;
    Ok(Some(value.trim().to_string()).filter(|v| !v.is_empty()))
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let (name, code, contact, phone, address) = if args.interactive {
        (
            prompt("Supplier name", args.name, true)?,
            prompt("Supplier code (01-99, blank to assign later)", args.code, false)?,
            prompt("Contact person", args.contact, false)?,
            prompt("Phone", args.phone, false)?,
            prompt("Address", args.address, false)?,
        )
    } else {
        (args.name, args.code, args.contact, args.phone, args.address)
    };
    let name = name.ok_or_else(|| {
        miette::miette!("Supplier name required. Usage: ims sup new --name \"ACME Ltd\"")
    })?;

    let mut doc = Document::new();
    doc.insert("supplier_name".into(), Value::from(name));
    for (field, value) in [
        ("supplier_code", code),
        ("contact_person", contact),
        ("phone", phone),
        ("address", address),
    ] {
        if let Some(v) = value {
            doc.insert(field.into(), Value::from(v));
        }
    }

    let (key, saved) = crud::create(&ctx.store, Collection::Suppliers, &doc)?;
    if global.format == OutputFormat::Json {
        emit_envelope(&Envelope::success("sup.new", json!(saved)), global.format);
    } else {
        println!(
            "{} Created supplier {}",
            style("✓").green(),
            style(key).cyan()
        );
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let doc = crud::get(&ctx.store, Collection::Suppliers, &args.name)?;
    let supplier = Supplier::from_doc(&doc)
        .ok_or_else(|| miette::miette!("supplier '{}' has no name field", args.name))?;

    let query = ReportQuery {
        party: Some(supplier.supplier_name.clone()),
        ..ReportQuery::default()
    };
    let balance = balances(&ctx.store, Ledger::Suppliers, &query)?
        .into_iter()
        .find(|b| b.party == supplier.supplier_name);

    match global.format {
        OutputFormat::Json => {
            let mut data = json!(supplier);
            if let Some(b) = &balance {
                data["balance"] = json!({
                    "purchase_amount": b.line_amount,
                    "purchase_count": b.line_count,
                    "payment_amount": b.cash_amount,
                    "payment_count": b.cash_count,
                    "balance": b.balance(),
                    "status": b.status(),
                });
            }
            emit_envelope(&Envelope::success("sup.show", data), global.format);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&doc).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", supplier.supplier_name),
        _ => {
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("Name").bold(), style(&supplier.supplier_name).yellow());
            println!(
                "{}: {}",
                style("Code").bold(),
                supplier.supplier_code.as_deref().map_or_else(
                    || style("(unassigned)".to_string()).dim(),
                    |c| style(c.to_string()).cyan()
                )
            );
            for (label, value) in [
                ("Contact", &supplier.contact_person),
                ("Phone", &supplier.phone),
                ("Address", &supplier.address),
                ("Credit code", &supplier.credit_code),
            ] {
                if let Some(v) = value {
                    println!("{}: {}", style(label).bold(), v);
                }
            }
            println!("{}", style("─".repeat(60)).dim());
            if let Some(b) = balance {
                println!();
                println!("{}:", style("Account").bold());
                println!("  Purchases: {:>12.2} ({} lines)", b.line_amount, b.line_count);
                println!("  Payments:  {:>12.2} ({} payments)", b.cash_amount, b.cash_count);
                let shown = format!("{:>12.2}", b.balance());
                let styled = if b.balance() < 0.0 {
                    style(shown).magenta()
                } else {
                    style(shown).cyan()
                };
                println!("  Balance:   {} {}", styled, style(b.status()).dim());
            }
        }
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let patch = build_document(None, &args.sets)?;
    let doc = crud::update(&ctx.store, Collection::Suppliers, &args.name, &patch)?;
    if global.format == OutputFormat::Json {
        emit_envelope(&Envelope::success("sup.edit", json!(doc)), global.format);
    } else {
        println!(
            "{} Updated supplier {}",
            style("✓").green(),
            style(&args.name).cyan()
        );
    }
    Ok(())
}

fn run_assign_codes(args: AssignCodesArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let names: Vec<String> = ctx
        .store
        .all(Collection::Suppliers)?
        .iter()
        .filter_map(|d| d.text("supplier_name"))
        .collect();
    if names.is_empty() {
        println!("{}", style("No suppliers on file").dim());
        return Ok(());
    }
    let total = names.len();
    let plan = plan_supplier_codes(names);
    let json_mode = global.format == OutputFormat::Json;

    if !json_mode {
        println!(
            "{} {} supplier(s) will be coded {}..{}",
            style("→").blue(),
            style(plan.len()).cyan(),
            style("01").cyan(),
            style(format!("{:02}", plan.len())).cyan()
        );
        if total > MAX_SUPPLIER_CODE {
            println!(
                "{} {} supplier(s) beyond the first {} will get no code",
                style("!").yellow(),
                total - MAX_SUPPLIER_CODE,
                MAX_SUPPLIER_CODE
            );
        }
        if args.dry_run {
            for (name, code) in &plan {
                println!("  {}  {}", style(code).cyan(), name);
            }
            return Ok(());
        }
    }

    // Existing codes are overwritten, so ask first
    if !args.yes && !args.dry_run && !json_mode && console::user_attended() {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Reassign all supplier codes?")
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("{}", style("Cancelled").dim());
            return Ok(());
        }
    }

    let outcome = if args.dry_run {
        crud::SupplierCodeAssignment {
            assigned: plan,
            skipped: Vec::new(),
        }
    } else {
        crud::assign_supplier_codes(&ctx.store)?
    };

    if json_mode {
        let data = json!({
            "assigned": outcome
                .assigned
                .iter()
                .map(|(name, code)| json!({"supplier_name": name, "supplier_code": code}))
                .collect::<Vec<_>>(),
            "skipped": outcome.skipped,
            "dry_run": args.dry_run,
        });
        emit_envelope(&Envelope::success("sup.assign_codes", data), global.format);
    } else {
        println!(
            "{} Assigned {} supplier code(s)",
            style("✓").green(),
            style(outcome.assigned.len()).cyan()
        );
    }
    Ok(())
}
