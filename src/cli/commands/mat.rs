//! `ims mat` command - Materials and material code generation

use clap::Subcommand;
use console::style;
use miette::Result;
use serde_json::{json, Value};

use crate::cli::helpers::StoreContext;
use crate::cli::output::{emit_envelope, print_document, RowTable};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::collection::Collection;
use crate::core::crud;
use crate::core::envelope::Envelope;
use crate::core::store::{Document, Filter};
use crate::entities::DocExt;

#[derive(Subcommand, Debug)]
pub enum MatCommands {
    /// List materials
    List(ListArgs),

    /// Show one material by code
    Show(ShowArgs),

    /// Add a material with a generated code
    New(NewArgs),

    /// Print the next free material code without creating anything
    Code(CodeArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Search in every field
    #[arg(long)]
    pub search: Option<String>,

    /// Filter by supplier name (substring)
    #[arg(long)]
    pub supplier: Option<String>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Material code, e.g. P-13-05-0000-002
    pub code: String,
}

/// Classification shared by `new` and `code`
#[derive(clap::Args, Debug, Clone)]
pub struct CodeParts {
    /// P (purchased) or R (in-house)
    #[arg(long, default_value = "P")]
    pub platform: String,

    /// First type digit
    #[arg(long, default_value = "0")]
    pub type1: String,

    /// Second type digit
    #[arg(long, default_value = "0")]
    pub type2: String,

    /// Two-digit supplier code (default: the supplier's assigned code)
    #[arg(long)]
    pub supplier_code: Option<String>,

    /// Supplier name, used to look up the supplier code
    #[arg(long)]
    pub supplier: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Material name
    #[arg(long, short = 'n')]
    pub name: String,

    #[arg(long)]
    pub spec: Option<String>,

    #[arg(long)]
    pub unit: Option<String>,

    #[arg(long)]
    pub price: Option<f64>,

    #[command(flatten)]
    pub parts: CodeParts,
}

#[derive(clap::Args, Debug)]
pub struct CodeArgs {
    #[command(flatten)]
    pub parts: CodeParts,
}

pub fn run(cmd: MatCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MatCommands::List(args) => run_list(args, global),
        MatCommands::Show(args) => run_show(args, global),
        MatCommands::New(args) => run_new(args, global),
        MatCommands::Code(args) => run_code(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let mut filter = Filter::new().with_opt("supplier_name", args.supplier.as_deref());
    if let Some(text) = &args.search {
        filter = filter.search(text.as_str());
    }
    let rows = ctx.store.find(Collection::Materials, &filter)?;
    if args.count {
        println!("{}", rows.len());
        return Ok(());
    }
    if global.format == OutputFormat::Json {
        emit_envelope(&Envelope::success("mat.list", json!(rows)), global.format);
        return Ok(());
    }
    RowTable::new(Collection::Materials.columns(), "material_code", "material").output(
        &rows,
        global.format,
        OutputFormat::Tsv,
    );
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let doc = crud::get(&ctx.store, Collection::Materials, &args.code)?;
    if global.format == OutputFormat::Json {
        emit_envelope(&Envelope::success("mat.show", json!(doc)), global.format);
    } else {
        print_document(&doc, global.format);
    }
    Ok(())
}

/// Supplier code from the flag, else from the named supplier's record
fn resolve_supplier_code(ctx: &StoreContext, parts: &CodeParts) -> Result<String> {
    if let Some(code) = &parts.supplier_code {
        return Ok(code.clone());
    }
    let name = parts.supplier.as_deref().ok_or_else(|| {
        miette::miette!(
            help = "pass --supplier-code, or --supplier for a supplier with an assigned code",
            "no supplier code given"
        )
    })?;
    let supplier = crud::get(&ctx.store, Collection::Suppliers, name)?;
    supplier.text("supplier_code").ok_or_else(|| {
        miette::miette!(
            help = "run `ims sup assign-codes` first",
            "supplier '{}' has no code",
            name
        )
    })
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let mut info = Document::new();
    info.insert("material_name".into(), Value::from(args.name.trim()));
    info.insert("platform".into(), Value::from(args.parts.platform.as_str()));
    info.insert("type1".into(), Value::from(args.parts.type1.as_str()));
    info.insert("type2".into(), Value::from(args.parts.type2.as_str()));
    for (field, value) in [
        ("specification", &args.spec),
        ("unit", &args.unit),
        ("supplier_name", &args.parts.supplier),
        ("supplier_code", &args.parts.supplier_code),
    ] {
        if let Some(v) = value {
            info.insert(field.into(), Value::from(v.as_str()));
        }
    }
    if let Some(price) = args.price {
        info.insert("unit_price".into(), json!(price));
    }

    let saved = crud::add_material(&ctx.store, &info)?;
    if global.format == OutputFormat::Json {
        emit_envelope(&Envelope::success("mat.new", json!(saved)), global.format);
    } else {
        println!(
            "{} Created material {} {}",
            style("✓").green(),
            style(saved.text_or_default("material_code")).cyan(),
            style(saved.text_or_default("material_name")).dim()
        );
    }
    Ok(())
}

fn run_code(args: CodeArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let supplier_code = resolve_supplier_code(&ctx, &args.parts)?;
    let code = crud::generate_material_code(
        &ctx.store,
        &args.parts.platform,
        &args.parts.type1,
        &args.parts.type2,
        &supplier_code,
    )?;
    if global.format == OutputFormat::Json {
        let data = json!({
            "material_code": code.to_string(),
            "prefix": code.prefix(),
            "sequence": code.sequence,
        });
        emit_envelope(&Envelope::success("mat.code", data), global.format);
    } else {
        println!("{}", code);
    }
    Ok(())
}
