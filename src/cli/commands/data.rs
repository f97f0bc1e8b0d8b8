//! `ims data` command - Generic CRUD over any collection
//!
//! With `--format json` every subcommand prints a standard envelope; other
//! formats print tables or YAML for people.

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::Result;
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::cli::helpers::{build_document, parse_collection, StoreContext};
use crate::cli::output::{emit_envelope, print_document, RowTable};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::collection::Collection;
use crate::core::crud;
use crate::core::envelope::Envelope;
use crate::core::error::ImsResult;
use crate::core::export;
use crate::core::paginate::Paginator;
use crate::core::store::Filter;

#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// List documents with filtering and paging
    List(ListArgs),

    /// Show one document by key
    Get(KeyArgs),

    /// Create a document
    Create(WriteArgs),

    /// Update fields of a document (`field=null` removes a field)
    Update(UpdateArgs),

    /// Delete a document
    Delete(DeleteArgs),

    /// Export matching documents to .csv, .xlsx or .json
    Export(ExportArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct FilterArgs {
    /// Field filter as field=value (repeatable; text matches substrings)
    #[arg(long = "filter", short = 'w', value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,

    /// Search every field for this text
    #[arg(long)]
    pub search: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<Filter> {
        let mut filter = Filter::new();
        for pair in &self.filters {
            let (field, needle) = pair
                .split_once('=')
                .ok_or_else(|| miette::miette!("expected field=value, got '{}'", pair))?;
            filter = filter.with(field.trim(), needle);
        }
        if let Some(text) = &self.search {
            filter = filter.search(text.as_str());
        }
        Ok(filter)
    }
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Collection (suppliers, customers, materials, purchases, sales, ...)
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: i64,

    /// Rows per page (default from config)
    #[arg(long)]
    pub page_size: Option<i64>,

    /// Columns to display (default: the collection's usual columns)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct KeyArgs {
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    /// Document key (supplier name, material code, record number, ...)
    pub key: String,
}

#[derive(clap::Args, Debug)]
pub struct WriteArgs {
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    /// Document as a JSON object
    #[arg(long)]
    pub data: Option<String>,

    /// Field value as field=value (repeatable; applied after --data)
    #[arg(long = "set", short = 's', value_name = "FIELD=VALUE")]
    pub sets: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    pub key: String,

    /// Patch as a JSON object
    #[arg(long)]
    pub data: Option<String>,

    #[arg(long = "set", short = 's', value_name = "FIELD=VALUE")]
    pub sets: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    pub key: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    /// Output file; format follows the extension
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Columns to write (default: every field seen)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,
}

pub fn run(cmd: DataCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DataCommands::List(args) => run_list(args, global),
        DataCommands::Get(args) => run_get(args, global),
        DataCommands::Create(args) => run_create(args, global),
        DataCommands::Update(args) => run_update(args, global),
        DataCommands::Delete(args) => run_delete(args, global),
        DataCommands::Export(args) => run_export(args, global),
    }
}

/// In JSON mode wrap the result in an envelope; otherwise surface errors
/// as diagnostics
fn finish<T>(
    global: &GlobalOpts,
    method: &str,
    result: ImsResult<T>,
    to_json: impl FnOnce(&T) -> Value,
    human: impl FnOnce(T),
) -> Result<()> {
    if global.format == OutputFormat::Json {
        let envelope = match &result {
            Ok(value) => Envelope::success(method, to_json(value)),
            Err(e) => Envelope::from_error(Some(method), e),
        };
        emit_envelope(&envelope, global.format);
        return Ok(());
    }
    human(result?);
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let filter = args.filter.to_filter()?;
    let page_size = args
        .page_size
        .unwrap_or(ctx.config.default_page_size() as i64);
    let paginator = Paginator::with_max(args.page, page_size, ctx.config.max_page_size());
    let collection = args.collection;

    if args.count {
        let total = ctx.store.find(collection, &filter)?.len();
        println!("{}", total);
        return Ok(());
    }

    let (rows, info) = crud::list(&ctx.store, collection, &filter, paginator)?;
    if global.format == OutputFormat::Json {
        let envelope = Envelope::success(format!("data.list.{}", collection), json!(rows))
            .with_pagination(info);
        emit_envelope(&envelope, global.format);
        return Ok(());
    }

    let columns: Vec<String> = if args.columns.is_empty() {
        collection.columns().iter().map(|c| c.to_string()).collect()
    } else {
        args.columns.clone()
    };
    RowTable::new(&columns, collection.key_field(), "document").output(
        &rows,
        global.format,
        OutputFormat::Tsv,
    );
    if matches!(global.format, OutputFormat::Auto | OutputFormat::Tsv) && info.total_pages > 1 {
        println!(
            "{}",
            style(format!(
                "page {} of {} ({}-{} of {}); use --page to see more",
                info.current_page,
                info.total_pages,
                info.start_index,
                info.end_index,
                info.total_count
            ))
            .dim()
        );
    }
    Ok(())
}

fn run_get(args: KeyArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let result = crud::get(&ctx.store, args.collection, &args.key);
    finish(
        global,
        &format!("data.get.{}", args.collection),
        result,
        |doc| json!(doc),
        |doc| print_document(&doc, global.format),
    )
}

fn run_create(args: WriteArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let doc = build_document(args.data.as_deref(), &args.sets)?;
    let result = crud::create(&ctx.store, args.collection, &doc);
    finish(
        global,
        &format!("data.create.{}", args.collection),
        result,
        |(_, saved)| json!(saved),
        |(key, _)| {
            println!(
                "{} Created {} {}",
                style("✓").green(),
                args.collection.label(),
                style(key).cyan()
            );
        },
    )
}

fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let patch = build_document(args.data.as_deref(), &args.sets)?;
    let result = crud::update(&ctx.store, args.collection, &args.key, &patch);
    finish(
        global,
        &format!("data.update.{}", args.collection),
        result,
        |doc| json!(doc),
        |doc| {
            println!(
                "{} Updated {} {}",
                style("✓").green(),
                args.collection.label(),
                style(&args.key).cyan()
            );
            if !global.quiet {
                print_document(&doc, global.format);
            }
        },
    )
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let interactive = global.format != OutputFormat::Json && console::user_attended();
    if !args.yes && interactive {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete {} '{}'?", args.collection, args.key))
            .default(false)
            .interact()
            .map_err(|e| miette::miette!("{}", e))?;
        if !confirmed {
            println!("{}", style("Cancelled").dim());
            return Ok(());
        }
    }
    let result = crud::delete(&ctx.store, args.collection, &args.key);
    finish(
        global,
        &format!("data.delete.{}", args.collection),
        result,
        |_| json!({ "deleted": args.key }),
        |_| {
            println!(
                "{} Deleted {} {}",
                style("✓").green(),
                args.collection.label(),
                style(&args.key).cyan()
            );
        },
    )
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let filter = args.filter.to_filter()?;
    let rows = ctx.store.find(args.collection, &filter)?;
    let written = export::export_rows(&args.output, &args.columns, &rows)?;
    if global.format == OutputFormat::Json {
        let envelope = Envelope::success(
            format!("data.export.{}", args.collection),
            json!({ "path": args.output.display().to_string(), "rows": written }),
        );
        emit_envelope(&envelope, global.format);
    } else if !global.quiet {
        println!(
            "{} Exported {} row(s) to {}",
            style("✓").green(),
            style(written).cyan(),
            style(args.output.display()).cyan()
        );
    }
    Ok(())
}
