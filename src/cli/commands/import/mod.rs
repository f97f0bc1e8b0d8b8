//! `ims import` command - Load workbook sheets or CSV files into collections

mod common;
mod workbook;

use chrono::Utc;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::cli::helpers::StoreContext;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::collection::Collection;
use crate::core::error::{ImsError, ImsResult};
use crate::core::store::{file_hash, DocumentStore, ImportRecord};

pub use common::{ImportOptions, ImportStats};
use workbook::{read_csv, Sheet, SourceKind, Workbook};

/// What to import: one collection, or every collection of a workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportTarget {
    All,
    One(Collection),
}

fn parse_target(s: &str) -> Result<ImportTarget, String> {
    if s.eq_ignore_ascii_case("all") {
        Ok(ImportTarget::All)
    } else {
        Collection::from_str(s).map(ImportTarget::One)
    }
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Collection to import into (suppliers, customers, materials, purchases,
    /// sales, payments, receipts, inventory) or `all`
    #[arg(value_parser = parse_target)]
    pub target: Option<ImportTarget>,

    /// Workbook (.xlsx/.xls/.ods) or CSV file; `all` falls back to the
    /// configured workbook
    pub file: Option<PathBuf>,

    /// Sheet to read (default: the collection's usual sheet, else the first)
    #[arg(long)]
    pub sheet: Option<String>,

    /// 1-based header row (default: first row with two or more cells)
    #[arg(long)]
    pub header_row: Option<usize>,

    /// Parse and report without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Write the good rows even when some rows fail
    #[arg(long)]
    pub skip_errors: bool,

    /// Clear the collection before importing
    #[arg(long)]
    pub replace: bool,

    /// Import even if this exact file was imported before
    #[arg(long)]
    pub force: bool,

    /// Write import statistics as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print a CSV header template for the collection and exit
    #[arg(long)]
    pub template: bool,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    if args.template {
        let collection = match args.target {
            Some(ImportTarget::One(c)) => c,
            _ => {
                return Err(miette::miette!(
                    help = "ims import suppliers --template",
                    "Collection required for template generation"
                ))
            }
        };
        return print_template(collection);
    }

    let target = args.target.ok_or_else(|| {
        miette::miette!("Collection required. Usage: ims import suppliers data/suppliers.csv")
    })?;

    let ctx = StoreContext::open(global)?;
    let file_path = match (&args.file, target) {
        (Some(f), _) => f.clone(),
        (None, ImportTarget::All) => configured_workbook(&ctx).ok_or_else(|| {
            miette::miette!(
                help = "pass a file or set one with `ims config set workbook <path>`",
                "no workbook given"
            )
        })?,
        (None, ImportTarget::One(_)) => {
            return Err(miette::miette!(
                "File required. Usage: ims import suppliers data/suppliers.csv"
            ))
        }
    };
    if !file_path.exists() {
        return Err(miette::miette!("File not found: {}", file_path.display()));
    }

    let human = !global.quiet && global.format != OutputFormat::Json;
    if human {
        println!(
            "{} Importing {} from {}{}",
            style("→").blue(),
            style(match target {
                ImportTarget::All => "all collections",
                ImportTarget::One(c) => c.label(),
            })
            .cyan(),
            style(file_path.display()).yellow(),
            if args.dry_run {
                style(" (dry run)").dim().to_string()
            } else {
                String::new()
            }
        );
    }

    let hash = file_hash(&file_path)?;
    let options = ImportOptions {
        dry_run: args.dry_run,
        skip_errors: args.skip_errors,
        replace: args.replace,
        header_row: args.header_row,
    };

    let results = match target {
        ImportTarget::One(collection) => {
            refuse_duplicate(&ctx.store, &hash, collection, args.force)?;
            let sheet = match SourceKind::from_path(&file_path)? {
                SourceKind::Csv => read_csv(&file_path)?,
                SourceKind::Workbook => {
                    let mut book = Workbook::open(&file_path)?;
                    let name = book.pick_sheet(args.sheet.as_deref(), collection)?;
                    book.read_sheet(&name)?
                }
            };
            let stats = import_sheet(&ctx.store, collection, &sheet, &options, &hash, &file_path)?;
            vec![stats]
        }
        ImportTarget::All => {
            if SourceKind::from_path(&file_path)? != SourceKind::Workbook {
                return Err(miette::miette!(
                    help = "import CSV files one collection at a time",
                    "`ims import all` needs a workbook, not a CSV file"
                ));
            }
            let mut book = Workbook::open(&file_path)?;
            let present: Vec<Collection> = Collection::ALL
                .into_iter()
                .filter(|c| book.has_sheet(c.default_sheet()))
                .collect();
            if present.is_empty() {
                return Err(miette::miette!(
                    "no known sheets in {} (found: {})",
                    file_path.display(),
                    book.sheet_names().join(", ")
                ));
            }
            for c in &present {
                refuse_duplicate(&ctx.store, &hash, *c, args.force)?;
            }
            // Every sheet is read before anything is written
            let mut sheets = Vec::with_capacity(present.len());
            for collection in present {
                let name = book.pick_sheet(None, collection)?;
                sheets.push((collection, book.read_sheet(&name)?));
            }
            import_workbook(&ctx.store, &sheets, &options, &hash, &file_path)?
        }
    };

    if let Some(path) = &args.report {
        write_report(path, &file_path, &hash, args.dry_run, &results)?;
        if human {
            println!(
                "{} Wrote import report to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
    }

    if global.format == OutputFormat::Json {
        let json = serde_json::to_string_pretty(&results).into_diagnostic()?;
        println!("{}", json);
    } else if human {
        for stats in &results {
            print_summary(stats);
        }
        if args.dry_run {
            println!();
            println!("{}", style("Dry run complete. Nothing was written.").yellow());
        }
    }

    let errors: usize = results.iter().map(|s| s.errors).sum();
    if errors > 0 && !args.skip_errors {
        let written = match target {
            ImportTarget::All => "nothing was written",
            ImportTarget::One(_) => "the sheet was not written",
        };
        return Err(miette::miette!(
            help = "fix the rows listed above or rerun with --skip-errors",
            "Import found {} bad row(s); {}",
            errors,
            written
        ));
    }
    Ok(())
}

fn configured_workbook(ctx: &StoreContext) -> Option<PathBuf> {
    let raw = ctx.config.workbook.as_deref()?;
    let path = PathBuf::from(raw);
    match &ctx.project {
        Some(p) if path.is_relative() => Some(p.root().join(path)),
        _ => Some(path),
    }
}

fn refuse_duplicate(
    store: &DocumentStore,
    hash: &str,
    collection: Collection,
    force: bool,
) -> Result<()> {
    if force {
        return Ok(());
    }
    if let Some(previous) = store.last_import_for_hash(hash, collection)? {
        return Err(miette::miette!(
            help = "rerun with --force to import it again",
            "{} was already imported into {} at {} ({} rows)",
            previous.file_path,
            collection,
            previous.imported_at,
            previous.rows_imported
        ));
    }
    Ok(())
}

/// Parse one sheet and, unless this is a dry run (or rows failed without
/// --skip-errors), write it together with its import log entry
fn import_sheet(
    store: &DocumentStore,
    collection: Collection,
    sheet: &Sheet,
    options: &ImportOptions,
    hash: &str,
    file_path: &Path,
) -> ImsResult<ImportStats> {
    let _span =
        tracing::info_span!("import", collection = %collection, sheet = %sheet.name).entered();
    let mut stats = ImportStats::new(collection, &sheet.name);
    let key_prefix = &hash[..hash.len().min(12)];
    let mut docs = common::build_documents(collection, sheet, options, key_prefix, &mut stats)?;

    if collection == Collection::PurchaseInbound {
        stats.materials_matched = common::match_materials(store, &mut docs)?;
    }
    for issue in &stats.mapping_issues {
        tracing::warn!(issue = %issue, "header mapping");
    }

    let blocked = stats.errors > 0 && !options.skip_errors;
    if options.dry_run || blocked {
        stats.skipped += docs.len();
        return Ok(stats);
    }

    store.transaction(|s| {
        common::write_documents(s, collection, docs, options.replace, &mut stats)?;
        s.record_import(&ImportRecord {
            file_hash: hash.to_string(),
            file_path: file_path.display().to_string(),
            collection: collection.as_str().to_string(),
            rows_imported: stats.imported(),
            imported_at: Utc::now().to_rfc3339(),
        })
    })?;
    tracing::info!(created = stats.created, updated = stats.updated, "imported sheet");
    Ok(stats)
}

/// Import every sheet of a workbook in one transaction. A sheet with bad
/// rows (without --skip-errors) or a failed write rolls back the whole run,
/// so either every sheet lands with its import log entry or none does.
fn import_workbook(
    store: &DocumentStore,
    sheets: &[(Collection, Sheet)],
    options: &ImportOptions,
    hash: &str,
    file_path: &Path,
) -> ImsResult<Vec<ImportStats>> {
    let mut results = Vec::with_capacity(sheets.len());
    let mut blocked = false;
    let outcome = store.transaction(|s| {
        for (collection, sheet) in sheets {
            results.push(import_sheet(s, *collection, sheet, options, hash, file_path)?);
        }
        match results.iter().find(|r| r.errors > 0 && !options.skip_errors) {
            Some(bad) => {
                blocked = true;
                Err(ImsError::Import(format!(
                    "{} has {} bad row(s)",
                    bad.sheet, bad.errors
                )))
            }
            None => Ok(()),
        }
    });
    match outcome {
        Ok(()) => Ok(results),
        Err(ImsError::Import(reason)) if blocked => {
            tracing::warn!(%reason, "workbook import rolled back");
            for stats in &mut results {
                stats.skipped += stats.created + stats.updated;
                stats.created = 0;
                stats.updated = 0;
            }
            Ok(results)
        }
        Err(e) => Err(e),
    }
}

fn write_report(
    path: &Path,
    file_path: &Path,
    hash: &str,
    dry_run: bool,
    results: &[ImportStats],
) -> Result<()> {
    let report = json!({
        "file": file_path.display().to_string(),
        "file_hash": hash,
        "dry_run": dry_run,
        "generated_at": Utc::now().to_rfc3339(),
        "collections": results,
    });
    let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
    std::fs::write(path, json).into_diagnostic()?;
    Ok(())
}

fn print_summary(stats: &ImportStats) {
    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "{} {}",
        style("Import Summary").bold(),
        style(format!("{} ← {}", stats.collection, stats.sheet)).dim()
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  Header row:       {}", stats.header_row);
    println!("  Rows processed:   {}", style(stats.rows_processed).cyan());
    println!("  Created:          {}", style(stats.created).green());
    if stats.updated > 0 {
        println!("  Updated:          {}", style(stats.updated).yellow());
    }
    if stats.skipped > 0 {
        println!("  Skipped:          {}", style(stats.skipped).dim());
    }
    if stats.materials_matched > 0 {
        println!("  Materials matched: {}", style(stats.materials_matched).cyan());
    }
    if stats.errors > 0 {
        println!("  Errors:           {}", style(stats.errors).red());
        for msg in &stats.error_messages {
            println!("    {} {}", style("✗").red(), msg);
        }
    }
    if !stats.mapping_issues.is_empty() {
        println!("  Mapping issues:   {}", style(stats.mapping_issues.len()).yellow());
        for msg in &stats.mapping_issues {
            println!("    {} {}", style("!").yellow(), msg);
        }
    }
    if !stats.date_issues.is_empty() {
        println!("  Date issues:      {}", style(stats.date_issues.len()).yellow());
        for msg in &stats.date_issues {
            println!("    {} {}", style("!").yellow(), msg);
        }
    }
}

fn print_template(collection: Collection) -> Result<()> {
    println!("{}", common::template_headers(collection).join(","));
    eprintln!();
    eprintln!(
        "{} Template generated. Redirect to file: ims import {} --template > {}.csv",
        style("→").blue(),
        collection,
        collection
    );
    Ok(())
}
