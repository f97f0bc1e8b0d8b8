//! `ims status` command - Project and database overview

use console::style;
use miette::Result;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::helpers::StoreContext;
use crate::cli::output::emit_envelope;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::envelope::Envelope;
use crate::core::project::Project;

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// How many recent imports to show
    #[arg(long, default_value = "5")]
    pub imports: usize,
}

pub fn run(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = StoreContext::open(global)?;
    let counts = ctx.store.collection_counts()?;
    let imports = ctx.store.recent_imports(args.imports)?;
    let data_dir = ctx.config.data_dir(ctx.project.as_ref());
    let sources: Vec<PathBuf> = data_dir
        .as_deref()
        .filter(|d| d.is_dir())
        .map(|d| Project::iter_source_files(d).collect())
        .unwrap_or_default();

    if global.format == OutputFormat::Json {
        let data = json!({
            "project": ctx.project.as_ref().map(|p| p.root().display().to_string()),
            "database": ctx.store.target().to_string(),
            "collections": counts
                .iter()
                .map(|(c, n)| (c.as_str().to_string(), json!(n)))
                .collect::<serde_json::Map<_, _>>(),
            "recent_imports": imports,
            "data_dir": data_dir.as_ref().map(|d| d.display().to_string()),
            "source_files": sources.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        });
        emit_envelope(&Envelope::success("status", data), global.format);
        return Ok(());
    }

    let width = 60;
    println!("{}", style("IMS Status").bold().underlined());
    println!("{}", "═".repeat(width));
    match &ctx.project {
        Some(p) => println!("{}: {}", style("Project").bold(), p.root().display()),
        None => println!(
            "{}: {}",
            style("Project").bold(),
            style("(none; run `ims init`)").dim()
        ),
    }
    println!("{}: {}", style("Database").bold(), ctx.store.target());
    println!();

    println!("{}", style("COLLECTIONS").bold());
    println!("{:-<width$}", "");
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    for (collection, n) in &counts {
        let shown = if *n == 0 {
            style(n.to_string()).dim()
        } else {
            style(n.to_string()).cyan()
        };
        println!("  {:<20} {:>8}", collection.label(), shown);
    }
    println!("  {:<20} {:>8}", style("Total").bold(), total);
    println!();

    println!("{}", style("RECENT IMPORTS").bold());
    println!("{:-<width$}", "");
    if imports.is_empty() {
        println!("  {}", style("No imports yet").dim());
    }
    for record in &imports {
        println!(
            "  {}  {:<18} {:>6} rows  {}",
            style(&record.imported_at).dim(),
            record.collection,
            record.rows_imported,
            record.file_path
        );
    }

    if let Some(dir) = &data_dir {
        println!();
        println!("{} ({})", style("SOURCE FILES").bold(), dir.display());
        println!("{:-<width$}", "");
        if sources.is_empty() {
            println!("  {}", style("No workbooks found").dim());
        }
        for path in &sources {
            let shown = path.strip_prefix(dir).unwrap_or(path);
            println!("  {}", shown.display());
        }
    }
    Ok(())
}
