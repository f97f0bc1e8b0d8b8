//! `ims init` command - Initialize a new IMS project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::project::{Project, ProjectError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Force initialization even if .ims/ already exists (rewrites config)
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            tracing::info!(root = %project.root().display(), "initialized project");
            println!(
                "{} Initialized IMS project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Import every sheet of a workbook",
                style("ims import all data/inventory.xlsx").yellow()
            );
            println!(
                "  {} Show stock levels",
                style("ims report inventory").yellow()
            );
            println!(
                "  {} Dashboard KPIs as JSON",
                style("ims call get_dashboard_summary").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} IMS project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("ims init --force").yellow());
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let entries = [
        (".ims/", "configuration and document database"),
        (".ims/config.yaml", "project settings"),
        ("data/", "source workbooks (.xlsx, .csv)"),
        ("exports/", "exported reports"),
    ];
    for (name, what) in entries {
        let marker = if root.join(name.trim_end_matches('/')).exists() {
            style("✓").green()
        } else {
            style("-").dim()
        };
        println!("  {} {:<18} {}", marker, name, style(what).dim());
    }
}
