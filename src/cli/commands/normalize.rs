//! `ims normalize` command - Repair a legacy result into a standard envelope
//!
//! Reads one JSON document from stdin (or `--input`) and prints the
//! normalized envelope. Useful for piping output of older report scripts.

use miette::{IntoDiagnostic, Result};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;

use crate::cli::output::emit_envelope;
use crate::cli::OutputFormat;
use crate::core::envelope::{self, Envelope};
use crate::core::error::ImsError;

#[derive(clap::Args, Debug)]
pub struct NormalizeArgs {
    /// Method name to stamp on the envelope when the input has none
    #[arg(long, short = 'm')]
    pub method: Option<String>,

    /// Read from this file instead of stdin
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,
}

pub fn run(args: NormalizeArgs) -> Result<()> {
    let text = match &args.input {
        Some(path) => std::fs::read_to_string(path).into_diagnostic()?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
            buf
        }
    };

    let value = if text.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str::<Value>(&text) {
            Ok(v) => v,
            Err(e) => {
                let err = ImsError::from(e);
                emit_envelope(
                    &Envelope::from_error(args.method.as_deref(), &err),
                    OutputFormat::Json,
                );
                return Ok(());
            }
        }
    };

    let normalized = envelope::normalize(args.method.as_deref(), value);
    emit_envelope(&normalized, OutputFormat::Json);
    Ok(())
}
