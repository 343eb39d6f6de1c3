use std::fmt;
use std::fs::File;
use std::io::{self as stdio, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;

use kmbio::Structure;
use kmbio::io::{
    Format, MmcifParser, NotDisordered, Parser, PdbParser, PdbWriter, SaveOptions, SelectAll,
    open_url, resolve_url,
};

pub mod compare;
pub mod convert;
pub mod info;
pub mod superpose;

/// Formats supported by the CLI when reading structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StructureFormat {
    /// Legacy PDB format.
    #[value(name = "pdb")]
    Pdb,
    /// mmCIF format.
    #[value(name = "mmcif")]
    Mmcif,
}

impl StructureFormat {
    /// Attempts to infer a format from a file name or URL, looking through `.gz`.
    pub fn from_name(name: &str) -> Option<Self> {
        match Format::from_name(&resolve_url(name))? {
            Format::Pdb => Some(Self::Pdb),
            Format::Mmcif => Some(Self::Mmcif),
        }
    }
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureFormat::Pdb => write!(f, "PDB"),
            StructureFormat::Mmcif => write!(f, "mmCIF"),
        }
    }
}

/// Aggregated IO parameters shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct IoParameters {
    /// Path, URL or `rcsb://`-style route.
    pub input: Option<String>,
    pub output: Option<PathBuf>,
    pub input_format: Option<StructureFormat>,
    /// Fail on malformed records instead of warning.
    pub strict: bool,
    /// Keep mmCIF label chain ids instead of author ids.
    pub label_ids: bool,
}

/// Loads a structure (or one of its assemblies) from the configured input source.
pub fn load_input(params: &IoParameters, bioassembly: usize) -> Result<Structure> {
    match &params.input {
        Some(source) => load_source(source, params, bioassembly),
        None => {
            let stdin = stdio::stdin();
            if stdin.is_terminal() {
                bail!(
                    "No --input provided and stdin is a TTY. Provide -i/--input or pipe a structure into kmbio."
                );
            }
            let format = params.input_format.unwrap_or(StructureFormat::Pdb);
            let reader = BufReader::new(stdin.lock());
            read_structure(reader, format, params, bioassembly)
                .with_context(|| format!("Failed to parse {} input from stdin", format))
        }
    }
}

/// Loads a structure from a path, URL or route with the shared parser settings.
pub fn load_source(source: &str, params: &IoParameters, bioassembly: usize) -> Result<Structure> {
    let format = match params.input_format {
        Some(explicit) => explicit,
        None => StructureFormat::from_name(source).ok_or_else(|| {
            anyhow!("Unable to infer input format from '{source}'. Please specify --format.")
        })?,
    };
    let reader = open_url(source).with_context(|| format!("Failed to open {source}"))?;
    read_structure(reader, format, params, bioassembly)
        .with_context(|| format!("Failed to parse {} input from {}", format, source))
}

fn read_structure<R: BufRead>(
    reader: R,
    format: StructureFormat,
    params: &IoParameters,
    bioassembly: usize,
) -> Result<Structure> {
    let permissive = !params.strict;
    let structure = match format {
        StructureFormat::Pdb => {
            PdbParser::new(permissive).get_structure(reader, None, bioassembly)?
        }
        StructureFormat::Mmcif => MmcifParser {
            use_auth_id: !params.label_ids,
            permissive,
        }
        .get_structure(reader, None, bioassembly)?,
    };
    Ok(structure)
}

/// Writes a structure as PDB to the configured output destination.
pub fn save_output(
    structure: &Structure,
    params: &IoParameters,
    writer: &PdbWriter,
    options: &SaveOptions,
    include_disordered: bool,
) -> Result<()> {
    match params.output.as_deref() {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let mut out = BufWriter::new(file);
            write_pdb(&mut out, structure, writer, options, include_disordered)
                .with_context(|| format!("Failed to write PDB output to {}", path.display()))?;
            out.flush().context("Failed to flush output writer")?;
        }
        None => {
            let stdout = stdio::stdout();
            let mut out = BufWriter::new(stdout.lock());
            write_pdb(&mut out, structure, writer, options, include_disordered)
                .context("Failed to write PDB output to stdout")?;
            out.flush().context("Failed to flush stdout")?;
        }
    }
    Ok(())
}

fn write_pdb<W: Write>(
    out: &mut W,
    structure: &Structure,
    writer: &PdbWriter,
    options: &SaveOptions,
    include_disordered: bool,
) -> Result<()> {
    if include_disordered {
        writer.write(out, structure, &SelectAll, options)?;
    } else {
        writer.write(out, structure, &NotDisordered, options)?;
    }
    Ok(())
}

/// Wraps long-running operations with a spinner rendered to stderr.
pub fn run_with_spinner<T, F>(message: &str, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());

    let result = work();

    match &result {
        Ok(_) => spinner.finish_with_message(format!("{} ✓", message)),
        Err(_) => spinner.abandon_with_message(format!("{} ✗", message)),
    }

    result
}

/// Returns true when stdout is a TTY and no explicit output file was supplied.
pub fn interactive_stdout_requested(params: &IoParameters) -> bool {
    params.output.is_none() && stdio::stdout().is_terminal()
}

/// Ensures commands do not dump structured output directly into an interactive terminal.
pub fn ensure_noninteractive_stdout(command: &str, params: &IoParameters) -> Result<()> {
    if interactive_stdout_requested(params) {
        bail!(
            "Refusing to stream {command} results to an interactive terminal. Use -o/--output or pipe the command into a file."
        );
    }
    Ok(())
}

/// Draws a framed section title.
pub fn print_boxed_label<W: Write>(writer: &mut W, title: &str) -> stdio::Result<()> {
    let inner = format!(" {title} ");
    let width = inner.chars().count();
    writeln!(writer, "╭{}╮", "─".repeat(width))?;
    writeln!(writer, "│{}│", inner)?;
    writeln!(writer, "╰{}╯", "─".repeat(width))?;
    Ok(())
}

/// Display form of an optional path, for reports.
pub fn describe_output(path: Option<&Path>) -> String {
    path.map_or_else(|| "stdout".to_string(), |p| p.display().to_string())
}
