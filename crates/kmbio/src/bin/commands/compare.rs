use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use clap::Args;
use prettytable::{Table, format, row};

use kmbio::{DEFAULT_TOLERANCE, Structure, allequal};

use crate::commands::{IoParameters, load_source, print_boxed_label, run_with_spinner};

/// Checks whether two structures hold the same models, chains, residues and atoms.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Structure to compare the input against (path, URL or route).
    #[arg(long, value_name = "SOURCE")]
    pub other: String,
    /// Biological assembly of --other to compare against.
    #[arg(long, default_value_t = 0)]
    pub other_bioassembly: usize,
    /// Maximum coordinate difference per axis, in ångströms.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,
}

/// Compares the input with `--other`; fails when they differ.
pub fn run(structure: &Structure, args: &CompareArgs, params: &IoParameters) -> Result<()> {
    let other_params = IoParameters {
        input_format: None,
        ..params.clone()
    };
    let other = load_source(&args.other, &other_params, args.other_bioassembly)?;

    let equal = run_with_spinner("Comparing structures", || {
        Ok(allequal(structure, &other, args.tolerance))
    })?;

    let mut stderr = io::stderr().lock();
    print_boxed_label(&mut stderr, "Comparison")?;
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(row!["", "Input", "Other"]);
    table.add_row(row!["ID", structure.id, other.id]);
    table.add_row(row!["Models", structure.model_count(), other.model_count()]);
    table.add_row(row!["Chains", structure.chain_count(), other.chain_count()]);
    table.add_row(row!["Residues", structure.residue_count(), other.residue_count()]);
    table.add_row(row!["Atoms", structure.atom_count(), other.atom_count()]);
    table
        .print(&mut stderr)
        .context("Failed to render comparison")?;
    writeln!(&mut stderr)?;

    if !equal {
        bail!(
            "Structures differ (tolerance {} Å): {} vs {}",
            args.tolerance,
            structure.id,
            other.id
        );
    }
    writeln!(&mut stderr, "Structures are equal within {} Å.", args.tolerance)?;
    Ok(())
}
