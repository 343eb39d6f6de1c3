use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use tracing::info;

use kmbio::Structure;
use kmbio::io::{AtomNumbering, PdbWriter, SaveOptions};
use kmbio::ops::Transform;

use crate::commands::{IoParameters, describe_output, run_with_spinner, save_output};

/// Serial number assignment on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Numbering {
    /// Keep the serial numbers read from the input.
    Keep,
    /// Restart at 1 in every model.
    ByModel,
    /// Restart at 1 in every chain.
    #[default]
    ByChain,
}

impl From<Numbering> for AtomNumbering {
    fn from(value: Numbering) -> Self {
        match value {
            Numbering::Keep => AtomNumbering::Keep,
            Numbering::ByModel => AtomNumbering::ByModel,
            Numbering::ByChain => AtomNumbering::ByChain,
        }
    }
}

/// Point of the structure moved to the origin before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Center {
    /// Unweighted centroid of the selected atoms.
    Geometry,
    /// Mass-weighted centre of the selected atoms.
    Mass,
}

/// Rewrites a structure (or one of its biological assemblies) as PDB.
#[derive(Debug, Default, Args)]
pub struct ConvertArgs {
    /// Biological assembly to expand before writing (0 keeps the deposited model).
    #[arg(short, long, default_value_t = 0)]
    pub bioassembly: usize,
    /// Drop alternate conformers, keeping only altloc A.
    #[arg(long)]
    pub no_disordered: bool,
    /// How atom serial numbers are assigned.
    #[arg(long, value_enum, default_value_t = Numbering::ByChain)]
    pub numbering: Numbering,
    /// Always wrap models in MODEL/ENDMDL records.
    #[arg(long)]
    pub model_flag: bool,
    /// Omit the trailing END record.
    #[arg(long)]
    pub no_end: bool,
    /// Move the structure so that this centre sits at the origin.
    #[arg(long, value_enum)]
    pub center: Option<Center>,
}

/// Writes `structure` according to the conversion options.
pub fn run(mut structure: Structure, args: &ConvertArgs, params: &IoParameters) -> Result<()> {
    if structure.is_empty() {
        bail!("Structure '{}' has no models to write", structure.id);
    }

    match args.center {
        Some(Center::Geometry) => Transform::center_geometry(&mut structure, None),
        Some(Center::Mass) => Transform::center_mass(&mut structure, None),
        None => {}
    }

    let writer = PdbWriter::new(args.model_flag);
    let options = SaveOptions {
        write_end: !args.no_end,
        numbering: args.numbering.into(),
    };

    run_with_spinner("Writing PDB", || {
        save_output(&structure, params, &writer, &options, !args.no_disordered)
    })?;
    info!(
        models = structure.model_count(),
        atoms = structure.atom_count(),
        output = %describe_output(params.output.as_deref()),
        "structure written"
    );
    Ok(())
}
