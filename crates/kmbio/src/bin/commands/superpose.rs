use std::io::{self, Write};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, ValueEnum};
use prettytable::{Table, format, row};

use kmbio::io::{PdbWriter, SaveOptions};
use kmbio::tools::{Method, Superimposer};
use kmbio::{Atom, Chain, Structure};

use crate::commands::{IoParameters, load_source, print_boxed_label, run_with_spinner, save_output};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SuperposeMethod {
    /// Quaternion characteristic polynomial.
    #[default]
    Qcp,
    /// Kabsch via singular value decomposition.
    Svd,
}

impl From<SuperposeMethod> for Method {
    fn from(value: SuperposeMethod) -> Self {
        match value {
            SuperposeMethod::Qcp => Method::Qcp,
            SuperposeMethod::Svd => Method::Svd,
        }
    }
}

/// Superposes a mobile structure onto the input and writes the moved mobile structure.
#[derive(Debug, Args)]
pub struct SuperposeArgs {
    /// Structure to move (path, URL or route).
    #[arg(long, value_name = "SOURCE")]
    pub mobile: String,
    /// Atom name used to pair residues.
    #[arg(long, default_value = "CA")]
    pub atom: String,
    /// Restrict the fixed side to one chain.
    #[arg(long, value_name = "ID")]
    pub chain: Option<String>,
    /// Chain of the mobile structure paired with --chain (defaults to the same id).
    #[arg(long, value_name = "ID")]
    pub mobile_chain: Option<String>,
    #[arg(long, value_enum, default_value_t = SuperposeMethod::Qcp)]
    pub method: SuperposeMethod,
}

/// Fits the mobile structure onto `fixed` and writes it to the output.
pub fn run(fixed: &Structure, args: &SuperposeArgs, params: &IoParameters) -> Result<()> {
    let mobile_params = IoParameters {
        input_format: None,
        ..params.clone()
    };
    let mut mobile = load_source(&args.mobile, &mobile_params, 0)?;

    let (rms, init_rms, pairs) = run_with_spinner("Superposing structures", || {
        let (fixed_atoms, moving_atoms) = paired_atoms(fixed, &mobile, args)?;
        if fixed_atoms.len() < 3 {
            bail!(
                "Only {} '{}' atom pairs found; at least 3 are needed",
                fixed_atoms.len(),
                args.atom
            );
        }
        let init_rms = rmsd(&fixed_atoms, &moving_atoms);

        let mut sup = Superimposer::with_method(args.method.into());
        sup.set_atoms(fixed_atoms.iter().copied(), moving_atoms.iter().copied())?;
        Ok((sup.rms()?, init_rms, fixed_atoms.len(), sup))
    })
    .and_then(|(rms, init_rms, pairs, sup)| {
        sup.apply_to_structure(&mut mobile)?;
        Ok((rms, init_rms, pairs))
    })?;

    let mut stderr = io::stderr().lock();
    print_boxed_label(&mut stderr, "Superposition")?;
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(row!["Metric", "Value"]);
    table.add_row(row!["Atom pairs", pairs]);
    table.add_row(row!["RMSD before (Å)", format!("{init_rms:.3}")]);
    table.add_row(row!["RMSD after (Å)", format!("{rms:.3}")]);
    table
        .print(&mut stderr)
        .context("Failed to render superposition summary")?;
    writeln!(&mut stderr)?;

    save_output(
        &mobile,
        params,
        &PdbWriter::default(),
        &SaveOptions::default(),
        true,
    )
}

/// Atoms named `args.atom` of residues present in both structures' first models.
fn paired_atoms<'a>(
    fixed: &'a Structure,
    mobile: &'a Structure,
    args: &SuperposeArgs,
) -> Result<(Vec<&'a Atom>, Vec<&'a Atom>)> {
    let fixed_model = fixed
        .first_model()
        .ok_or_else(|| anyhow!("Structure '{}' has no models", fixed.id))?;
    let mobile_model = mobile
        .first_model()
        .ok_or_else(|| anyhow!("Structure '{}' has no models", mobile.id))?;

    let chain_pairs: Vec<(&Chain, &Chain)> = match &args.chain {
        Some(id) => {
            let mobile_id = args.mobile_chain.as_deref().unwrap_or(id);
            let fixed_chain = fixed_model
                .chain(id)
                .ok_or_else(|| anyhow!("Chain '{id}' not found in '{}'", fixed.id))?;
            let mobile_chain = mobile_model
                .chain(mobile_id)
                .ok_or_else(|| anyhow!("Chain '{mobile_id}' not found in '{}'", mobile.id))?;
            vec![(fixed_chain, mobile_chain)]
        }
        None => fixed_model
            .iter_chains()
            .filter_map(|c| mobile_model.chain(&c.id).map(|m| (c, m)))
            .collect(),
    };

    let mut fixed_atoms = Vec::new();
    let mut moving_atoms = Vec::new();
    for (fixed_chain, mobile_chain) in chain_pairs {
        for residue in fixed_chain.iter_residues() {
            let partner = mobile_chain.residue(&residue.id);
            if let (Some(a), Some(b)) = (
                residue.atom(&args.atom),
                partner.and_then(|r| r.atom(&args.atom)),
            ) {
                fixed_atoms.push(a);
                moving_atoms.push(b);
            }
        }
    }
    Ok((fixed_atoms, moving_atoms))
}

fn rmsd(fixed: &[&Atom], moving: &[&Atom]) -> f64 {
    let sum: f64 = fixed
        .iter()
        .zip(moving)
        .map(|(a, b)| a.distance_squared(b))
        .sum();
    (sum / fixed.len() as f64).sqrt()
}
