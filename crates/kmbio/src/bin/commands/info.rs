use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use prettytable::{Table, format, row};
use serde::Serialize;

use kmbio::{Bioassembly, Chain, Header, Structure};

use crate::commands::{print_boxed_label, run_with_spinner};

/// Report-only command that inspects a structure.
#[derive(Debug, Default, Args)]
pub struct InfoArgs {
    /// Print the report as JSON on stdout instead of tables on stderr.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StructureReport<'a> {
    id: &'a str,
    header: &'a Header,
    models: Vec<ModelReport>,
}

#[derive(Debug, Serialize)]
struct ModelReport {
    id: usize,
    serial: usize,
    chains: Vec<ChainReport>,
}

#[derive(Debug, Serialize)]
struct ChainReport {
    id: String,
    residues: usize,
    atoms: usize,
    disordered_residues: usize,
    point_mutations: usize,
}

/// Computes and prints structure statistics without mutating the structure.
pub fn run(structure: &Structure, args: &InfoArgs) -> Result<()> {
    let report = run_with_spinner("Analyzing structure", || Ok(collect_report(structure)))?;

    if args.json {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &report).context("Failed to encode report")?;
        writeln!(&mut stdout)?;
        return Ok(());
    }
    print_tables(&report)
}

fn collect_report(structure: &Structure) -> StructureReport<'_> {
    let models = structure
        .iter_models()
        .map(|model| ModelReport {
            id: model.id,
            serial: model.serial_num,
            chains: model.iter_chains().map(chain_report).collect(),
        })
        .collect();

    StructureReport {
        id: &structure.id,
        header: &structure.header,
        models,
    }
}

fn chain_report(chain: &Chain) -> ChainReport {
    ChainReport {
        id: chain.id.to_string(),
        residues: chain.residue_count(),
        atoms: chain.iter_atoms().count(),
        disordered_residues: chain.iter_residues().filter(|r| r.disordered).count(),
        point_mutations: chain.entries().iter().filter(|e| e.is_disordered()).count(),
    }
}

fn print_tables(report: &StructureReport<'_>) -> Result<()> {
    let mut stderr = io::stderr().lock();

    print_boxed_label(&mut stderr, "kmbio Structure Report")?;
    writeln!(&mut stderr)?;

    let header = report.header;
    let mut summary_table = Table::new();
    print_boxed_label(&mut stderr, "Header")?;
    summary_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    summary_table.set_titles(row!["Field", "Value"]);
    summary_table.add_row(row!["Structure ID", report.id]);
    summary_table.add_row(row!["Title", or_dash(header.name.as_deref())]);
    summary_table.add_row(row!["Keywords", or_dash(header.head.as_deref())]);
    summary_table.add_row(row!["Method", or_dash(header.structure_method.as_deref())]);
    summary_table.add_row(row![
        "Resolution (Å)",
        header
            .resolution
            .map_or_else(|| "-".to_string(), |r| format!("{r:.2}"))
    ]);
    summary_table.add_row(row!["Deposited", or_dash(header.deposition_date.as_deref())]);
    summary_table.add_row(row!["Models", report.models.len()]);
    summary_table
        .print(&mut stderr)
        .context("Failed to render header summary")?;
    writeln!(&mut stderr)?;

    let mut chain_table = Table::new();
    print_boxed_label(&mut stderr, "Chain Breakdown")?;
    chain_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    chain_table.set_titles(row![
        "Model",
        "Chain",
        "Residues",
        "Atoms",
        "Altloc Residues",
        "Point Mutations"
    ]);
    for model in &report.models {
        for chain in &model.chains {
            chain_table.add_row(row![
                model.serial,
                chain.id,
                chain.residues,
                chain.atoms,
                chain.disordered_residues,
                chain.point_mutations
            ]);
        }
    }
    chain_table
        .print(&mut stderr)
        .context("Failed to render chain summary")?;
    writeln!(&mut stderr)?;

    let mut assembly_table = Table::new();
    print_boxed_label(&mut stderr, "Biological Assemblies")?;
    assembly_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    assembly_table.set_titles(row!["Assembly", "Chains", "Copies"]);
    if header.bioassembly_data.is_empty() {
        assembly_table.add_row(row!["-", "None defined", 0]);
    }
    for assembly in header.bioassembly_data.values() {
        assembly_table.add_row(row![
            assembly.id,
            assembly_chains(assembly),
            assembly.copy_count()
        ]);
    }
    assembly_table
        .print(&mut stderr)
        .context("Failed to render assembly summary")?;

    Ok(())
}

fn assembly_chains(assembly: &Bioassembly) -> String {
    assembly
        .operations
        .iter()
        .map(|op| op.chains.join(","))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
