use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{IoParameters, StructureFormat};
use commands::{compare, convert, info, superpose};

#[derive(Parser, Debug)]
#[command(
    name = "kmbio",
    about = "Read, inspect, convert and superpose macromolecular structures (PDB / mmCIF).",
    version,
    author,
    arg_required_else_help = true
)]
struct Cli {
    /// Input path, URL or route (rcsb://1abc.cif). When omitted, stdin is used.
    #[arg(short, long, value_name = "SOURCE", global = true)]
    input: Option<String>,
    /// Output file path. When omitted, stdout is used.
    #[arg(short, long, value_name = "FILE", global = true)]
    output: Option<PathBuf>,
    /// Force the input format (pdb or mmcif).
    #[arg(long = "format", value_enum, global = true)]
    input_format: Option<StructureFormat>,
    /// Fail on malformed records instead of logging a warning.
    #[arg(long, global = true)]
    strict: bool,
    /// Use mmCIF label chain ids and residue numbers instead of author ones.
    #[arg(long, global = true)]
    label_ids: bool,
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report header, chains and biological assemblies.
    Info(info::InfoArgs),
    /// Write the structure or one of its assemblies as PDB.
    Convert(convert::ConvertArgs),
    /// Superpose a mobile structure onto the input and write it.
    Superpose(superpose::SuperposeArgs),
    /// Check whether the input equals another structure.
    Compare(compare::CompareArgs),
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "kmbio=info,warn",
        1 => "kmbio=debug,info",
        _ => "kmbio=trace,debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let io_params = IoParameters {
        input: cli.input.clone(),
        output: cli.output.clone(),
        input_format: cli.input_format,
        strict: cli.strict,
        label_ids: cli.label_ids,
    };

    match cli.command {
        Command::Info(args) => {
            let structure = commands::load_input(&io_params, 0)?;
            info::run(&structure, &args)?;
        }
        Command::Convert(args) => {
            commands::ensure_noninteractive_stdout("convert", &io_params)?;
            let structure = commands::load_input(&io_params, args.bioassembly)?;
            convert::run(structure, &args, &io_params)?;
        }
        Command::Superpose(args) => {
            commands::ensure_noninteractive_stdout("superpose", &io_params)?;
            let structure = commands::load_input(&io_params, 0)?;
            superpose::run(&structure, &args, &io_params)?;
        }
        Command::Compare(args) => {
            let structure = commands::load_input(&io_params, 0)?;
            compare::run(&structure, &args, &io_params)?;
        }
    }

    Ok(())
}
