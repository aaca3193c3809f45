use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cmds;

#[derive(Parser)]
#[command(name = "params-gen")]
#[command(about = "C struct generation for operator parameter bundles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /* Generate C support code from params definition files */
    Codegen {
        /* Input YAML files containing params definitions */
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /* Output directory for generated headers */
        #[arg(
            short = 'o',
            long = "output",
            value_name = "DIR",
            default_value = "generated"
        )]
        output_dir: PathBuf,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },

    /* Show schema identities, fields and enum constants */
    Inspect {
        /* Input YAML files containing params definitions */
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /* Output format */
        #[arg(long = "format", value_enum, default_value = "text")]
        format: cmds::inspect::OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Codegen {
            files,
            output_dir,
            verbose,
        } => {
            cmds::codegen::run(files, output_dir, verbose)?;
        }

        Commands::Inspect { files, format } => {
            cmds::inspect::run(files, format)?;
        }
    }

    Ok(())
}
