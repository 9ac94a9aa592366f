use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ionix")]
#[command(version, about = "Notes, tasks, planner and AI chat backend")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API and serve the frontend
    Serve {
        /// Path to a YAML config file (defaults to ./ionix.yaml if present)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Address to listen on, overriding the config and PORT
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// PDF utilities
    Pdf(PdfCommand),
}

#[derive(Args, Debug)]
pub struct PdfCommand {
    #[command(subcommand)]
    pub action: PdfAction,
}

#[derive(Subcommand, Debug)]
pub enum PdfAction {
    /// Concatenate PDFs in argument order
    Merge {
        /// Input files
        #[arg(required = true, value_name = "INPUT")]
        inputs: Vec<PathBuf>,

        /// Where to write the merged document
        #[arg(long, short)]
        output: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rotate every page 90 degrees clockwise
    Rotate {
        /// Input file
        input: PathBuf,

        /// Where to write the rotated document
        #[arg(long, short)]
        output: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
