//! CLI argument parsing using clap.

use clap::ArgAction;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ext4cp")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "PATH is relative to the image root; IMAGE:. copies everything.")]
pub struct Cli {
    /// Source paths as IMAGE:PATH, all from the same image
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<String>,

    /// Destination directory (must exist)
    #[arg(value_name = "DIRECTORY")]
    pub directory: PathBuf,

    /// Copy directories recursively
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Flatten the tree: write every file directly into DIRECTORY
    #[arg(short = 't', long)]
    pub flatten: bool,

    /// Rename instead of overwriting existing files (name_1.ext, ...)
    #[arg(short = 'n', long)]
    pub conflict_rename: bool,

    /// Append .bin to *.fw file names on hosts that reject them
    #[arg(long = "wa-fnames")]
    pub wa_fnames: bool,

    /// Increase verbosity (-v notes, -vv every entry, -vvv summary)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Output results in JSON format
    #[arg(short, long)]
    pub json: bool,
}
