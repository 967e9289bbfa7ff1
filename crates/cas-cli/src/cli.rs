use std::path::PathBuf;

use cas_blob::{DEFAULT_CHUNK_SIZE, DEFAULT_FANOUT};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "casblob",
    about = "Store, read and patch content-addressed blobs",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the chunk store
    #[arg(long, global = true, default_value = "chunks")]
    pub store: PathBuf,

    /// fsync every chunk before it becomes visible
    #[arg(long, global = true)]
    pub sync: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a file as a new blob and print its manifest
    Put(PutArgs),
    /// Write a blob's content to stdout
    Cat(CatArgs),
    /// Overwrite part of a blob with a file's content
    Write(WriteArgs),
    /// Show a blob's shape
    Stat(StatArgs),
}

#[derive(Args)]
pub struct PutArgs {
    pub file: PathBuf,
    /// Type tag of the blob, at most 12 bytes
    #[arg(long = "type", default_value = "blob")]
    pub chunk_type: String,
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: u32,
    #[arg(long, default_value_t = DEFAULT_FANOUT)]
    pub fanout: u32,
    /// Write the manifest here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct CatArgs {
    /// Manifest JSON file
    pub manifest: PathBuf,
}

#[derive(Args)]
pub struct WriteArgs {
    /// Manifest JSON file
    pub manifest: PathBuf,
    pub file: PathBuf,
    #[arg(long, default_value_t = 0)]
    pub offset: u64,
    /// Write the new manifest here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatArgs {
    /// Manifest JSON file
    pub manifest: PathBuf,
}
