use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::Context;
use cas_blob::{Blob, Manifest, Tuning};
use cas_store::{FsChunkStore, FsStoreConfig};
use colored::Colorize;
use tracing::info;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = FsStoreConfig {
        root: cli.store.clone(),
        sync: cli.sync,
        ..Default::default()
    };
    let store = FsChunkStore::open(config)
        .with_context(|| format!("opening chunk store at {}", cli.store.display()))?;

    match cli.command {
        Command::Put(args) => cmd_put(&store, args),
        Command::Cat(args) => cmd_cat(&store, args, &mut io::stdout().lock()),
        Command::Write(args) => cmd_write(&store, args),
        Command::Stat(args) => cmd_stat(&store, args, cli.format),
    }
}

fn cmd_put(store: &FsChunkStore, args: PutArgs) -> anyhow::Result<()> {
    let manifest = Manifest::with_tuning(args.chunk_type, Tuning::new(args.chunk_size, args.fanout));
    let mut blob = Blob::open(store, manifest)?;
    let mut file =
        File::open(&args.file).with_context(|| format!("opening {}", args.file.display()))?;
    io::copy(&mut file, &mut blob.cursor())?;

    let saved = blob.save()?;
    info!(root = %saved.root.short_hex(), size = saved.size, "stored blob");
    emit_manifest(&saved, args.output.as_deref())
}

fn cmd_cat(store: &FsChunkStore, args: CatArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let mut blob = Blob::open(store, load_manifest(&args.manifest)?)?;
    io::copy(&mut blob.cursor(), out)?;
    out.flush()?;
    Ok(())
}

fn cmd_write(store: &FsChunkStore, args: WriteArgs) -> anyhow::Result<()> {
    let mut blob = Blob::open(store, load_manifest(&args.manifest)?)?;
    let mut file =
        File::open(&args.file).with_context(|| format!("opening {}", args.file.display()))?;
    {
        let mut cursor = blob.cursor();
        cursor.seek(SeekFrom::Start(args.offset))?;
        io::copy(&mut file, &mut cursor)?;
    }

    let saved = blob.save()?;
    info!(root = %saved.root.short_hex(), size = saved.size, "patched blob");
    emit_manifest(&saved, args.output.as_deref())
}

fn cmd_stat(store: &FsChunkStore, args: StatArgs, format: OutputFormat) -> anyhow::Result<()> {
    let blob = Blob::open(store, load_manifest(&args.manifest)?)?;
    let manifest = blob.manifest();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(manifest)?),
        OutputFormat::Text => {
            println!("{} {}", "type:".bold(), manifest.chunk_type.cyan());
            println!("{} {}", "root:".bold(), manifest.root.to_hex().yellow());
            println!("{} {}", "size:".bold(), manifest.size);
            println!("{} {}", "chunk size:".bold(), manifest.chunk_size);
            println!("{} {}", "fanout:".bold(), manifest.fanout);
            println!("{} {}", "height:".bold(), blob.height());
        }
    }
    Ok(())
}

fn load_manifest(path: &Path) -> anyhow::Result<Manifest> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading manifest {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing manifest {}", path.display()))
}

fn emit_manifest(manifest: &Manifest, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    match output {
        Some(path) => {
            fs::write(path, json + "\n")
                .with_context(|| format!("writing manifest {}", path.display()))?;
            eprintln!("{} manifest written to {}", "✓".green().bold(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
