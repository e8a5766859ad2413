use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chatvault_core::progress::Progress;
use chatvault_core::split;
use chatvault_core::storage::DiskStore;
use chatvault_core::store::ManifestStore;
use chatvault_core::transfer;
use chatvault_core::transport::{DirTransport, DEFAULT_MAX_PART_SIZE};

#[derive(Parser)]
#[command(name = "chatvault", version, about = "Store arbitrary files as bounded-size message attachments")]
struct Cli {
    /// Vault root holding the manifest, scratch parts and the directory transport
    #[arg(long, global = true, default_value = ".chatvault")]
    vault: PathBuf,
    /// Per-message attachment cap in bytes (accepts K/M/G suffixes)
    #[arg(long, global = true, value_parser = parse_size, default_value_t = DEFAULT_MAX_PART_SIZE)]
    max_part_size: u64,
    /// Print a progress ticker to stderr
    #[arg(long, global = true, default_value_t = false)]
    progress: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Upload one file, printing its manifest record
    Upload {
        #[arg(long, default_value = "me")]
        chat: String,
        file: PathBuf,
    },
    /// Download a previously uploaded file by id
    Download {
        id: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List every record in the manifest
    List,
    /// Upload then download into a scratch copy and compare (end-to-end check)
    Roundtrip {
        #[arg(long, default_value = "me")]
        chat: String,
        file: PathBuf,
    },
    /// Split a file into bounded-size parts (codec helper)
    Split { input: PathBuf, outdir: PathBuf },
}

struct Vault {
    manifest: PathBuf,
    scratch: PathBuf,
    transport_root: PathBuf,
}

impl Vault {
    fn new(root: &Path) -> Self {
        Self {
            manifest: root.join("uploads.json"),
            scratch: root.join("scratch"),
            transport_root: root.join("transport"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let vault = Vault::new(&cli.vault);
    let prog = Progress::new(cli.progress);

    match cli.cmd {
        Cmd::Upload { chat, file } => {
            let mut store = ManifestStore::open(&vault.manifest)?;
            let mut transport = DirTransport::new(&vault.transport_root, cli.max_part_size);
            prog.start();
            let record =
                transfer::upload(&mut transport, &mut store, &chat, &file, &vault.scratch, &prog)
                    .with_context(|| format!("upload {}", file.display()))?;
            prog.stop();
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Cmd::Download { id, output } => {
            let store = ManifestStore::open(&vault.manifest)?;
            let mut transport = DirTransport::new(&vault.transport_root, cli.max_part_size);
            prog.start();
            let path = transfer::download(&mut transport, &store, &id, output.as_deref(), &prog)
                .with_context(|| format!("download {id}"))?;
            prog.stop();
            println!("{}", path.display());
        }
        Cmd::List => {
            let store = ManifestStore::open(&vault.manifest)?;
            for rec in store.records() {
                println!(
                    "{}  {:>12} bytes  {:>3} parts  {}  {}",
                    rec.id,
                    rec.size,
                    rec.parts.len(),
                    rec.chat_target,
                    rec.file_path
                );
            }
        }
        Cmd::Roundtrip { chat, file } => roundtrip(&vault, cli.max_part_size, &chat, &file, &prog)?,
        Cmd::Split { input, outdir } => {
            let parts = split::split(&DiskStore, &input, cli.max_part_size, &outdir)?;
            for p in &parts {
                println!("{}", p.display());
            }
        }
    }
    Ok(())
}

/// One upload followed by one download into a scratch copy, compared
/// byte-for-byte via BLAKE3.
fn roundtrip(
    vault: &Vault,
    max_part_size: u64,
    chat: &str,
    file: &Path,
    prog: &Progress,
) -> Result<()> {
    let mut store = ManifestStore::open(&vault.manifest)?;
    let mut transport = DirTransport::new(&vault.transport_root, max_part_size);

    prog.start();
    let record = transfer::upload(&mut transport, &mut store, chat, file, &vault.scratch, prog)
        .with_context(|| format!("upload {}", file.display()))?;
    eprintln!("Uploaded {} as {} ({} parts)", file.display(), record.id, record.parts.len());

    let copy = vault.scratch.join(format!("{}.verify", record.id));
    let restored = transfer::download(&mut transport, &store, &record.id, Some(&copy), prog)
        .with_context(|| format!("download {}", record.id))?;
    prog.stop();

    if hash_file(file)? != hash_file(&restored)? {
        bail!("roundtrip mismatch: {} differs from {}", file.display(), restored.display());
    }
    std::fs::remove_file(&restored)?;
    println!("OK {}", record.id);
    Ok(())
}

fn hash_file(path: &Path) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    io::copy(&mut f, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

fn parse_size(spec: &str) -> std::result::Result<u64, String> {
    let s = spec.trim().to_uppercase();
    let (num, mul) = if let Some(n) = s.strip_suffix('K') {
        (n, 1u64 << 10)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1 << 20)
    } else if let Some(n) = s.strip_suffix('G') {
        (n, 1 << 30)
    } else {
        (s.as_str(), 1)
    };
    let v: u64 = num.trim().parse().map_err(|_| format!("bad size {spec}"))?;
    if v == 0 {
        return Err(format!("size must be positive: {spec}"));
    }
    v.checked_mul(mul).ok_or_else(|| format!("size overflows: {spec}"))
}
