use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use memmap2::Mmap;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use relic::carving::{CancelToken, CarveProgress, CarvedFile, Carver};
use relic::signatures::DETECTION_SIGNATURES;
use relic::{ExifError, FilesystemKind, digest, extract_exif, fs as diskfs, signatures};

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Detect { file, extension } => run_detect(&file, extension),
        Commands::Carve {
            image,
            output,
            categories,
            parallel,
            no_extract,
        } => run_carve(&image, &output, categories, parallel, no_extract),
        Commands::Exif { file } => run_exif(&file),
        Commands::Inspect { image } => run_inspect(&image),
        Commands::Signatures => run_signatures(),
    }
}

fn map_input(path: &Path) -> Result<Mmap> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("failed to map {}", path.display()))?;
    Ok(mmap)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_detect(path: &Path, extension: Option<String>) -> Result<()> {
    let data =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let declared = cli::declared_extension(path, extension);
    let result = signatures::detect(&data, &declared);
    print_json(&result)
}

#[derive(Serialize)]
struct CarveReport {
    image: PathBuf,
    total_bytes: u64,
    cancelled: bool,
    artifacts: Vec<ArtifactReport>,
}

#[derive(Serialize)]
struct ArtifactReport {
    #[serde(flatten)]
    carved: CarvedFile,
    sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
}

fn run_carve(
    image: &Path,
    output: &Path,
    categories: Option<Vec<String>>,
    parallel: bool,
    no_extract: bool,
) -> Result<()> {
    let data = map_input(image)?;
    let carver = Carver::new(&cli::parse_categories(categories));
    let mut cancelled = false;

    let carved = if parallel {
        carver.carve_parallel(&data)
    } else {
        let token = CancelToken::new();
        {
            let token = token.clone();
            ctrlc::set_handler(move || token.cancel())
                .context("failed to install Ctrl-C handler")?;
        }

        let bar = ProgressBar::new(data.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
                .progress_chars("=>-"),
        );
        let report_progress = |progress: CarveProgress| {
            bar.set_position(progress.scanned_bytes);
            if progress.found > 0 {
                bar.set_message(format!("{} artifacts", progress.found));
            }
        };

        let carved = carver.carve_with(&data, Some(&report_progress), Some(&token));
        cancelled = token.is_cancelled();
        if cancelled {
            bar.abandon_with_message("cancelled");
        } else {
            bar.finish_with_message(format!("{} artifacts", carved.len()));
        }
        carved
    };

    if !no_extract && !carved.is_empty() {
        fs::create_dir_all(output)
            .with_context(|| format!("failed to create {}", output.display()))?;
    }

    let mut artifacts = Vec::with_capacity(carved.len());
    for file in carved {
        let bytes = &data[file.offset..file.end()];
        let path = if no_extract {
            None
        } else {
            let name = format!("{:08x}.{}", file.offset, file.extension);
            let target = output.join(name);
            fs::write(&target, bytes)
                .with_context(|| format!("failed to write {}", target.display()))?;
            Some(target)
        };
        artifacts.push(ArtifactReport {
            sha256: digest::sha256_hex(bytes),
            carved: file,
            path,
        });
    }

    let report = CarveReport {
        image: image.to_path_buf(),
        total_bytes: data.len() as u64,
        cancelled,
        artifacts,
    };
    print_json(&report)
}

fn run_exif(path: &Path) -> Result<()> {
    let data =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    match extract_exif(&data) {
        Ok(record) => print_json(&record),
        Err(ExifError::NotJpeg) => {
            anyhow::bail!("{} is not a JPEG stream", path.display())
        }
    }
}

#[derive(Serialize)]
struct InspectReport {
    image: PathBuf,
    filesystem: FilesystemKind,
    listing: diskfs::DirectoryListing,
}

fn run_inspect(image: &Path) -> Result<()> {
    let data = map_input(image)?;
    let filesystem = diskfs::identify_filesystem(&data);
    let listing = match filesystem {
        FilesystemKind::Fat16 | FilesystemKind::Fat32 => diskfs::parse_fat_directory(&data),
        FilesystemKind::Ntfs => diskfs::parse_ntfs_mft(&data),
        FilesystemKind::Ext4 | FilesystemKind::Unknown => diskfs::DirectoryListing::default(),
    };

    let report = InspectReport {
        image: image.to_path_buf(),
        filesystem,
        listing,
    };
    print_json(&report)
}

fn run_signatures() -> Result<()> {
    println!(
        "{:<28} {:<8} {:<12} {:<18} {:>9} footer",
        "NAME", "EXT", "CATEGORY", "HEADER", "MAX"
    );
    for sig in DETECTION_SIGNATURES {
        println!(
            "{:<28} {:<8} {:<12} {:<18} {:>6} MB {}",
            sig.name,
            sig.extension(),
            sig.category.to_string(),
            sig.header_hex(),
            sig.max_size / (1024 * 1024),
            if sig.footer.is_some() { "yes" } else { "no" },
        );
    }
    Ok(())
}
