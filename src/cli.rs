use clap::{Parser, Subcommand};
use relic::signatures::Category;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "relic")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Forensic recovery of binary artifacts from disk images")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify a file by its magic number and flag extension mismatches
    Detect {
        file: PathBuf,

        /// Declared extension; defaults to the file's own
        #[arg(short, long)]
        extension: Option<String>,
    },

    /// Carve embedded files out of a raw image by header/footer signatures
    Carve {
        image: PathBuf,

        #[arg(short, long, default_value = "./carved")]
        output: PathBuf,

        /// Restrict to categories (image,video,audio,document,archive,executable,other)
        #[arg(short, long, value_delimiter = ',')]
        categories: Option<Vec<String>>,

        /// Scan with the rayon thread pool (no Ctrl-C yield points)
        #[arg(long)]
        parallel: bool,

        /// Report only; do not write carved artifacts
        #[arg(long)]
        no_extract: bool,
    },

    /// Extract EXIF camera metadata and GPS coordinates from a JPEG
    Exif { file: PathBuf },

    /// Identify the filesystem in a volume image and list directory records
    Inspect { image: PathBuf },

    /// List the signature catalog
    Signatures,
}

pub fn parse_categories(raw: Option<Vec<String>>) -> Vec<Category> {
    raw.unwrap_or_default()
        .iter()
        .filter_map(|name| match Category::from_str(name) {
            Ok(category) => Some(category),
            Err(err) => {
                eprintln!("Warning: {err}");
                None
            }
        })
        .collect()
}

/// Declared extension for the mismatch check: the explicit flag if given,
/// otherwise whatever the path carries.
pub fn declared_extension(path: &std::path::Path, flag: Option<String>) -> String {
    flag.unwrap_or_else(|| {
        path.extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}
