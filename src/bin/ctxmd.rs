//! ctxmd CLI
//!
//! Bundle files and directories into one Markdown context document.

use anyhow::Result;
use clap::Parser;
use ctxmd::{ExportRequest, Exporter, LanguageMap};
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ctxmd")]
#[command(version)]
#[command(about = "Bundle source files into a Markdown context document")]
struct Cli {
    /// Files and directories to export
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output Markdown file
    #[arg(short = 'o', long, default_value = "export.md")]
    output: PathBuf,

    /// Project root for relative header paths (default: current directory)
    #[arg(short = 'r', long)]
    root: Option<PathBuf>,

    /// Omit the per-file start/end marker comments
    #[arg(long)]
    no_markers: bool,

    /// Record the encoding used for each file under its heading
    #[arg(long)]
    show_encoding: bool,

    /// Keep files with unrecognized extensions when walking directories
    #[arg(long)]
    all_files: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.verbose { "debug" } else { "warn" },
    ))
    .init();

    let languages = LanguageMap::new();
    let files = collect_files(&cli, &languages)?;
    if files.is_empty() {
        anyhow::bail!("no exportable files found");
    }

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let request = ExportRequest {
        output: cli.output.clone(),
        project_root: Some(root),
        include_markers: !cli.no_markers,
        show_encoding: cli.show_encoding,
    };

    let outcome = Exporter::with_languages(request, languages).export(&files);

    println!(
        "Exported {} file(s) to {}",
        outcome.processed,
        cli.output.display()
    );
    for error in &outcome.errors {
        eprintln!("{}", error);
    }
    if outcome.processed == 0 && !outcome.errors.is_empty() {
        anyhow::bail!("export produced no files");
    }
    Ok(())
}

/// Expand the inputs into an ordered, de-duplicated file list.
///
/// Directories are walked recursively in sorted order so repeated runs
/// see the same sequence; files found by walking are filtered to known
/// extensions unless --all-files is given. Explicitly listed files are
/// always kept.
fn collect_files(cli: &Cli, languages: &LanguageMap) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    let mut push = |path: PathBuf, files: &mut Vec<PathBuf>| {
        if seen.insert(path.clone()) {
            files.push(path);
        }
    };

    for input in &cli.inputs {
        if input.is_dir() {
            for entry in walkdir::WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
            {
                let path = entry.into_path();
                if !cli.all_files && !languages.is_known(&path) {
                    continue;
                }
                if cli.verbose {
                    println!("Adding: {}", path.display());
                }
                push(path, &mut files);
            }
        } else {
            push(input.clone(), &mut files);
        }
    }
    Ok(files)
}
