//! Command-line front end: list, test, print the comment of, or extract a
//! ZIP archive given as a local path or an HTTP URL.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use zipseek::{CdirRecord, Cli, HttpRangeReader, LocalFileReader, ReadAt, ZipArchive};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `-p` output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.is_http_url() {
        let reader = HttpRangeReader::new(cli.file.clone())
            .await
            .with_context(|| format!("cannot open {}", cli.file))?;
        let transferred_before = reader.transferred_bytes();
        let reader = Arc::new(reader);

        process_zip(reader.clone(), &cli).await?;

        if !cli.is_quiet() {
            let transferred = reader.transferred_bytes() - transferred_before;
            eprintln!("\n{} fetched over HTTP", format_size(transferred));
        }
    } else {
        let reader = LocalFileReader::new(Path::new(&cli.file))
            .with_context(|| format!("cannot open {}", cli.file))?;
        process_zip(Arc::new(reader), &cli).await?;
    }

    Ok(())
}

async fn process_zip<R: ReadAt + 'static>(reader: Arc<R>, cli: &Cli) -> Result<()> {
    let archive = ZipArchive::open(reader)
        .await
        .with_context(|| format!("{} is not a readable ZIP archive", cli.file))?;

    if !cli.is_very_quiet() {
        for diagnostic in archive.diagnostics() {
            eprintln!("warning: {diagnostic}");
        }
    }

    if cli.comment {
        println!("{}", archive.eocd().comment);
        return Ok(());
    }

    if cli.list || cli.verbose {
        list_files(&archive, cli.verbose);
        return Ok(());
    }

    let selected: Vec<&CdirRecord> = archive
        .entries()
        .iter()
        .filter(|e| !e.is_directory() && cli.selects(&e.file_name))
        .collect();

    if cli.test {
        return test_files(&archive, &selected, cli).await;
    }

    let multiple_files = cli.pipe && selected.len() > 1;
    for entry in selected {
        extract_file(&archive, entry, cli, multiple_files).await?;
    }

    archive.close();
    Ok(())
}

/// `-l` prints names only; `-v` prints a table with sizes, ratio and
/// timestamps plus a totals line.
fn list_files<R: ReadAt>(archive: &ZipArchive<R>, verbose: bool) {
    if !verbose {
        for entry in archive.entries() {
            println!("{}", entry.file_name);
        }
        return;
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  {:<14}  Name",
        "Length", "Size", "Cmpr", "Date", "Time", "Method"
    );
    println!("{}", "-".repeat(86));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in archive.entries() {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {:<14}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.compression_method.name(),
            entry.file_name
        );

        if !entry.is_directory() {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(86));
    println!(
        "{:>10}  {:>10}  {}  {:>37}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count
    );

    let eocd = archive.eocd();
    if eocd.is_zip64 {
        println!("(ZIP64 archive, {} entries)", eocd.total_entries);
    }
}

/// `-t`: extract every selected entry to memory and check its CRC-32.
async fn test_files<R: ReadAt>(archive: &ZipArchive<R>, entries: &[&CdirRecord], cli: &Cli) -> Result<()> {
    let mut failures = 0usize;

    for entry in entries {
        match archive.extract(entry).await {
            Ok(_) => {
                if !cli.is_quiet() {
                    println!("    testing: {:<40}  OK", entry.file_name);
                }
            }
            Err(err) => {
                failures += 1;
                eprintln!("    testing: {:<40}  {err}", entry.file_name);
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} entries failed in {}", entries.len(), cli.file);
    }
    if !cli.is_very_quiet() {
        println!("No errors detected in {} ({} entries).", cli.file, entries.len());
    }
    Ok(())
}

/// Handles `-p`, `-d`, `-j`, `-n` and `-o`.
async fn extract_file<R: ReadAt>(
    archive: &ZipArchive<R>,
    entry: &CdirRecord,
    cli: &Cli,
    show_filename: bool,
) -> Result<()> {
    if cli.pipe {
        if show_filename {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(format!("--- {} ---\n", entry.file_name).as_bytes())
                .await?;
        }
        return archive
            .extract_to_stdout(entry)
            .await
            .with_context(|| format!("failed to extract {}", entry.file_name));
    }

    let Some(output_path) = output_path(&entry.file_name, cli) else {
        if !cli.is_quiet() {
            eprintln!("   skipping: {:?} (name has no usable path components)", entry.file_name);
        }
        return Ok(());
    };

    let skip_reason = match (output_path.exists(), cli.never_overwrite, cli.overwrite) {
        (false, _, _) | (true, false, true) => None,
        (true, true, _) => Some("exists"),
        (true, false, false) => Some("exists, pass -o to replace"),
    };
    if let Some(reason) = skip_reason {
        if !cli.is_quiet() {
            eprintln!("   skipping: {} ({reason})", output_path.display());
        }
        return Ok(());
    }

    if !cli.is_quiet() {
        println!("  inflating: {}", output_path.display());
    }

    archive
        .extract_to_file(entry, &output_path)
        .await
        .with_context(|| format!("failed to extract {} to {}", entry.file_name, output_path.display()))
}

/// Destination for an entry, under `-d` when given. Absolute names and `..`
/// components are stripped so an entry cannot land outside the target;
/// `None` if nothing is left.
fn output_path(file_name: &str, cli: &Cli) -> Option<PathBuf> {
    let name = if cli.junk_paths {
        file_name.rsplit(['/', '\\']).next().unwrap_or(file_name)
    } else {
        file_name
    };

    let relative: PathBuf = name
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect();
    if relative.as_os_str().is_empty() {
        return None;
    }

    Some(match &cli.extract_dir {
        Some(dir) => PathBuf::from(dir).join(relative),
        None => relative,
    })
}

fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 || compressed >= uncompressed {
        return format!("{:>4}%", 0);
    }
    format!("{:>4}%", 100 - compressed * 100 / uncompressed)
}

fn format_size(size: u64) -> String {
    const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];

    if size < 1024 {
        return format!("{size} bytes");
    }
    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}
