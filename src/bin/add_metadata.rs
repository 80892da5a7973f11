//! Look up bibliographic metadata and a cover for an M4B audiobook and tag
//! the container with them.

use chapterize::assembly::{Assembler, AssemblyJob};
use chapterize::{catalog, ProcessRunner};
use log::{error, info, warn, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::env;
use std::path::{Path, PathBuf};
use std::process;

fn print_usage() {
    println!("Add metadata from Audible and Google Books to an M4B file");
    println!();
    println!("Usage: add_metadata --input <FILE> --title <TITLE> --author <AUTHOR> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -i, --input <FILE>      Input M4B file");
    println!("  -t, --title <TITLE>     Title of the audiobook");
    println!("  -a, --author <AUTHOR>   Author of the audiobook (comma separated)");
    println!("  -n, --narrator <NAME>   Narrator(s) of the audiobook (comma separated)");
    println!("      --override          Replace the input file instead of writing a sibling");
    println!("      --keep              Keep the downloaded cover file after tagging");
    println!("      --help              Show this help message");
}

fn main() {
    TermLogger::init(
        LevelFilter::Info,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .ok();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let option = |long: &str, short: &str| {
        args.iter()
            .position(|a| a == long || a == short)
            .and_then(|i| args.get(i + 1))
            .map(|s| s.to_string())
    };

    let input = option("--input", "-i");
    let title = option("--title", "-t");
    let author = option("--author", "-a");
    let narrator = option("--narrator", "-n");
    let overwrite = args.iter().any(|a| a == "--override");
    let keep = args.iter().any(|a| a == "--keep");

    let (Some(input), Some(title), Some(author)) = (input, title, author) else {
        print_usage();
        process::exit(1);
    };

    if let Err(e) = run(
        Path::new(&input),
        &title,
        &author,
        narrator.as_deref(),
        overwrite,
        keep,
    ) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(
    input: &Path,
    title: &str,
    author: &str,
    narrator: Option<&str>,
    overwrite: bool,
    keep: bool,
) -> chapterize::Result<()> {
    let metadata = catalog::lookup_metadata(title, author, narrator)?;

    for (field, value) in [
        ("title", &metadata.title),
        ("authors", &metadata.authors),
        ("narrators", &metadata.narrators),
        ("description", &metadata.description),
        ("year", &metadata.year),
        ("cover", &metadata.cover_url),
    ] {
        if value.is_none() {
            warn!("could not find {} for '{}' by '{}'", field, title, author);
        }
    }

    let cover = match &metadata.cover_url {
        Some(url) => {
            info!("downloading cover from {}", url);
            Some(catalog::fetch_cover(url)?)
        }
        None => None,
    };

    let output = if overwrite {
        input.to_path_buf()
    } else {
        tagged_path(input)
    };

    let mut job = AssemblyJob::new(vec![input.to_path_buf()], output);
    job.cover = cover;
    job.metadata = Some(metadata);
    job.keep_workfiles = keep;
    job.encode.copy_audio = true; // the input is already a finished container

    let runner = ProcessRunner::new();
    let final_path = Assembler::new(&runner).run(&job)?;
    info!("metadata added to {}", final_path.display());

    Ok(())
}

/// Sibling output path: `book.m4b` becomes `book_new.m4b`.
fn tagged_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("m4b");
    input.with_file_name(format!("{}_new.{}", stem, ext))
}
