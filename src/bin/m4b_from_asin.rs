//! Create an M4B audiobook from split audio files, with the chapter
//! timeline and cover fetched from the remote catalog by Audible ASIN.

use chapterize::assembly::{Assembler, AssemblyJob};
use chapterize::{catalog, segments, Config, ProcessRunner};
use log::{error, info, warn, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn print_usage() {
    println!("Create an M4B audiobook with chapters and cover from the Audible catalog");
    println!();
    println!("Usage: m4b_from_asin --inputdir <DIR> --asin <ASIN> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -i, --inputdir <DIR>   Directory with the source audio files");
    println!("      --asin <ASIN>      Audible book id");
    println!("      --intro            The audio starts with the retail intro clip");
    println!("      --keep             Keep the source files after assembly");
    println!("      --help             Show this help message");
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

    let input_dir = args
        .iter()
        .position(|a| a == "--inputdir" || a == "-i")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.to_string());
    let asin = args
        .iter()
        .position(|a| a == "--asin")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.to_string());
    let has_intro = args.iter().any(|a| a == "--intro");
    let keep = args.iter().any(|a| a == "--keep");

    let (Some(input_dir), Some(asin)) = (input_dir, asin) else {
        print_usage();
        process::exit(1);
    };

    if let Err(e) = run(Path::new(&input_dir), &asin, has_intro, keep) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(dir: &Path, asin: &str, has_intro: bool, keep: bool) -> chapterize::Result<()> {
    let files = segments::find_audio_files(dir)?;
    if files.is_empty() {
        eprintln!("No audio files found in {}", dir.display());
        process::exit(1);
    }

    let entries = catalog::fetch_chapters(asin)?;
    info!("{} chapters in catalog for {}", entries.len(), asin);
    if entries.is_empty() {
        warn!("catalog has no chapters for {}; assembling without a timeline", asin);
    }
    let chapters = catalog::chapters_from_catalog(&entries, has_intro)?;

    let book = catalog::fetch_book(asin)?;
    let cover = match &book.cover_url {
        Some(url) => {
            info!("downloading cover from {}", url);
            Some(catalog::fetch_cover(url)?)
        }
        None => {
            warn!("no cover image in catalog for {}", asin);
            None
        }
    };

    let title = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audiobook".to_string());
    let output = dir.join(format!("{}.m4b", title));

    let mut job = AssemblyJob::new(files.clone(), output);
    job.chapters = chapters;
    job.cover = cover;
    job.title = Some(title);
    job.encode = Config::load().unwrap_or_default().encode_settings();

    let runner = ProcessRunner::new();
    let final_path = Assembler::new(&runner).run(&job)?;
    info!("created {}", final_path.display());

    if !keep {
        for file in &files {
            fs::remove_file(file)?;
        }
        info!("removed {} source files", files.len());
    }

    Ok(())
}
