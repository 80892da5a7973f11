//! Merge audio files and a CUE sheet into an M4B audiobook.

use chapterize::assembly::{Assembler, AssemblyJob};
use chapterize::{cue, segments, Config, ProcessRunner};
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn print_usage() {
    println!("Merge audio files and a CUE sheet into an M4B audiobook");
    println!();
    println!("Usage: m4b_from_cue --inputdir <DIR> --cue <FILE> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -i, --inputdir <DIR>   Directory with the source audio files");
    println!("  -c, --cue <FILE>       CUE sheet describing the chapters");
    println!("      --keep             Keep the source files and CUE sheet after assembly");
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
    let cue_file = args
        .iter()
        .position(|a| a == "--cue" || a == "-c")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.to_string());
    let keep = args.iter().any(|a| a == "--keep");

    let (Some(input_dir), Some(cue_file)) = (input_dir, cue_file) else {
        print_usage();
        process::exit(1);
    };

    if let Err(e) = run(Path::new(&input_dir), Path::new(&cue_file), keep) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(dir: &Path, cue_file: &Path, keep: bool) -> chapterize::Result<()> {
    let files = segments::find_audio_files(dir)?;
    if files.is_empty() {
        eprintln!("No audio files found in {}", dir.display());
        process::exit(1);
    }

    let sheet = fs::read_to_string(cue_file)?;
    let chapters = cue::chapters_from_cue(&sheet)?;
    info!("{} chapters from {}", chapters.len(), cue_file.display());

    let title = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audiobook".to_string());
    let output = dir.join(format!("{}.m4b", title));

    let mut job = AssemblyJob::new(files.clone(), output);
    job.chapters = chapters;
    job.title = Some(title);
    job.encode = Config::load().unwrap_or_default().encode_settings();

    let runner = ProcessRunner::new();
    let final_path = Assembler::new(&runner).run(&job)?;
    info!("created {}", final_path.display());

    if !keep {
        for file in &files {
            fs::remove_file(file)?;
        }
        fs::remove_file(cue_file)?;
        info!("removed source files and CUE sheet");
    }

    Ok(())
}
