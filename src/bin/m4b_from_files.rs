//! Create an M4B audiobook from split audio files, one chapter per file.

use chapterize::assembly::{Assembler, AssemblyJob};
use chapterize::{segments, Config, ProcessRunner, SymphoniaProbe};
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn print_usage() {
    println!("Create an M4B audiobook from split audio files");
    println!();
    println!("Usage: m4b_from_files --inputdir <DIR> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -i, --inputdir <DIR>   Directory with the source audio files");
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
    let keep = args.iter().any(|a| a == "--keep");

    let Some(input_dir) = input_dir else {
        print_usage();
        process::exit(1);
    };

    if let Err(e) = run(Path::new(&input_dir), keep) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(dir: &Path, keep: bool) -> chapterize::Result<()> {
    let files = segments::find_audio_files(dir)?;
    if files.is_empty() {
        eprintln!("No audio files found in {}", dir.display());
        process::exit(1);
    }

    let probe = SymphoniaProbe::new();
    let chapters = segments::chapters_from_files(&files, &probe)?;

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
        info!("removed {} source files", files.len());
    }

    Ok(())
}
