//! Create a CUE sheet from a directory of audio files, one track per file.

use chapterize::{cue, segments, SymphoniaProbe};
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn print_usage() {
    println!("Create a CUE sheet using each audio file as a chapter");
    println!();
    println!("Usage: cue_from_files --inputdir <DIR>");
    println!();
    println!("Options:");
    println!("  -i, --inputdir <DIR>   Directory with the source audio files");
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

    let Some(input_dir) = input_dir else {
        print_usage();
        process::exit(1);
    };

    if let Err(e) = run(Path::new(&input_dir)) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(dir: &Path) -> chapterize::Result<()> {
    let files = segments::find_audio_files(dir)?;
    if files.is_empty() {
        eprintln!("No audio files found in {}", dir.display());
        process::exit(1);
    }

    let title = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "album".to_string());

    let probe = SymphoniaProbe::new();
    let sheet = cue::generate_cue_sheet(&title, &files, &probe)?;

    let cue_path = cue::cue_path_for_dir(dir);
    fs::write(&cue_path, sheet)?;
    info!("wrote {}", cue_path.display());

    Ok(())
}
