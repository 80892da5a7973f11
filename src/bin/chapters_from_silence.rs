//! Add chapters to an existing M4B audiobook by detecting silences.

use chapterize::assembly::{Assembler, AssemblyJob};
use chapterize::{silence, Config, ProcessRunner, SilenceOptions};
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::env;
use std::path::{Path, PathBuf};
use std::process;

fn print_usage() {
    println!("Add chapters to an M4B audiobook from detected silences");
    println!();
    println!("Usage: chapters_from_silence --input <FILE> --min <SECS> --max <SECS> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -i, --input <FILE>   Input M4B file");
    println!("      --min <SECS>     Minimum silence duration to report");
    println!("      --max <SECS>     Maximum silence duration treated as a boundary");
    println!("      --level <DB>     Silence level in dB (default: -30)");
    println!("      --overwrite      Replace the input file instead of writing a sibling");
    println!("      --help           Show this help message");
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

    let defaults = Config::load().unwrap_or_default();

    let input = args
        .iter()
        .position(|a| a == "--input" || a == "-i")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.to_string());
    let min_silence = args
        .iter()
        .position(|a| a == "--min")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse::<f64>().ok())
        .or(defaults.min_silence);
    let max_silence = args
        .iter()
        .position(|a| a == "--max")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse::<f64>().ok())
        .or(defaults.max_silence);
    let level = args
        .iter()
        .position(|a| a == "--level")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse::<f64>().ok())
        .or(defaults.silence_level)
        .unwrap_or(-30.0);
    let overwrite = args.iter().any(|a| a == "--overwrite");

    let (Some(input), Some(min_silence), Some(max_silence)) = (input, min_silence, max_silence)
    else {
        print_usage();
        process::exit(1);
    };

    if let Err(e) = run(Path::new(&input), min_silence, max_silence, level, overwrite) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(
    input: &Path,
    min_silence: f64,
    max_silence: f64,
    level: f64,
    overwrite: bool,
) -> chapterize::Result<()> {
    let mut opts = SilenceOptions::new(min_silence, max_silence);
    opts.noise_floor_db = level;

    let runner = ProcessRunner::new();
    info!("detecting silence in {}", input.display());
    let detection_log = silence::detect_silence(&runner, input, &opts)?;
    let chapters = silence::chapters_from_silence(&detection_log, &opts)?;
    info!("{} chapters derived", chapters.len());

    let output = if overwrite {
        input.to_path_buf()
    } else {
        chapterized_path(input)
    };

    let mut job = AssemblyJob::new(vec![input.to_path_buf()], output);
    job.chapters = chapters;
    job.encode.copy_audio = true; // the input is already a finished container

    let final_path = Assembler::new(&runner).run(&job)?;
    info!("chapters added to {}", final_path.display());

    Ok(())
}

/// Sibling output path: `book.m4b` becomes `book_chapterized.m4b`.
fn chapterized_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("m4b");
    input.with_file_name(format!("{}_chapterized.{}", stem, ext))
}
