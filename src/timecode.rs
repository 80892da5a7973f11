//! Timecode and duration conversions, plus natural filename ordering.

use std::path::Path;

/// CD Red Book frame rate used by CUE sheet `INDEX` timecodes.
pub const CUE_FRAMES_PER_SECOND: u64 = 75;

/// Convert a CUE `MM:SS:FF` timecode to milliseconds.
///
/// Frames are 1/75th of a second; the sub-millisecond remainder truncates.
pub fn cue_timecode_to_ms(minutes: u64, seconds: u64, frames: u64) -> u64 {
    minutes * 60_000 + seconds * 1_000 + frames * 1_000 / CUE_FRAMES_PER_SECOND
}

/// Format a duration in seconds as zero-padded `HH:MM:SS`, truncating any
/// sub-second remainder.
pub fn seconds_to_hms(total_seconds: f64) -> String {
    let total = total_seconds as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Sort key that orders `track2.mp3` before `track10.mp3`.
///
/// The basename is split into alternating non-digit/digit runs; digit runs
/// compare numerically, non-digit runs compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalKey(Vec<Piece>);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Piece {
    // Text sorts before Number so "a.mp3" < "1.mp3" is stable either way a
    // mixed run pair lines up.
    Text(String),
    Number(u128),
}

/// Build the natural ordering key for a path's basename.
pub fn natural_order_key(path: &Path) -> NaturalKey {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut pieces = Vec::new();
    let mut run = String::new();
    let mut run_is_digit = false;

    for c in name.chars() {
        if c.is_ascii_digit() == run_is_digit {
            run.push(c);
        } else {
            if !run.is_empty() {
                pieces.push(make_piece(&run, run_is_digit));
            }
            run.clear();
            run.push(c);
            run_is_digit = c.is_ascii_digit();
        }
    }
    if !run.is_empty() {
        pieces.push(make_piece(&run, run_is_digit));
    }

    NaturalKey(pieces)
}

fn make_piece(run: &str, is_digit: bool) -> Piece {
    if is_digit {
        Piece::Number(run.parse().unwrap_or(u128::MAX))
    } else {
        Piece::Text(run.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cue_timecode_to_ms() {
        assert_eq!(cue_timecode_to_ms(0, 0, 0), 0);
        assert_eq!(cue_timecode_to_ms(0, 1, 0), 1_000);
        assert_eq!(cue_timecode_to_ms(2, 30, 0), 150_000);

        // 37 frames = floor(37000/75) = 493 ms
        assert_eq!(cue_timecode_to_ms(1, 30, 37), 90_493);

        // 74 frames stays below the next second
        assert_eq!(cue_timecode_to_ms(0, 0, 74), 986);
    }

    #[test]
    fn test_seconds_to_hms() {
        assert_eq!(seconds_to_hms(0.0), "00:00:00");
        assert_eq!(seconds_to_hms(59.0), "00:00:59");
        assert_eq!(seconds_to_hms(61.5), "00:01:01"); // truncates, not rounds
        assert_eq!(seconds_to_hms(3661.999), "01:01:01");
        assert_eq!(seconds_to_hms(36000.0), "10:00:00");
    }

    #[test]
    fn test_natural_order_numeric_runs() {
        let a = natural_order_key(Path::new("track2.mp3"));
        let b = natural_order_key(Path::new("track10.mp3"));
        assert!(a < b);

        // Pure lexical sort would get this wrong
        let mut files = vec![
            PathBuf::from("dir/track10.mp3"),
            PathBuf::from("dir/track2.mp3"),
            PathBuf::from("dir/track1.mp3"),
        ];
        files.sort_by_key(|p| natural_order_key(p));
        assert_eq!(
            files,
            vec![
                PathBuf::from("dir/track1.mp3"),
                PathBuf::from("dir/track2.mp3"),
                PathBuf::from("dir/track10.mp3"),
            ]
        );
    }

    #[test]
    fn test_natural_order_case_insensitive() {
        let a = natural_order_key(Path::new("Chapter 3.mp3"));
        let b = natural_order_key(Path::new("chapter 12.mp3"));
        assert!(a < b);
    }

    #[test]
    fn test_natural_order_equal_names() {
        let a = natural_order_key(Path::new("one/Part 1.mp3"));
        let b = natural_order_key(Path::new("two/part 1.mp3"));
        assert_eq!(a, b); // only the basename participates
    }
}
