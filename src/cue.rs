//! CUE sheet parsing and generation.
//!
//! Parsing turns a track listing into chapters: each `TRACK` block must
//! carry a quoted `TITLE` and an `INDEX 01 MM:SS:FF` timecode (75 frames per
//! second). Generation is the inverse direction used when the chapters are
//! derived from per-file durations and a sheet is wanted as a side artifact.

use std::path::{Path, PathBuf};

use log::info;

use crate::chapters::ChapterList;
use crate::error::{Error, Result};
use crate::probe::DurationProbe;
use crate::timecode::{cue_timecode_to_ms, seconds_to_hms};

/// A parsed `TRACK` block, transient input to chapter derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueTrack {
    pub number: u32,
    pub title: String,
    pub minutes: u64,
    pub seconds: u64,
    pub frames: u64,
}

impl CueTrack {
    pub fn start_ms(&self) -> u64 {
        cue_timecode_to_ms(self.minutes, self.seconds, self.frames)
    }
}

/// Parse the `TRACK` blocks of a CUE sheet.
///
/// Header lines before the first `TRACK` (disc `TITLE`, `PERFORMER`,
/// `FILE`, `REM`) are ignored. Every track must have both a title and an
/// `INDEX 01` timecode with frames below 75, else [`Error::MalformedCue`].
pub fn parse_cue(text: &str) -> Result<Vec<CueTrack>> {
    let mut tracks = Vec::new();
    let mut block: Option<TrackBlock> = None;

    for line in text.lines() {
        let line = line.trim();

        if line.starts_with("TRACK") {
            if let Some(done) = block.take() {
                tracks.push(done.finish()?);
            }
            let number = line
                .split_whitespace()
                .nth(1)
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| Error::MalformedCue(format!("bad TRACK line: '{}'", line)))?;
            block = Some(TrackBlock::new(number));
        } else if let Some(current) = block.as_mut() {
            if line.starts_with("TITLE") {
                current.title = Some(quoted_value(line).ok_or_else(|| {
                    Error::MalformedCue(format!(
                        "track {}: TITLE without quoted value",
                        current.number
                    ))
                })?);
            } else if line.starts_with("INDEX 01") {
                current.index = Some(parse_index_timecode(line, current.number)?);
            }
        }
    }

    if let Some(done) = block.take() {
        tracks.push(done.finish()?);
    }
    Ok(tracks)
}

struct TrackBlock {
    number: u32,
    title: Option<String>,
    index: Option<(u64, u64, u64)>,
}

impl TrackBlock {
    fn new(number: u32) -> Self {
        TrackBlock {
            number,
            title: None,
            index: None,
        }
    }

    fn finish(self) -> Result<CueTrack> {
        match (self.title, self.index) {
            (Some(title), Some((minutes, seconds, frames))) => Ok(CueTrack {
                number: self.number,
                title,
                minutes,
                seconds,
                frames,
            }),
            (Some(_), None) => Err(Error::MalformedCue(format!(
                "track {} has a TITLE but no INDEX 01",
                self.number
            ))),
            (None, _) => Err(Error::MalformedCue(format!(
                "track {} has no TITLE",
                self.number
            ))),
        }
    }
}

/// The string between the first pair of double quotes.
fn quoted_value(line: &str) -> Option<String> {
    let mut parts = line.splitn(3, '"');
    parts.next()?;
    parts.next().map(|s| s.to_string()).filter(|_| line.matches('"').count() >= 2)
}

fn parse_index_timecode(line: &str, track: u32) -> Result<(u64, u64, u64)> {
    let timecode = line
        .split_whitespace()
        .nth(2)
        .ok_or_else(|| Error::MalformedCue(format!("track {}: INDEX 01 without timecode", track)))?;

    let fields: Vec<u64> = timecode
        .split(':')
        .map(|f| f.parse())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| {
            Error::MalformedCue(format!("track {}: bad timecode '{}'", track, timecode))
        })?;
    if fields.len() != 3 {
        return Err(Error::MalformedCue(format!(
            "track {}: bad timecode '{}'",
            track, timecode
        )));
    }
    if fields[2] >= 75 {
        return Err(Error::MalformedCue(format!(
            "track {}: frame count {} out of range",
            track, fields[2]
        )));
    }
    Ok((fields[0], fields[1], fields[2]))
}

/// Derive chapters from a CUE sheet.
///
/// Each track becomes a chapter starting at its `INDEX 01` time; it ends one
/// millisecond before the next track starts, so adjacent chapters never
/// overlap. The final track runs to the end of the media.
pub fn chapters_from_cue(text: &str) -> Result<ChapterList> {
    let tracks = parse_cue(text)?;
    if tracks.is_empty() {
        return Err(Error::MalformedCue("no TRACK blocks found".to_string()));
    }

    let mut list = ChapterList::new();
    for (i, track) in tracks.iter().enumerate() {
        let start = track.start_ms();
        let end = match tracks.get(i + 1) {
            Some(next) => Some(next.start_ms().saturating_sub(1)),
            None => None,
        };
        list.append(track.title.clone(), start, end)?;
    }
    Ok(list)
}

/// Generate a CUE sheet from an ordered file set, one track per file.
///
/// Track start times come from cumulative probed durations, written at
/// whole-second precision. The caller supplies files already naturally
/// sorted.
pub fn generate_cue_sheet(
    album_title: &str,
    files: &[PathBuf],
    probe: &dyn DurationProbe,
) -> Result<String> {
    let mut sheet = format!("TITLE \"{}\"\n\n", album_title);

    let mut total_seconds = 0.0;
    for (i, file) in files.iter().enumerate() {
        let duration = probe.probe(file)?;
        let start = seconds_to_hms(total_seconds);
        info!(
            "Chapter {}: {} - Duration: {:.2}s - Start Time: {}",
            i + 1,
            file.display(),
            duration,
            start
        );

        sheet.push_str(&format!("TRACK {} AUDIO\n", i + 1));
        sheet.push_str(&format!("  TITLE \"Chapter {}\"\n", i + 1));
        sheet.push_str(&format!("  INDEX 01 {}\n\n", start));

        total_seconds += duration;
    }

    Ok(sheet)
}

/// Default CUE sheet path for a directory of audio files: the directory's
/// own name with a `.cue` extension, inside the directory.
pub fn cue_path_for_dir(dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "album".to_string());
    dir.join(format!("{}.cue", name))
}
