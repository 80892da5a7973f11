//! Chapter boundaries from silence detection.
//!
//! The loudness analysis is an external `ffmpeg silencedetect` run; this
//! module parses its diagnostic output and turns qualifying silences into
//! chapter boundaries. A silence qualifies when its duration does not exceed
//! the configured maximum plus a fixed jitter band; longer gaps (a narrator's
//! dramatic pause, a disc-change gap) are ignored.

use std::path::Path;

use log::{debug, info};

use crate::chapters::ChapterList;
use crate::error::{Error, Result};
use crate::ffmpeg;
use crate::runner::CommandRunner;

/// Tolerance band absorbing detector jitter around the maximum duration.
const DETECTOR_JITTER_SEC: f64 = 0.25;

/// A detected low-loudness span, transient output of the analysis parse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceInterval {
    pub start_sec: f64,
    pub end_sec: f64,
    pub duration_sec: f64,
}

/// Where in a qualifying silence the chapter boundary is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryPolicy {
    /// Boundary at the end of the silence: speech right after a pause opens
    /// the new chapter, the pause itself folds into the preceding chapter.
    #[default]
    SilenceEnd,
    /// Boundary at the start of the silence.
    SilenceStart,
}

#[derive(Debug, Clone)]
pub struct SilenceOptions {
    /// Minimum gap length for the analysis to report a silence at all.
    pub min_silence_sec: f64,
    /// Longest gap still treated as a chapter boundary.
    pub max_silence_sec: f64,
    pub noise_floor_db: f64,
    pub boundary: BoundaryPolicy,
}

impl SilenceOptions {
    pub fn new(min_silence_sec: f64, max_silence_sec: f64) -> Self {
        SilenceOptions {
            min_silence_sec,
            max_silence_sec,
            noise_floor_db: -30.0,
            boundary: BoundaryPolicy::default(),
        }
    }
}

/// Parse `silencedetect` diagnostic text into intervals, in report order.
///
/// The analysis emits alternating `silence_start:` and `silence_end:`
/// records; the end record also carries `silence_duration:`. Anything
/// misordered or unparsable fails with [`Error::Parse`].
pub fn parse_silence_log(output: &str) -> Result<Vec<SilenceInterval>> {
    let mut intervals = Vec::new();
    let mut pending_start: Option<f64> = None;

    for line in output.lines() {
        if line.contains("silence_start") {
            let start = field_after(line, "silence_start:")
                .ok_or_else(|| Error::Parse(format!("bad silence_start record: '{}'", line)))?;
            pending_start = Some(start);
        } else if line.contains("silence_end") {
            let start = pending_start.take().ok_or_else(|| {
                Error::Parse(format!("silence_end without silence_start: '{}'", line))
            })?;
            let end = field_after(line, "silence_end:")
                .ok_or_else(|| Error::Parse(format!("bad silence_end record: '{}'", line)))?;
            let duration = field_after(line, "silence_duration:").ok_or_else(|| {
                Error::Parse(format!("silence_end missing duration: '{}'", line))
            })?;
            intervals.push(SilenceInterval {
                start_sec: start,
                end_sec: end,
                duration_sec: duration,
            });
        }
    }

    Ok(intervals)
}

/// Extract the numeric token following `marker` on a detection line.
fn field_after(line: &str, marker: &str) -> Option<f64> {
    let mut tokens = line.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == marker {
            return tokens.next().and_then(|v| v.parse().ok());
        }
    }
    None
}

/// Derive chapters from a silence-detection log.
///
/// Boundaries are placed per `opts.boundary` at each qualifying silence;
/// titles are auto-generated as "Chapter N" in detection order. With zero
/// qualifying silences the whole file becomes a single open-ended chapter.
pub fn chapters_from_silence(detection_log: &str, opts: &SilenceOptions) -> Result<ChapterList> {
    let intervals = parse_silence_log(detection_log)?;
    let cutoff = opts.max_silence_sec + DETECTOR_JITTER_SEC;

    let mut list = ChapterList::new();
    let mut current_start_ms: u64 = 0;
    let mut accepted = 0u32;

    for interval in &intervals {
        if interval.duration_sec > cutoff {
            debug!(
                "ignoring {:.2}s silence at {:.2}s (over {:.2}s cutoff)",
                interval.duration_sec, interval.start_sec, cutoff
            );
            continue;
        }

        let boundary_sec = match opts.boundary {
            BoundaryPolicy::SilenceEnd => interval.end_sec,
            BoundaryPolicy::SilenceStart => interval.start_sec,
        };
        let boundary_ms = (boundary_sec * 1000.0) as u64;

        accepted += 1;
        info!(
            "silence at {:.2}s - {:.2}s ({:.2}s), chapter boundary at {:.2}s",
            interval.start_sec, interval.end_sec, interval.duration_sec, boundary_sec
        );

        list.append(format!("Chapter {}", accepted), current_start_ms, Some(boundary_ms))?;
        current_start_ms = boundary_ms;
    }

    // The tail after the last boundary (or the whole file) runs to the end
    // of the media.
    list.append(format!("Chapter {}", accepted + 1), current_start_ms, None)?;

    Ok(list)
}

/// Run the loudness analysis over `input` and return its diagnostic output.
///
/// `silencedetect` reports on the diagnostic channel, so the returned text
/// is the command's stderr.
pub fn detect_silence(
    runner: &dyn CommandRunner,
    input: &Path,
    opts: &SilenceOptions,
) -> Result<String> {
    let cmd = ffmpeg::silencedetect_command(input, opts.noise_floor_db, opts.min_silence_sec);
    let output = runner.run(&cmd)?;
    if !output.success {
        return Err(Error::CommandFailed(format!(
            "silence detection on {}: {}",
            input.display(),
            output.stderr.trim()
        )));
    }
    Ok(output.stderr)
}
