//! Duration probing.
//!
//! Two implementations behind one trait: a local probe that reads container
//! headers with symphonia (no external tools), and an ffprobe-backed probe
//! for formats whose headers the local stack cannot time.

use std::fs::File;
use std::path::Path;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};
use crate::ffmpeg;
use crate::runner::CommandRunner;

/// Measures the playable duration of an audio file, in seconds.
pub trait DurationProbe {
    fn probe(&self, path: &Path) -> Result<f64>;
}

/// Header-based probe using symphonia's format readers.
#[derive(Debug, Default)]
pub struct SymphoniaProbe;

impl SymphoniaProbe {
    pub fn new() -> Self {
        SymphoniaProbe
    }
}

impl DurationProbe for SymphoniaProbe {
    fn probe(&self, path: &Path) -> Result<f64> {
        let probe_err = |message: String| Error::Probe {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| probe_err(e.to_string()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| probe_err(format!("unreadable format: {}", e)))?;

        let track = probed
            .format
            .default_track()
            .ok_or_else(|| probe_err("no audio track".to_string()))?;

        let params = &track.codec_params;
        let n_frames = params
            .n_frames
            .ok_or_else(|| probe_err("container reports no frame count".to_string()))?;

        if let Some(time_base) = params.time_base {
            let time = time_base.calc_time(n_frames);
            Ok(time.seconds as f64 + time.frac)
        } else if let Some(sample_rate) = params.sample_rate {
            Ok(n_frames as f64 / sample_rate as f64)
        } else {
            Err(probe_err("container reports no time base".to_string()))
        }
    }
}

/// Probe that shells out to ffprobe through the command runner.
pub struct FfprobeProbe<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> FfprobeProbe<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        FfprobeProbe { runner }
    }
}

impl DurationProbe for FfprobeProbe<'_> {
    fn probe(&self, path: &Path) -> Result<f64> {
        let cmd = ffmpeg::ffprobe_duration_command(path);
        let output = self.runner.run(&cmd)?;
        if !output.success {
            return Err(Error::Probe {
                path: path.to_path_buf(),
                message: output.stderr.trim().to_string(),
            });
        }
        output.stdout.trim().parse().map_err(|_| Error::Probe {
            path: path.to_path_buf(),
            message: format!("unparsable duration '{}'", output.stdout.trim()),
        })
    }
}
