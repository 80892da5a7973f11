//! Command builders for every external tool invocation.
//!
//! All builders are pure: they return the argv the runner will execute, so
//! tests assert on command shape directly. Paths are passed as single argv
//! elements, never through a shell.

use std::path::{Path, PathBuf};

use crate::catalog::BookMetadata;

/// Audio encode parameters for the concat stage.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    /// Target AAC bitrate, e.g. "112k".
    pub bitrate: String,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Pass the audio stream through unchanged instead of re-encoding.
    /// Used when the input is already a finished M4B.
    pub copy_audio: bool,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        EncodeSettings {
            bitrate: "112k".to_string(),
            sample_rate: 44_100,
            copy_audio: false,
        }
    }
}

fn arg(s: impl Into<String>) -> String {
    s.into()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// The concat demuxer's input list: one `file '<absolute path>'` line per
/// input, with embedded single quotes escaped as `'\''`.
pub fn concat_list(files: &[PathBuf]) -> String {
    let mut out = String::new();
    for file in files {
        let absolute = std::fs::canonicalize(file).unwrap_or_else(|_| file.clone());
        let escaped = absolute.to_string_lossy().replace('\'', "'\\''");
        out.push_str(&format!("file '{}'\n", escaped));
    }
    out
}

/// Concatenate the listed inputs into one container.
pub fn concat_command(
    list_file: &Path,
    title: Option<&str>,
    enc: &EncodeSettings,
    output: &Path,
) -> Vec<String> {
    let mut cmd = vec![
        arg("ffmpeg"),
        arg("-f"),
        arg("concat"),
        arg("-safe"),
        arg("0"),
        arg("-i"),
        path_arg(list_file),
        arg("-map"),
        arg("0:a"),
    ];
    if let Some(title) = title {
        cmd.push(arg("-metadata"));
        cmd.push(format!("title={}", title));
    }
    if enc.copy_audio {
        cmd.extend([arg("-c:a"), arg("copy")]);
    } else {
        cmd.extend([
            arg("-c:a"),
            arg("aac"),
            arg("-b:a"),
            enc.bitrate.clone(),
            arg("-ar"),
            enc.sample_rate.to_string(),
        ]);
    }
    cmd.extend([arg("-y"), path_arg(output)]);
    cmd
}

/// Mux a serialized chapter file into the container, audio untouched.
pub fn chapter_mux_command(input: &Path, chapters_file: &Path, output: &Path) -> Vec<String> {
    vec![
        arg("ffmpeg"),
        arg("-i"),
        path_arg(input),
        arg("-f"),
        arg("ffmetadata"),
        arg("-i"),
        path_arg(chapters_file),
        arg("-map"),
        arg("0:a"),
        arg("-map_chapters"),
        arg("1"),
        arg("-map_metadata"),
        arg("1"),
        arg("-c:a"),
        arg("copy"),
        arg("-y"),
        path_arg(output),
    ]
}

/// Attach a cover image as the container's front-cover picture stream.
pub fn cover_mux_command(input: &Path, cover_file: &Path, output: &Path) -> Vec<String> {
    vec![
        arg("ffmpeg"),
        arg("-i"),
        path_arg(input),
        arg("-i"),
        path_arg(cover_file),
        arg("-map"),
        arg("0:a"),
        arg("-map"),
        arg("1:v"),
        arg("-c:a"),
        arg("copy"),
        arg("-c:v"),
        arg("png"),
        arg("-disposition:v:0"),
        arg("attached_pic"),
        arg("-metadata:s:v"),
        arg("title=Album cover"),
        arg("-metadata:s:v"),
        arg("comment=Cover (front)"),
        arg("-y"),
        path_arg(output),
    ]
}

/// Write bibliographic tags; only resolved fields are emitted. Every
/// stream of the input passes through unchanged, so a cover picture
/// attached by an earlier stage survives tagging.
///
/// Field mapping: title → title and album, authors → artist and
/// album_artist, narrators → composer, description → comment, year → date.
pub fn metadata_command(input: &Path, metadata: &BookMetadata, output: &Path) -> Vec<String> {
    let mut cmd = vec![arg("ffmpeg"), arg("-i"), path_arg(input), arg("-map"), arg("0")];

    let mut tag = |key: &str, value: &Option<String>| {
        if let Some(value) = value {
            cmd.push(arg("-metadata"));
            cmd.push(format!("{}={}", key, value));
        }
    };
    tag("title", &metadata.title);
    tag("album", &metadata.title);
    tag("artist", &metadata.authors);
    tag("album_artist", &metadata.authors);
    tag("composer", &metadata.narrators);
    tag("comment", &metadata.description);
    tag("date", &metadata.year);

    cmd.extend([arg("-c"), arg("copy"), arg("-y"), path_arg(output)]);
    cmd
}

/// Loudness analysis over one file; results land on the diagnostic channel.
pub fn silencedetect_command(input: &Path, noise_floor_db: f64, min_silence_sec: f64) -> Vec<String> {
    vec![
        arg("ffmpeg"),
        arg("-i"),
        path_arg(input),
        arg("-af"),
        format!("silencedetect=n={}dB:d={}", noise_floor_db, min_silence_sec),
        arg("-f"),
        arg("null"),
        arg("-"),
    ]
}

/// Container duration in seconds, printed bare on stdout.
pub fn ffprobe_duration_command(input: &Path) -> Vec<String> {
    vec![
        arg("ffprobe"),
        arg("-v"),
        arg("error"),
        arg("-show_entries"),
        arg("format=duration"),
        arg("-of"),
        arg("default=noprint_wrappers=1:nokey=1"),
        path_arg(input),
    ]
}
