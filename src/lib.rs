pub mod assembly;
pub mod catalog;
pub mod chapters;
pub mod config;
pub mod cue;
pub mod error;
pub mod ffmpeg;
pub mod probe;
pub mod runner;
pub mod segments;
pub mod silence;
pub mod timecode;

pub use assembly::{Assembler, AssemblyJob, Stage};
pub use catalog::{BookMetadata, RemoteChapterEntry};
pub use chapters::{Chapter, ChapterList};
pub use config::Config;
pub use error::{Error, Result};
pub use ffmpeg::EncodeSettings;
pub use probe::{DurationProbe, FfprobeProbe, SymphoniaProbe};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use silence::{BoundaryPolicy, SilenceOptions};
