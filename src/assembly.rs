//! Assembly orchestrator: drives the external muxer through staged merge
//! operations with temp-file staging and cleanup.
//!
//! Stage order: prepare → concat audio → mux chapters → mux cover → tag
//! metadata → finalize. The chapter, cover, and metadata stages are skipped
//! when their inputs are absent. Every stage writes a fresh sibling temp of
//! the output path and never touches the previous stage's artifact, so a
//! failure leaves everything before it on disk for inspection. The only
//! durable mutation the caller observes is the final rename.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::catalog::BookMetadata;
use crate::chapters::ChapterList;
use crate::error::{Error, Result};
use crate::ffmpeg::{self, EncodeSettings};
use crate::runner::CommandRunner;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prepare,
    ConcatAudio,
    MuxChapters,
    MuxCover,
    TagMetadata,
    Finalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prepare => "prepare",
            Stage::ConcatAudio => "concat audio",
            Stage::MuxChapters => "mux chapters",
            Stage::MuxCover => "mux cover",
            Stage::TagMetadata => "tag metadata",
            Stage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Everything one assembly run needs. The orchestrator owns all temporary
/// artifacts it stages for the job and never mutates the input files.
#[derive(Debug, Clone)]
pub struct AssemblyJob {
    /// Ordered audio inputs, concatenated front to back.
    pub inputs: Vec<PathBuf>,
    /// Derived chapter timeline; an empty list skips the chapter-mux stage.
    pub chapters: ChapterList,
    /// Cover image bytes; absent skips the cover-mux stage.
    pub cover: Option<Vec<u8>>,
    /// Bibliographic fields; absent skips the tagging stage.
    pub metadata: Option<BookMetadata>,
    /// Container title written during the concat stage.
    pub title: Option<String>,
    pub output: PathBuf,
    /// Preserve a pre-existing file at `output` and finalize to a `_new`
    /// sibling instead.
    pub keep_original: bool,
    /// Keep the staged chapter file and cover image after success.
    pub keep_workfiles: bool,
    pub encode: EncodeSettings,
}

impl AssemblyJob {
    pub fn new(inputs: Vec<PathBuf>, output: PathBuf) -> Self {
        AssemblyJob {
            inputs,
            chapters: ChapterList::new(),
            cover: None,
            metadata: None,
            title: None,
            output,
            keep_original: false,
            keep_workfiles: false,
            encode: EncodeSettings::default(),
        }
    }
}

/// Temp path derived deterministically from the output path. Concurrent
/// jobs targeting the same output would collide here; that is the caller's
/// responsibility.
fn staged(output: &Path, tag: &str, ext: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}{}.{}", stem, tag, ext))
}

/// Runs one [`AssemblyJob`] to completion through an injected command
/// runner.
pub struct Assembler<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Assembler<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Assembler { runner }
    }

    /// Execute the pipeline and return the path of the finished container.
    ///
    /// On success all intermediate temps are removed (the chapter file and
    /// cover survive under `keep_workfiles`). On failure the failed stage's
    /// partial output is removed, everything earlier stays on disk, and each
    /// residual path is logged.
    pub fn run(&self, job: &AssemblyJob) -> Result<PathBuf> {
        let mut temps: Vec<(PathBuf, bool)> = Vec::new();

        match self.execute(job, &mut temps) {
            Ok(final_path) => {
                for (path, keepable) in &temps {
                    if *keepable && job.keep_workfiles {
                        continue;
                    }
                    let _ = fs::remove_file(path);
                }
                info!("assembled {}", final_path.display());
                Ok(final_path)
            }
            Err(e) => {
                for (path, _) in temps.iter().filter(|(p, _)| p.exists()) {
                    warn!("preserving temp file for inspection: {}", path.display());
                }
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        job: &AssemblyJob,
        temps: &mut Vec<(PathBuf, bool)>,
    ) -> Result<PathBuf> {
        if job.inputs.is_empty() {
            return Err(Error::Stage {
                stage: Stage::Prepare,
                source: Box::new(Error::CommandFailed(
                    "job has no input audio files".to_string(),
                )),
            });
        }

        let ext = job
            .output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("m4b")
            .to_string();
        let list_path = staged(&job.output, "_input", "txt");
        let chapters_path = staged(&job.output, "_chapters", "txt");
        let cover_path = staged(&job.output, "_cover", "jpg");

        info!("prepare: staging work files next to {}", job.output.display());
        self.prepare(job, &list_path, &chapters_path, &cover_path, temps)?;

        let mut current = staged(&job.output, "_concat", &ext);
        temps.push((current.clone(), false));
        self.exec(
            Stage::ConcatAudio,
            ffmpeg::concat_command(&list_path, job.title.as_deref(), &job.encode, &current),
            &current,
        )?;

        if !job.chapters.is_empty() {
            let out = staged(&job.output, "_chaptered", &ext);
            temps.push((out.clone(), false));
            self.exec(
                Stage::MuxChapters,
                ffmpeg::chapter_mux_command(&current, &chapters_path, &out),
                &out,
            )?;
            current = out;
        }

        if job.cover.is_some() {
            let out = staged(&job.output, "_cover", &ext);
            temps.push((out.clone(), false));
            self.exec(
                Stage::MuxCover,
                ffmpeg::cover_mux_command(&current, &cover_path, &out),
                &out,
            )?;
            current = out;
        }

        if let Some(metadata) = &job.metadata {
            let out = staged(&job.output, "_tagged", &ext);
            temps.push((out.clone(), false));
            self.exec(
                Stage::TagMetadata,
                ffmpeg::metadata_command(&current, metadata, &out),
                &out,
            )?;
            current = out;
        }

        let final_path = if job.keep_original && job.output.exists() {
            staged(&job.output, "_new", &ext)
        } else {
            job.output.clone()
        };
        info!("finalize: {} -> {}", current.display(), final_path.display());
        fs::rename(&current, &final_path).map_err(|e| Error::Stage {
            stage: Stage::Finalize,
            source: Box::new(Error::Io(e)),
        })?;

        Ok(final_path)
    }

    /// Stage the concat list, serialized chapters, and cover bytes.
    fn prepare(
        &self,
        job: &AssemblyJob,
        list_path: &Path,
        chapters_path: &Path,
        cover_path: &Path,
        temps: &mut Vec<(PathBuf, bool)>,
    ) -> Result<()> {
        let mut write_temp = |path: &Path, bytes: &[u8], keepable: bool| -> Result<()> {
            fs::write(path, bytes).map_err(|e| {
                let _ = fs::remove_file(path);
                Error::Stage {
                    stage: Stage::Prepare,
                    source: Box::new(Error::Io(e)),
                }
            })?;
            temps.push((path.to_path_buf(), keepable));
            Ok(())
        };

        write_temp(list_path, ffmpeg::concat_list(&job.inputs).as_bytes(), false)?;
        if !job.chapters.is_empty() {
            write_temp(chapters_path, job.chapters.serialize().as_bytes(), true)?;
        }
        if let Some(cover) = &job.cover {
            write_temp(cover_path, cover, true)?;
        }
        Ok(())
    }

    /// Run one external invocation; on failure remove only its partial
    /// output and tag the error with the stage.
    fn exec(&self, stage: Stage, cmd: Vec<String>, produced: &Path) -> Result<()> {
        info!("{}: {}", stage, produced.display());

        let fail = |source: Error| {
            let _ = fs::remove_file(produced);
            Error::Stage {
                stage,
                source: Box::new(source),
            }
        };

        match self.runner.run(&cmd) {
            Err(e) => Err(fail(e)),
            Ok(output) if !output.success => {
                Err(fail(Error::CommandFailed(output.stderr.trim().to_string())))
            }
            Ok(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use std::cell::RefCell;

    /// Scripted runner: records every command, writes the output file each
    /// command names last, and fails when an argument contains the marker.
    struct FakeRunner {
        fail_marker: Option<&'static str>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl FakeRunner {
        fn new() -> Self {
            FakeRunner {
                fail_marker: None,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing_on(marker: &'static str) -> Self {
            FakeRunner {
                fail_marker: Some(marker),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, cmd: &[String]) -> Result<CommandOutput> {
            self.calls.borrow_mut().push(cmd.to_vec());
            let produced = cmd.last().unwrap().clone();
            fs::write(&produced, b"media").unwrap();

            let fails = self
                .fail_marker
                .map(|m| cmd.iter().any(|a| a.contains(m)))
                .unwrap_or(false);
            Ok(CommandOutput {
                stdout: String::new(),
                stderr: if fails { "boom".to_string() } else { String::new() },
                success: !fails,
            })
        }
    }

    fn job_in(dir: &Path) -> AssemblyJob {
        let inputs = vec![dir.join("01.mp3"), dir.join("02.mp3")];
        for input in &inputs {
            fs::write(input, b"audio").unwrap();
        }
        let mut job = AssemblyJob::new(inputs, dir.join("book.m4b"));
        job.title = Some("book".to_string());
        job
    }

    fn with_chapters(mut job: AssemblyJob) -> AssemblyJob {
        let mut chapters = ChapterList::new();
        chapters.append("Chapter 1", 0, Some(30_000)).unwrap();
        chapters.append("Chapter 2", 30_000, None).unwrap();
        job.chapters = chapters;
        job
    }

    #[test]
    fn test_full_pipeline_stage_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = with_chapters(job_in(dir.path()));
        job.cover = Some(vec![0xff, 0xd8]);
        job.metadata = Some(BookMetadata {
            title: Some("The Book".to_string()),
            authors: Some("A. Writer".to_string()),
            ..BookMetadata::default()
        });

        let runner = FakeRunner::new();
        let final_path = Assembler::new(&runner).run(&job).unwrap();
        assert_eq!(final_path, dir.path().join("book.m4b"));
        assert!(final_path.exists());

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 4);
        assert!(calls[0].iter().any(|a| a == "concat"));
        assert!(calls[1].iter().any(|a| a == "-map_chapters"));
        assert!(calls[2].iter().any(|a| a == "attached_pic"));
        assert!(calls[3].iter().any(|a| a == "artist=A. Writer"));
        // Tagging maps every stream, so the cover muxed in the previous
        // stage reaches the final container
        assert!(calls[3].windows(2).any(|w| w == ["-map", "0"]));
        assert!(!calls[3].iter().any(|a| a == "0:a"));

        // Every intermediate temp is gone
        for tag in [
            "book_input.txt",
            "book_chapters.txt",
            "book_cover.jpg",
            "book_concat.m4b",
            "book_chaptered.m4b",
            "book_cover.m4b",
        ] {
            assert!(!dir.path().join(tag).exists(), "{} should be removed", tag);
        }
    }

    #[test]
    fn test_optional_stages_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());

        let runner = FakeRunner::new();
        Assembler::new(&runner).run(&job).unwrap();
        // No chapters, cover, or metadata: only the concat invocation runs
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[test]
    fn test_cover_failure_preserves_earlier_temps() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = with_chapters(job_in(dir.path()));
        job.cover = Some(vec![0xff, 0xd8]);

        let runner = FakeRunner::failing_on("_cover.m4b");
        let err = Assembler::new(&runner).run(&job).unwrap_err();
        assert!(matches!(
            err,
            Error::Stage {
                stage: Stage::MuxCover,
                ..
            }
        ));

        // The audio+chapters artifact stays for diagnosis, the failed
        // stage's partial output is removed, the final path is untouched.
        assert!(dir.path().join("book_chaptered.m4b").exists());
        assert!(!dir.path().join("book_cover.m4b").exists());
        assert!(!dir.path().join("book.m4b").exists());
    }

    #[test]
    fn test_concat_failure_reports_stage() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());

        let runner = FakeRunner::failing_on("_concat.m4b");
        let err = Assembler::new(&runner).run(&job).unwrap_err();
        assert!(matches!(
            err,
            Error::Stage {
                stage: Stage::ConcatAudio,
                ..
            }
        ));
        assert!(!dir.path().join("book.m4b").exists());
        // The staged concat list survives for inspection
        assert!(dir.path().join("book_input.txt").exists());
    }

    #[test]
    fn test_keep_original_finalizes_to_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = with_chapters(job_in(dir.path()));
        job.keep_original = true;
        fs::write(dir.path().join("book.m4b"), b"precious original").unwrap();

        let runner = FakeRunner::new();
        let final_path = Assembler::new(&runner).run(&job).unwrap();

        assert_eq!(final_path, dir.path().join("book_new.m4b"));
        assert!(final_path.exists());
        assert_eq!(
            fs::read(dir.path().join("book.m4b")).unwrap(),
            b"precious original"
        );
    }

    #[test]
    fn test_keep_workfiles_retains_chapter_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = with_chapters(job_in(dir.path()));
        job.keep_workfiles = true;

        let runner = FakeRunner::new();
        Assembler::new(&runner).run(&job).unwrap();

        assert!(dir.path().join("book_chapters.txt").exists());
        assert!(!dir.path().join("book_input.txt").exists());
        assert!(!dir.path().join("book_concat.m4b").exists());
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let job = AssemblyJob::new(Vec::new(), PathBuf::from("/tmp/none.m4b"));
        let runner = FakeRunner::new();
        let err = Assembler::new(&runner).run(&job).unwrap_err();
        assert!(matches!(
            err,
            Error::Stage {
                stage: Stage::Prepare,
                ..
            }
        ));
        assert!(runner.calls.borrow().is_empty());
    }
}
