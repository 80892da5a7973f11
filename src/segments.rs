//! Uniform segmentation: one chapter per input file.

use std::path::{Path, PathBuf};

use crate::chapters::ChapterList;
use crate::error::Result;
use crate::probe::DurationProbe;
use crate::timecode::natural_order_key;

/// Extensions recognized as audiobook source audio.
pub const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "m4b", "aac", "m4a", "wav"];

/// Derive chapters from an ordered file sequence, one chapter per file.
///
/// Chapter `i` starts at the cumulative duration of the files before it and
/// ends where its own probed duration runs out. Titles are "Chapter N". Any
/// probe failure fails the whole derivation; no partial list is returned.
pub fn chapters_from_files(files: &[PathBuf], probe: &dyn DurationProbe) -> Result<ChapterList> {
    let mut list = ChapterList::new();
    let mut total_seconds = 0.0;

    for (i, file) in files.iter().enumerate() {
        let duration = probe.probe(file)?;
        let start_ms = (total_seconds * 1000.0) as u64;
        let end_ms = ((total_seconds + duration) * 1000.0) as u64;
        list.append(format!("Chapter {}", i + 1), start_ms, Some(end_ms))?;
        total_seconds += duration;
    }

    Ok(list)
}

/// Collect the audio files directly under `dir`, naturally sorted so
/// `track2.mp3` precedes `track10.mp3`.
pub fn find_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .map(|e| {
                let ext = e.to_string_lossy().to_lowercase();
                AUDIO_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    files.sort_by_key(|p| natural_order_key(p));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;
    use std::fs::File;

    struct MapProbe(HashMap<PathBuf, f64>);

    impl DurationProbe for MapProbe {
        fn probe(&self, path: &Path) -> Result<f64> {
            self.0.get(path).copied().ok_or_else(|| Error::Probe {
                path: path.to_path_buf(),
                message: "unknown file".to_string(),
            })
        }
    }

    #[test]
    fn test_cumulative_starts() {
        let files = vec![PathBuf::from("01.mp3"), PathBuf::from("02.mp3")];
        let probe = MapProbe(HashMap::from([
            (PathBuf::from("01.mp3"), 30.5),
            (PathBuf::from("02.mp3"), 45.0),
        ]));

        let list = chapters_from_files(&files, &probe).unwrap();
        let got: Vec<(u64, Option<u64>)> = list.iter().map(|c| (c.start_ms, c.end_ms)).collect();
        assert_eq!(got, vec![(0, Some(30_500)), (30_500, Some(75_500))]);

        let titles: Vec<&str> = list.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Chapter 1", "Chapter 2"]);
    }

    #[test]
    fn test_probe_failure_aborts() {
        let files = vec![PathBuf::from("01.mp3"), PathBuf::from("02.mp3")];
        let probe = MapProbe(HashMap::from([(PathBuf::from("01.mp3"), 30.5)]));
        assert!(matches!(
            chapters_from_files(&files, &probe),
            Err(Error::Probe { .. })
        ));
    }

    #[test]
    fn test_empty_file_list() {
        let probe = MapProbe(HashMap::new());
        let list = chapters_from_files(&[], &probe).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_find_audio_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["track10.mp3", "track2.mp3", "notes.txt", "cover.jpg", "intro.M4A"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let files = find_audio_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["intro.M4A", "track2.mp3", "track10.mp3"]);
    }
}
