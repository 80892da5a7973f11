//! Canonical chapter model and the ffmetadata interchange format.
//!
//! All adapters produce a [`ChapterList`]; the assembly pipeline serializes
//! it to the `[CHAPTER]` block format the muxer consumes. Times are integer
//! milliseconds throughout (timebase 1/1000).

use crate::error::{Error, Result};

/// Serialized end value meaning "extends to end of stream".
const OPEN_END_SENTINEL: i64 = -1;

/// A named, time-bounded segment of the playback timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub start_ms: u64,
    /// `None` means the chapter extends to the end of the media. A bounded
    /// end equal to `start_ms` is a valid placeholder for "extends to the
    /// next chapter's start" where the source format only supplies starts.
    pub end_ms: Option<u64>,
    /// 1-based playback position, contiguous.
    pub index: u32,
}

/// Ordered chapter sequence with monotonicity validation on append.
#[derive(Debug, Clone, Default)]
pub struct ChapterList {
    chapters: Vec<Chapter>,
    overlap_tolerance_ms: u64,
}

// The tolerance is a construction-time policy, not part of the value: two
// lists with the same chapters are the same timeline.
impl PartialEq for ChapterList {
    fn eq(&self, other: &Self) -> bool {
        self.chapters == other.chapters
    }
}

impl Eq for ChapterList {}

impl ChapterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// A list that tolerates starts up to `tolerance_ms` before the previous
    /// chapter's end. Needed by sources whose timeline is shifted by a
    /// constant and clamped at zero.
    pub fn with_overlap_tolerance(tolerance_ms: u64) -> Self {
        ChapterList {
            chapters: Vec::new(),
            overlap_tolerance_ms: tolerance_ms,
        }
    }

    /// Append a chapter, assigning the next sequence index.
    ///
    /// Fails with [`Error::Ordering`] when the chapter starts before the
    /// previous chapter's end (beyond the overlap tolerance), ends before it
    /// starts, or follows an open-ended chapter.
    pub fn append(
        &mut self,
        title: impl Into<String>,
        start_ms: u64,
        end_ms: Option<u64>,
    ) -> Result<()> {
        let index = self.chapters.len() as u32 + 1;

        if let Some(end) = end_ms {
            if end < start_ms {
                return Err(Error::Ordering {
                    index,
                    detail: format!("ends at {}ms before it starts at {}ms", end, start_ms),
                });
            }
        }

        if let Some(prev) = self.chapters.last() {
            match prev.end_ms {
                None => {
                    return Err(Error::Ordering {
                        index,
                        detail: "previous chapter is open-ended".to_string(),
                    });
                }
                Some(prev_end) => {
                    if start_ms + self.overlap_tolerance_ms < prev_end {
                        return Err(Error::Ordering {
                            index,
                            detail: format!(
                                "starts at {}ms before previous chapter ends at {}ms",
                                start_ms, prev_end
                            ),
                        });
                    }
                }
            }
        }

        self.push_unchecked(title, start_ms, end_ms);
        Ok(())
    }

    /// Append without the ordering check, assigning the next index. Only
    /// for reconstructing a previously validated list.
    fn push_unchecked(&mut self, title: impl Into<String>, start_ms: u64, end_ms: Option<u64>) {
        let index = self.chapters.len() as u32 + 1;
        self.chapters.push(Chapter {
            title: title.into(),
            start_ms,
            end_ms,
            index,
        });
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chapter> {
        self.chapters.iter()
    }

    pub fn last(&self) -> Option<&Chapter> {
        self.chapters.last()
    }

    /// Serialize to the ffmetadata chapter dialect: one `[CHAPTER]` block per
    /// chapter in sequence order, times in milliseconds, open ends as `-1`.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for chapter in &self.chapters {
            let end = chapter
                .end_ms
                .map(|e| e as i64)
                .unwrap_or(OPEN_END_SENTINEL);
            out.push_str(&format!(
                "[CHAPTER]\nTIMEBASE=1/1000\nSTART={}\nEND={}\ntitle={}\n\n",
                chapter.start_ms, end, chapter.title
            ));
        }
        out
    }

    /// Parse the format produced by [`ChapterList::serialize`].
    ///
    /// Round-trip contract: `parse(serialize(list)) == list` for any valid
    /// list. The text is a serialization of an already-validated model, so
    /// ordering is not re-checked; malformed fields still fail with
    /// [`Error::Parse`].
    pub fn parse(text: &str) -> Result<ChapterList> {
        let mut list = ChapterList::new();
        let mut block: Option<PendingChapter> = None;

        for line in text.lines() {
            let line = line.trim_end();
            if line == "[CHAPTER]" {
                if let Some(pending) = block.take() {
                    pending.append_to(&mut list)?;
                }
                block = Some(PendingChapter::default());
                continue;
            }
            if line.is_empty() {
                continue;
            }

            let Some(pending) = block.as_mut() else {
                return Err(Error::Parse(format!(
                    "field outside [CHAPTER] block: '{}'",
                    line
                )));
            };

            match line.split_once('=') {
                Some(("TIMEBASE", value)) => {
                    if value != "1/1000" {
                        return Err(Error::Parse(format!("unsupported timebase '{}'", value)));
                    }
                    pending.timebase_seen = true;
                }
                Some(("START", value)) => {
                    pending.start_ms = Some(value.parse().map_err(|_| {
                        Error::Parse(format!("invalid chapter start '{}'", value))
                    })?);
                }
                Some(("END", value)) => {
                    let end: i64 = value.parse().map_err(|_| {
                        Error::Parse(format!("invalid chapter end '{}'", value))
                    })?;
                    pending.end_ms = Some(if end == OPEN_END_SENTINEL {
                        None
                    } else if end >= 0 {
                        Some(end as u64)
                    } else {
                        return Err(Error::Parse(format!("invalid chapter end '{}'", value)));
                    });
                }
                Some(("title", value)) => {
                    pending.title = Some(value.to_string());
                }
                _ => {
                    return Err(Error::Parse(format!("unrecognized record '{}'", line)));
                }
            }
        }

        if let Some(pending) = block.take() {
            pending.append_to(&mut list)?;
        }
        Ok(list)
    }
}

#[derive(Default)]
struct PendingChapter {
    timebase_seen: bool,
    start_ms: Option<u64>,
    end_ms: Option<Option<u64>>,
    title: Option<String>,
}

impl PendingChapter {
    fn append_to(self, list: &mut ChapterList) -> Result<()> {
        if !self.timebase_seen {
            return Err(Error::Parse("chapter block missing TIMEBASE".to_string()));
        }
        let start = self
            .start_ms
            .ok_or_else(|| Error::Parse("chapter block missing START".to_string()))?;
        let end = self
            .end_ms
            .ok_or_else(|| Error::Parse("chapter block missing END".to_string()))?;
        let title = self
            .title
            .ok_or_else(|| Error::Parse("chapter block missing title".to_string()))?;
        list.push_unchecked(title, start, end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_indices() {
        let mut list = ChapterList::new();
        list.append("One", 0, Some(1000)).unwrap();
        list.append("Two", 1000, Some(2000)).unwrap();
        list.append("Three", 2000, None).unwrap();

        let indices: Vec<u32> = list.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_append_rejects_overlap() {
        let mut list = ChapterList::new();
        list.append("One", 0, Some(5000)).unwrap();
        let err = list.append("Two", 4000, Some(9000)).unwrap_err();
        assert!(matches!(err, Error::Ordering { index: 2, .. }));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_append_overlap_within_tolerance() {
        let mut list = ChapterList::with_overlap_tolerance(4000);
        list.append("One", 0, Some(5000)).unwrap();
        list.append("Two", 4000, Some(9000)).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_append_rejects_reversed_range() {
        let mut list = ChapterList::new();
        let err = list.append("Bad", 2000, Some(1000)).unwrap_err();
        assert!(matches!(err, Error::Ordering { .. }));
    }

    #[test]
    fn test_append_after_open_end_fails() {
        let mut list = ChapterList::new();
        list.append("Last", 0, None).unwrap();
        let err = list.append("More", 1000, Some(2000)).unwrap_err();
        assert!(matches!(err, Error::Ordering { .. }));
    }

    #[test]
    fn test_serialize_format() {
        let mut list = ChapterList::new();
        list.append("Chapter 1", 0, Some(12000)).unwrap();
        list.append("Chapter 2", 12000, None).unwrap();

        assert_eq!(
            list.serialize(),
            "[CHAPTER]\nTIMEBASE=1/1000\nSTART=0\nEND=12000\ntitle=Chapter 1\n\n\
             [CHAPTER]\nTIMEBASE=1/1000\nSTART=12000\nEND=-1\ntitle=Chapter 2\n\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let mut list = ChapterList::new();
        list.append("Intro", 0, Some(4000)).unwrap();
        list.append("A title = with equals", 4000, Some(90_493)).unwrap();
        list.append("Finale", 90_493, None).unwrap();

        let parsed = ChapterList::parse(&list.serialize()).unwrap();
        assert_eq!(parsed, list);
    }

    #[test]
    fn test_round_trip_with_tolerated_overlap() {
        // A clamped catalog timeline overlaps its neighbour by up to the
        // buffer; reading the serialized form back must not reject it.
        let mut list = ChapterList::with_overlap_tolerance(4000);
        list.append("One", 0, Some(50_000)).unwrap();
        list.append("Two", 49_000, Some(59_000)).unwrap();

        let parsed = ChapterList::parse(&list.serialize()).unwrap();
        assert_eq!(parsed, list);
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let text = "[CHAPTER]\nTIMEBASE=1/1000\nSTART=0\ntitle=No end\n\n";
        assert!(matches!(
            ChapterList::parse(text),
            Err(Error::Parse(msg)) if msg.contains("END")
        ));
    }

    #[test]
    fn test_parse_rejects_foreign_timebase() {
        let text = "[CHAPTER]\nTIMEBASE=1/90000\nSTART=0\nEND=100\ntitle=X\n\n";
        assert!(matches!(ChapterList::parse(text), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_empty_input() {
        let list = ChapterList::parse("").unwrap();
        assert!(list.is_empty());
    }
}
