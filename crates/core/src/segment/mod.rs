//! Merges time-ordered cues into sentence-level segments.
//! A cue is never split; consecutive cues are joined until one of them ends
//! with sentence-terminating punctuation.

use crate::srt::Cue;
use serde::{Deserialize, Serialize};

/// Characters that end a sentence.
pub const SENTENCE_TERMINATORS: [char; 7] = ['。', '.', '!', '?', '！', '？', '…'];

/// Closing quotes ignored when looking for a terminator.
pub const CLOSING_QUOTES: [char; 4] = ['"', '\'', '”', '’'];

/// A sentence-aligned span covering one or more consecutive cues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Declared indices of the cues this segment was built from, in order.
    pub covered_indices: Vec<i64>,
}

#[derive(Default)]
struct Accumulator {
    start: Option<f64>,
    end: f64,
    texts: Vec<String>,
    indices: Vec<i64>,
}

impl Accumulator {
    fn push(&mut self, cue: &Cue) {
        if self.start.is_none() {
            self.start = Some(cue.start_sec);
        }
        self.end = cue.end_sec;
        self.texts.push(cue.text.clone());
        self.indices.push(cue.index);
    }

    /// Close the open group into a segment, leaving the accumulator empty.
    fn flush(&mut self) -> Option<Segment> {
        let open = std::mem::take(self);
        Some(Segment {
            start: open.start?,
            end: open.end,
            text: open.texts.join(" "),
            covered_indices: open.indices,
        })
    }
}

/// Group cues into sentence segments in a single pass.
/// Input order is preserved; trailing cues without a terminator still form a
/// final segment.
pub fn merge_cues(cues: &[Cue]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut open = Accumulator::default();
    for cue in cues {
        open.push(cue);
        if ends_with_sentence_terminator(&cue.text) {
            segments.extend(open.flush());
        }
    }
    segments.extend(open.flush());
    segments
}

/// True when `text`, ignoring surrounding whitespace and trailing closing
/// quotes, ends with one of [`SENTENCE_TERMINATORS`].
pub fn ends_with_sentence_terminator(text: &str) -> bool {
    text.trim()
        .trim_end_matches(CLOSING_QUOTES)
        .chars()
        .next_back()
        .is_some_and(|c| SENTENCE_TERMINATORS.contains(&c))
}
