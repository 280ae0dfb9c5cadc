//! Practice projects and their ordered sentences.
//!
//! A project owns its sentences; they are stored inline and go away with it.
//! Projects built from subtitles carry per-sentence timing into the imported
//! source audio, projects built from text carry none.

use crate::segment::Segment;
use crate::text::split_sentences;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Self-assessed practice state of a sentence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SentenceStatus {
    #[default]
    NotStarted,
    Recorded,
    NeedsReview,
    Approved,
}

impl fmt::Display for SentenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentenceStatus::NotStarted => write!(f, "notStarted"),
            SentenceStatus::Recorded => write!(f, "recorded"),
            SentenceStatus::NeedsReview => write!(f, "needsReview"),
            SentenceStatus::Approved => write!(f, "approved"),
        }
    }
}

impl std::str::FromStr for SentenceStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notStarted" => Ok(SentenceStatus::NotStarted),
            "recorded" => Ok(SentenceStatus::Recorded),
            "needsReview" => Ok(SentenceStatus::NeedsReview),
            "approved" => Ok(SentenceStatus::Approved),
            _ => Err(anyhow::anyhow!("invalid sentence status: {s}")),
        }
    }
}

// Unknown stored values fall back to the default so old files keep loading.
impl From<String> for SentenceStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl From<SentenceStatus> for String {
    fn from(status: SentenceStatus) -> Self {
        status.to_string()
    }
}

/// Text plus optional timing, the unit handed to persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceDraft {
    pub text: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl From<&Segment> for SentenceDraft {
    fn from(segment: &Segment) -> Self {
        Self {
            text: segment.text.clone(),
            start: Some(segment.start),
            end: Some(segment.end),
        }
    }
}

/// One practice sentence, optionally aligned to a span of the source audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub id: Uuid,
    pub order: usize,
    pub text: String,
    #[serde(default)]
    pub status: SentenceStatus,
    /// Recording location relative to the store root.
    pub audio_file_name: Option<String>,
    pub start_time_sec: Option<f64>,
    pub end_time_sec: Option<f64>,
}

impl Sentence {
    pub fn is_recorded(&self) -> bool {
        self.audio_file_name.is_some()
    }

    pub fn has_timing(&self) -> bool {
        self.start_time_sec.is_some() && self.end_time_sec.is_some()
    }

    /// Attach a new take and mark the sentence recorded.
    /// Returns the take it replaces, if any.
    pub fn attach_recording(&mut self, file_name: String) -> Option<String> {
        self.status = SentenceStatus::Recorded;
        self.audio_file_name.replace(file_name)
    }

    pub fn approve(&mut self) {
        self.status = SentenceStatus::Approved;
    }

    pub fn mark_needs_review(&mut self) {
        self.status = SentenceStatus::NeedsReview;
    }

    /// Drop the take and start over. Returns the removed take, if any.
    pub fn reset(&mut self) -> Option<String> {
        self.status = SentenceStatus::NotStarted;
        self.audio_file_name.take()
    }
}

/// A practice project owning its ordered sentences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub full_text: String,
    pub created_at: DateTime<Utc>,
    /// Imported audio file name for subtitle-aligned projects.
    pub source_audio_file_name: Option<String>,
    pub sentences: Vec<Sentence>,
}

impl Project {
    /// Build a project whose sentences are numbered in draft order.
    pub fn from_drafts(
        title: &str,
        full_text: &str,
        source_audio_file_name: Option<String>,
        drafts: Vec<SentenceDraft>,
    ) -> Self {
        let sentences = drafts
            .into_iter()
            .enumerate()
            .map(|(order, draft)| Sentence {
                id: Uuid::new_v4(),
                order,
                text: draft.text,
                status: SentenceStatus::NotStarted,
                audio_file_name: None,
                start_time_sec: draft.start,
                end_time_sec: draft.end,
            })
            .collect();
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            full_text: full_text.to_string(),
            created_at: Utc::now(),
            source_audio_file_name,
            sentences,
        }
    }

    /// Build an untimed project by splitting `body` into sentences.
    pub fn from_text(title: &str, body: &str) -> Self {
        let body = body.trim();
        let drafts = split_sentences(body)
            .into_iter()
            .map(|text| SentenceDraft {
                text,
                start: None,
                end: None,
            })
            .collect();
        Self::from_drafts(title.trim(), body, None, drafts)
    }

    /// Build a timed project from merged subtitle segments.
    pub fn from_segments(title: &str, source_audio_file_name: &str, segments: &[Segment]) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let drafts = segments.iter().map(SentenceDraft::from).collect();
        Self::from_drafts(
            title.trim(),
            &full_text,
            Some(source_audio_file_name.to_string()),
            drafts,
        )
    }

    pub fn completed_count(&self) -> usize {
        self.sentences
            .iter()
            .filter(|s| s.status == SentenceStatus::Approved)
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn sentence_mut(&mut self, order: usize) -> Option<&mut Sentence> {
        self.sentences.iter_mut().find(|s| s.order == order)
    }

    /// The sentence following `id` in practice order.
    pub fn next_sentence(&self, id: Uuid) -> Option<&Sentence> {
        let mut ordered: Vec<&Sentence> = self.sentences.iter().collect();
        ordered.sort_by_key(|s| s.order);
        let current = ordered.iter().position(|s| s.id == id)?;
        ordered.get(current + 1).copied()
    }
}
