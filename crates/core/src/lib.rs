//! Subtitle-driven sentence segmentation and the project model built on it.
//!
//! The pipeline is `srt::parse_bytes` -> `segment::merge_cues` -> `project`,
//! with `store` persisting projects and their imported audio on disk.

pub mod error;
pub mod project;
pub mod segment;
pub mod srt;
pub mod store;
pub mod text;

pub use error::{SrtError, StoreError};
pub use project::{Project, Sentence, SentenceDraft, SentenceStatus};
pub use segment::{merge_cues, Segment};
pub use srt::Cue;
