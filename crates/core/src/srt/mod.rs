//! This module is responsible for SRT decoding and parsing.
//! Blocks are parsed tolerantly: a malformed block is dropped and the rest of
//! the file is still read. Only undecodable content is an error.

use crate::error::SrtError;
use crate::segment::Segment;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Token separating the start and end time codes of a block.
const TIME_SEPARATOR: &str = "-->";

/// Represents a single subtitle cue (declared index, time range, joined text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub index: i64,
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
}

/// Decode raw subtitle bytes into text.
/// UTF-8 is tried first, then UTF-16 (byte order from the BOM, big endian
/// without one).
pub fn decode(bytes: &[u8]) -> Result<String, SrtError> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string());
    }
    decode_utf16(bytes).ok_or(SrtError::Undecodable)
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let (body, little_endian) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (rest, true),
        [0xFE, 0xFF, rest @ ..] => (rest, false),
        _ => (bytes, false),
    };
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}

/// Read a subtitle file from disk and parse it into cues.
pub fn parse_file(path: &Path) -> Result<Vec<Cue>> {
    trace!("parse_file(path={})", path.display());
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(parse_bytes(&bytes)?)
}

/// Decode and parse subtitle bytes.
pub fn parse_bytes(bytes: &[u8]) -> Result<Vec<Cue>, SrtError> {
    let text = decode(bytes)?;
    Ok(parse(&text))
}

/// Parse SRT text into cues sorted by start time.
/// Ties keep the order in which the blocks appear in the file.
pub fn parse(input: &str) -> Vec<Cue> {
    let content = input.replace("\r\n", "\n").replace('\r', "\n");
    let mut cues = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    for line in content.split('\n') {
        if line.trim().is_empty() {
            take_block(&mut block, &mut cues);
        } else {
            block.push(line);
        }
    }
    take_block(&mut block, &mut cues);
    cues.sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));
    cues
}

fn take_block(block: &mut Vec<&str>, cues: &mut Vec<Cue>) {
    if block.is_empty() {
        return;
    }
    match parse_block(block) {
        Ok(cue) => cues.push(cue),
        Err(reason) => debug!("skipping subtitle block {:?}: {}", block.first(), reason),
    }
    block.clear();
}

/// Parse one blank-line delimited block, returning why it was rejected.
fn parse_block(lines: &[&str]) -> Result<Cue, &'static str> {
    if lines.len() < 2 {
        return Err("fewer than two lines");
    }
    let index: i64 = lines[0].trim().parse().map_err(|_| "index is not an integer")?;
    let (start_sec, end_sec) = parse_times(lines[1].trim()).ok_or("malformed time range")?;
    let text = lines[2..].join(" ").trim().to_string();
    if text.is_empty() {
        return Err("empty text");
    }
    Ok(Cue {
        index,
        start_sec,
        end_sec,
        text,
    })
}

/// Parse a time range like `00:00:01,000 --> 00:00:02,000` to seconds.
/// Spacing around the arrow is optional.
fn parse_times(line: &str) -> Option<(f64, f64)> {
    let parts: Vec<&str> = line.split(TIME_SEPARATOR).collect();
    if parts.len() != 2 {
        return None;
    }
    Some((parse_time(parts[0].trim())?, parse_time(parts[1].trim())?))
}

/// Parse `HH:MM:SS,mmm` into seconds.
pub fn parse_time(t: &str) -> Option<f64> {
    let parts: Vec<&str> = t.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let (sec, milli) = parts[2].split_once(',')?;
    if milli.contains(',') {
        return None;
    }
    let h: u64 = parts[0].parse().ok()?;
    let m: u64 = parts[1].parse().ok()?;
    let s: u64 = sec.parse().ok()?;
    let ms: u64 = milli.parse().ok()?;
    Some(h as f64 * 3600.0 + m as f64 * 60.0 + s as f64 + ms as f64 / 1000.0)
}

/// Format seconds back to `HH:MM:SS,mmm`, rounded to the millisecond.
pub fn format_time(sec: f64) -> String {
    let ms = (sec.max(0.0) * 1000.0).round() as u64;
    let h = ms / 3_600_000;
    let m = (ms % 3_600_000) / 60_000;
    let s = (ms % 60_000) / 1000;
    let ms = ms % 1000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// Write segments as SRT text, numbering blocks from 1.
pub fn format_segments(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_time(segment.start),
            format_time(segment.end),
            segment.text
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn parses_multiline_cue() {
        let input = "1\n00:00:01,500 --> 00:00:03,250\nHello\nthere.\n\n";
        let cues = parse(input);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 1);
        assert_relative_eq!(cues[0].start_sec, 1.5);
        assert_relative_eq!(cues[0].end_sec, 3.25);
        assert_eq!(cues[0].text, "Hello there.");
    }

    #[test]
    fn skips_block_with_bad_index() {
        let input = "abc\n00:00:01,000 --> 00:00:02,000\nText\n\n2\n00:00:03,000 --> 00:00:04,000\nMore";
        let cues = parse(input);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 2);
        assert_eq!(cues[0].text, "More");
    }

    #[test]
    fn skips_malformed_blocks_and_keeps_neighbours() {
        let input = "1\n00:00:01,000 00:00:02,000\nno arrow\n\n\
                     2\n00:00:0x,000 --> 00:00:02,000\nbad time\n\n\
                     3\n00:00:05,000 --> 00:00:06,000\n   \n\n\
                     4\n00:00:07,000 --> 00:00:08,000\nkept\n\n\
                     5\n";
        let cues = parse(input);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 4);
    }

    #[test]
    fn normalizes_line_endings_and_whitespace_separators() {
        let input = "1\r\n00:00:01,000-->00:00:02,000\r\nA\r\n \t \r\n2\r00:00:03,000 --> 00:00:04,000\rB\r";
        let cues = parse(input);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "A");
        assert_eq!(cues[1].text, "B");
    }

    #[test]
    fn sorts_by_start_and_keeps_ties_in_file_order() {
        let input = "1\n00:00:05,000 --> 00:00:06,000\nlate\n\n\
                     2\n00:00:01,000 --> 00:00:02,000\nfirst tie\n\n\
                     3\n00:00:01,000 --> 00:00:02,500\nsecond tie\n";
        let cues = parse(input);
        let indices: Vec<i64> = cues.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![2, 3, 1]);
    }

    #[test]
    fn keeps_reversed_time_ranges_as_declared() {
        let cues = parse("7\n00:00:05,000 --> 00:00:02,000\nbackwards\n");
        assert_eq!(cues.len(), 1);
        assert_relative_eq!(cues[0].start_sec, 5.0);
        assert_relative_eq!(cues[0].end_sec, 2.0);
    }

    #[test]
    fn skips_time_line_with_two_separators() {
        let input = "1\n00:00:01,000 --> 00:00:02,000 --> 00:00:03,000\ndouble\n\n\
                     2\n00:00:04,000 --> 00:00:05,000\nsingle\n";
        let cues = parse(input);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "single");
    }

    #[test]
    fn parses_time_codes() {
        assert_relative_eq!(parse_time("01:02:03,004").unwrap(), 3723.004, epsilon = 1e-9);
        assert_eq!(parse_time("00:00:01.000"), None);
        assert_eq!(parse_time("00:01,000"), None);
        assert_eq!(parse_time("00:00:01,0,0"), None);
        assert_eq!(parse_time("aa:00:01,000"), None);
    }

    #[test]
    fn formats_time_codes() {
        assert_eq!(format_time(3723.004), "01:02:03,004");
        assert_eq!(format_time(-1.0), "00:00:00,000");
    }

    #[test]
    fn writes_segments_as_srt() {
        let segments = vec![Segment {
            start: 1.0,
            end: 2.5,
            text: "Hello there.".into(),
            covered_indices: vec![1, 2],
        }];
        assert_eq!(
            format_segments(&segments),
            "1\n00:00:01,000 --> 00:00:02,500\nHello there.\n\n"
        );
    }

    #[test]
    fn decodes_utf8_with_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"1\n00:00:01,000 --> 00:00:02,000\nHi\n");
        let cues = parse_bytes(&bytes).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 1);
    }

    #[test]
    fn decodes_utf16_little_endian() {
        let text = "1\n00:00:01,000 --> 00:00:02,000\n你好。\n";
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let cues = parse_bytes(&bytes).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "你好。");
    }

    #[test]
    fn rejects_undecodable_bytes() {
        assert_eq!(parse_bytes(&[0xFF]), Err(SrtError::Undecodable));
        assert_eq!(
            parse_bytes(&[0xD8, 0x00, 0x00, 0x41]),
            Err(SrtError::Undecodable)
        );
    }

    #[test]
    fn empty_content_is_not_an_error() {
        assert_eq!(parse_bytes(b"").unwrap(), Vec::<Cue>::new());
    }

    #[test]
    fn parse_file_reports_undecodable_as_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.srt");
        fs::write(&path, [0xFF]).unwrap();
        let err = parse_file(&path).unwrap_err();
        assert_eq!(err.downcast_ref::<SrtError>(), Some(&SrtError::Undecodable));
    }

    fn render(blocks: &[(u32, u64, u64, String)]) -> String {
        let mut out = String::new();
        for (index, start_ms, dur_ms, text) in blocks {
            out.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                index,
                format_time(*start_ms as f64 / 1000.0),
                format_time((start_ms + dur_ms) as f64 / 1000.0),
                text
            ));
        }
        out
    }

    proptest! {
        #[test]
        fn parsed_cues_are_sorted_deterministic_and_non_empty(
            blocks in prop::collection::vec(
                (0u32..1000, 0u64..10_000_000, 0u64..10_000, "[A-Za-z ,.!?]{0,12}"),
                0..30,
            )
        ) {
            let content = render(&blocks);
            let cues = parse(&content);
            for pair in cues.windows(2) {
                prop_assert!(pair[0].start_sec <= pair[1].start_sec);
            }
            for cue in &cues {
                prop_assert!(!cue.text.trim().is_empty());
            }
            prop_assert_eq!(&cues, &parse(&content));
            let expected = blocks.iter().filter(|b| !b.3.trim().is_empty()).count();
            prop_assert_eq!(cues.len(), expected);
        }
    }
}
