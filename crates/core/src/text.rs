//! Sentence splitting for projects created from plain text.

use crate::segment::{CLOSING_QUOTES, SENTENCE_TERMINATORS};

/// Full-width terminators end a sentence even when text follows directly.
const CJK_TERMINATORS: [char; 3] = ['。', '！', '？'];

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: [&str; 15] = [
    "mr.", "mrs.", "ms.", "dr.", "prof.", "rev.", "sen.", "gov.", "gen.", "capt.", "sgt.", "st.",
    "i.e.", "e.g.", "vs.",
];

/// Split free text into trimmed, non-empty sentences.
/// A sentence ends after a run of terminators plus any closing quotes when
/// whitespace or the end of the text follows, or at a line break. Full-width
/// terminators need no following whitespace; known abbreviations never end
/// a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' || c == '\r' {
            push_trimmed(&mut sentences, &mut current);
            continue;
        }
        current.push(c);
        if !SENTENCE_TERMINATORS.contains(&c) {
            continue;
        }
        let mut full_width = CJK_TERMINATORS.contains(&c);
        while let Some(&next) = chars.peek() {
            if SENTENCE_TERMINATORS.contains(&next) || CLOSING_QUOTES.contains(&next) {
                full_width |= CJK_TERMINATORS.contains(&next);
                current.push(next);
                chars.next();
            } else {
                break;
            }
        }
        let at_boundary = chars.peek().map_or(true, |next| next.is_whitespace());
        if full_width || (at_boundary && !ends_with_abbreviation(&current)) {
            push_trimmed(&mut sentences, &mut current);
        }
    }
    push_trimmed(&mut sentences, &mut current);
    sentences
}

fn ends_with_abbreviation(current: &str) -> bool {
    current
        .split_whitespace()
        .next_back()
        .map(|word| ABBREVIATIONS.contains(&word.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn push_trimmed(sentences: &mut Vec<String>, current: &mut String) {
    let sentence = current.trim();
    if !sentence.is_empty() {
        sentences.push(sentence.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminators() {
        assert_eq!(
            split_sentences("Hello there. How are you?  Fine!"),
            vec!["Hello there.", "How are you?", "Fine!"]
        );
    }

    #[test]
    fn keeps_runs_of_terminators_and_closing_quotes() {
        assert_eq!(
            split_sentences("He said \"wait...\" and left?! 好的。"),
            vec!["He said \"wait...\"", "and left?!", "好的。"]
        );
    }

    #[test]
    fn keeps_abbreviations_decimals_and_domains_inside_a_sentence() {
        assert_eq!(
            split_sentences("Mr. Smith paid 3.14 dollars. Then he left."),
            vec!["Mr. Smith paid 3.14 dollars.", "Then he left."]
        );
        assert_eq!(
            split_sentences("See example.com, e.g. the docs. Dr. Who agrees!"),
            vec!["See example.com, e.g. the docs.", "Dr. Who agrees!"]
        );
    }

    #[test]
    fn full_width_terminators_split_without_spaces() {
        assert_eq!(
            split_sentences("你好。今天很好！真的吗？"),
            vec!["你好。", "今天很好！", "真的吗？"]
        );
    }

    #[test]
    fn line_breaks_end_sentences() {
        assert_eq!(
            split_sentences("first line\r\n\nsecond line"),
            vec!["first line", "second line"]
        );
    }

    #[test]
    fn blank_text_has_no_sentences() {
        assert!(split_sentences("  \n \t ").is_empty());
    }
}
