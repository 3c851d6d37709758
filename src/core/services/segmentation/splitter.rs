use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A terminator counts only when followed by whitespace or the end of the text,
    /// so "3.5" and "..." inside a sentence do not split it.
    static ref SENTENCE_BOUNDARY: Regex = Regex::new(r"[.!?](\s+|$)").expect("valid boundary regex");
}

/// Split text into trimmed, non-empty sentences in original order.
///
/// Trailing text without a terminator becomes the last sentence; text with no
/// terminator at all is returned whole.
pub fn split_sentences(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        // terminators are single-byte ASCII
        let end = boundary.start() + 1;
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = boundary.end();
    }

    if start < text.len() {
        let remaining = text[start..].trim();
        if !remaining.is_empty() {
            sentences.push(remaining);
        }
    }

    if sentences.is_empty() {
        sentences.push(text.trim());
    }

    sentences
}

pub fn segment(text: &str) -> Vec<String> {
    split_sentences(text).into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_korean_two_sentences() {
        let sentences = segment("나는 사과를 좋아한다. 나는 매일 운동한다.");
        assert_eq!(sentences, vec!["나는 사과를 좋아한다.", "나는 매일 운동한다."]);
    }

    #[test]
    fn test_no_terminator_returns_trimmed_whole() {
        assert_eq!(segment("  바다 쓰레기 문제  "), vec!["바다 쓰레기 문제"]);
    }

    #[test]
    fn test_trailing_fragment_kept() {
        let sentences = segment("First point! Second point? and a tail");
        assert_eq!(sentences, vec!["First point!", "Second point?", "and a tail"]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(segment("").is_empty());
        assert!(segment("   \n\t ").is_empty());
    }

    #[test]
    fn test_consecutive_terminators_no_empty_sentences() {
        let sentences = segment("Wait...  Really?!   Yes.\n\n");
        assert_eq!(sentences, vec!["Wait...", "Really?!", "Yes."]);
    }

    #[test]
    fn test_decimal_point_does_not_split() {
        let sentences = segment("Growth was 3.5 percent. Then it fell.");
        assert_eq!(sentences, vec!["Growth was 3.5 percent.", "Then it fell."]);
    }

    #[test]
    fn test_newline_counts_as_whitespace() {
        let sentences = segment("첫 문장입니다.\n둘째 문장입니다.");
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn test_covers_all_non_whitespace_content() {
        let text = "  One. Two!  three?four. five ";
        let joined: String = segment(text).concat();
        let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        assert_eq!(strip(&joined), strip(text));
    }
}
