//! Character-offset indexing and the shared sentence splitter.

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentence terminators: Latin `.!?`, Hebrew sof pasuq (U+05C3) and the Armenian full stop
/// (U+0589), which some digitized Hebrew texts carry where sof pasuq belongs.
pub const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '\u{05C3}', '\u{0589}'];

/// Characters that may trail a terminator and still belong to the sentence.
const CLOSING_MARKS: &[char] = &['"', '\'', ')', ']', '\u{201D}', '\u{2019}', '\u{00BB}', '\u{05F4}'];

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

pub fn is_sentence_terminator(c: char) -> bool {
    SENTENCE_TERMINATORS.contains(&c)
}

/// Maps character offsets to byte offsets for a borrowed text.
#[derive(Debug)]
pub struct TextIndex<'a> {
    text: &'a str,
    /// Byte offset of every char, plus `text.len()` as a sentinel.
    offsets: Vec<usize>,
}

impl<'a> TextIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Self { text, offsets }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Length of the text in characters.
    pub fn char_len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Byte offset of a character offset, clamped to the end of the text.
    pub fn byte_offset(&self, char_pos: usize) -> usize {
        self.offsets[char_pos.min(self.char_len())]
    }

    /// Character offset of a byte offset. Offsets inside a char round up.
    pub fn char_offset(&self, byte_pos: usize) -> usize {
        match self.offsets.binary_search(&byte_pos) {
            Ok(i) | Err(i) => i.min(self.char_len()),
        }
    }

    /// Slice by character offsets.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        let start = self.byte_offset(start);
        let end = self.byte_offset(end).max(start);
        &self.text[start..end]
    }

    pub fn char_at(&self, char_pos: usize) -> Option<char> {
        if char_pos >= self.char_len() {
            return None;
        }
        self.slice(char_pos, char_pos + 1).chars().next()
    }

    /// Narrow `[start, end)` so it excludes leading and trailing whitespace.
    pub fn trimmed_span(&self, start: usize, end: usize) -> (usize, usize) {
        let slice = self.slice(start, end);
        let leading = slice.chars().take_while(|c| c.is_whitespace()).count();
        let trailing = slice.chars().rev().take_while(|c| c.is_whitespace()).count();
        let len = end.saturating_sub(start);
        if leading >= len {
            return (end, end);
        }
        (start + leading, end - trailing)
    }

    /// Up to `len` characters ending at `pos`.
    pub fn before(&self, pos: usize, len: usize) -> &'a str {
        self.slice(pos.saturating_sub(len), pos)
    }

    /// Up to `len` characters starting at `pos`.
    pub fn after(&self, pos: usize, len: usize) -> &'a str {
        self.slice(pos, pos.saturating_add(len))
    }
}

/// Split text into sentence spans, returned as trimmed `(start, end)` character offsets.
///
/// A sentence ends at a terminator (plus any run of terminators or closing quotes) that is
/// followed by whitespace or the end of the text. Text after the last terminator becomes a
/// final sentence.
pub fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if start.is_none() {
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            start = Some(i);
        }

        if is_sentence_terminator(c) {
            let mut end = i + 1;
            while end < chars.len()
                && (is_sentence_terminator(chars[end]) || CLOSING_MARKS.contains(&chars[end]))
            {
                end += 1;
            }
            if end == chars.len() || chars[end].is_whitespace() {
                if let Some(s) = start.take() {
                    spans.push((s, end));
                }
            }
            i = end;
            continue;
        }

        i += 1;
    }

    if let Some(s) = start {
        let mut end = chars.len();
        while end > s && chars[end - 1].is_whitespace() {
            end -= 1;
        }
        if end > s {
            spans.push((s, end));
        }
    }

    spans
}

/// Split text into trimmed sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let index = TextIndex::new(text);
    sentence_spans(text)
        .into_iter()
        .map(|(start, end)| index.slice(start, end))
        .collect()
}

/// Remove markup tags, leaving the text between them.
pub fn strip_markup(text: &str) -> String {
    MARKUP_TAG.replace_all(text, " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reverse the five predefined XML entities.
pub fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Whitespace-delimited word count with markup removed.
pub fn count_words(text: &str) -> usize {
    MARKUP_TAG.replace_all(text, " ").split_whitespace().count()
}
