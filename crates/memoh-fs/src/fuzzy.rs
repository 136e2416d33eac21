//! Locating an edit target in canonical text.
//!
//! Exact substring search first; when that fails, both sides are folded
//! (trailing whitespace trimmed per line, typographic quotes, dashes and spaces
//! mapped to ASCII) and searched again. A folded match is anchored to the
//! folded buffer, so the splice must be done against that buffer.

use std::borrow::Cow;

/// How the target was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
        }
    }
}

/// A located target: byte offset and length inside [`TextMatch::buffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch<'a> {
    pub start: usize,
    pub len: usize,
    pub kind: MatchKind,
    buffer: Cow<'a, str>,
}

impl TextMatch<'_> {
    /// The text the offsets refer to: the searched content for an exact match,
    /// its folded form for a fuzzy one.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Replace the matched span of the anchoring buffer with `replacement`.
    pub fn splice(&self, replacement: &str) -> String {
        let end = self.start + self.len;
        let mut out = String::with_capacity(self.buffer.len() - self.len + replacement.len());
        out.push_str(&self.buffer[..self.start]);
        out.push_str(replacement);
        out.push_str(&self.buffer[end..]);
        out
    }
}

/// Find the first occurrence of `target` in `content`, exact match first.
pub fn find_text<'a>(content: &'a str, target: &str) -> Option<TextMatch<'a>> {
    if let Some(start) = content.find(target) {
        return Some(TextMatch {
            start,
            len: target.len(),
            kind: MatchKind::Exact,
            buffer: Cow::Borrowed(content),
        });
    }

    let folded_content = fold(content);
    let folded_target = fold(target);
    let start = folded_content.find(&folded_target)?;
    Some(TextMatch {
        start,
        len: folded_target.len(),
        kind: MatchKind::Fuzzy,
        buffer: Cow::Owned(folded_content),
    })
}

/// Lossy normalisation used for tolerant matching and uniqueness counting.
/// Never written to disk on its own.
pub fn fold(text: &str) -> String {
    let trimmed: Vec<&str> = text
        .split('\n')
        .map(|line| line.trim_end_matches(char::is_whitespace))
        .collect();
    trimmed.join("\n").chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}'
        | '\u{2212}' => '-',
        '\u{00A0}' | '\u{2002}' | '\u{2003}' | '\u{2004}' | '\u{2005}' | '\u{2006}'
        | '\u{2007}' | '\u{2008}' | '\u{2009}' | '\u{200A}' | '\u{202F}' | '\u{205F}'
        | '\u{3000}' => ' ',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_anchors_original() {
        let content = "alpha “beta” gamma\n";
        let m = find_text(content, "gamma").unwrap();
        assert_eq!(m.kind, MatchKind::Exact);
        assert_eq!(m.buffer(), content);
        assert_eq!(&content[m.start..m.start + m.len], "gamma");
    }

    #[test]
    fn test_fuzzy_match_anchors_folded_buffer() {
        let content = "say “it’s fine”   \nnext\n";
        let m = find_text(content, "say \"it's fine\"\nnext").unwrap();
        assert_eq!(m.kind, MatchKind::Fuzzy);
        assert_eq!(m.buffer(), "say \"it's fine\"\nnext\n");
        assert_eq!(m.start, 0);
        assert_eq!(m.len, "say \"it's fine\"\nnext".len());
        assert_eq!(m.splice("done"), "done\n");
    }

    #[test]
    fn test_fuzzy_offsets_survive_length_changes() {
        // Multi-byte punctuation shrinks to one byte when folded.
        let content = "a\u{2014}b\u{00A0}c target";
        let m = find_text(content, "a-b c target").unwrap();
        assert_eq!(m.kind, MatchKind::Fuzzy);
        assert_eq!(m.splice("X"), "X");
    }

    #[test]
    fn test_not_found() {
        assert!(find_text("hello world", "goodbye").is_none());
    }

    #[test]
    fn test_fold_maps_punctuation_and_trims() {
        assert_eq!(fold("‘a’ “b” c\u{2013}d\u{3000}e \t\nx\u{00A0}\n"), "'a' \"b\" c-d e\nx\n");
        assert_eq!(fold("keep  inner   spaces"), "keep  inner   spaces");
        assert_eq!(fold("  leading kept"), "  leading kept");
    }

    #[test]
    fn test_fold_is_idempotent() {
        for text in [
            "",
            "plain",
            "trailing \u{00A0}\u{2003}\n“quoted” — dash\u{2212}\n",
            "\u{3000}\n\u{205F}x\u{202F}\n\n",
            "mixed\r\nline\rends  \n",
        ] {
            let once = fold(text);
            assert_eq!(fold(&once), once, "{text:?}");
        }
    }
}
