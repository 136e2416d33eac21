//! Single search-and-replace over file text, independent of the filesystem.

use crate::fuzzy::{find_text, fold, MatchKind};
use crate::normalize::{
    from_canonical, from_canonical_bytes, split_bom, split_bom_bytes, to_canonical,
    to_canonical_bytes, LineEnding, BOM, BOM_BYTES,
};

/// Why an edit was rejected. Carries no path; [`crate::edit_file`] adds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    TextNotFound,
    Ambiguous { count: usize },
    NoOp,
}

/// Result of a successful edit: text from [`apply_edit`], raw bytes from
/// [`apply_edit_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit<C = String> {
    /// Full file content with the original BOM and line endings restored.
    pub content: C,
    pub match_kind: MatchKind,
    /// 1-based line of the first changed line, in canonical text.
    pub first_changed_line: usize,
}

/// Replace the single occurrence of `old_text` in `raw` with `new_text`.
///
/// Matching runs on LF-canonical text. Uniqueness is counted in folded form,
/// so two occurrences that differ only in quote style or trailing spaces are
/// ambiguous. A fuzzy match rewrites the file from the folded buffer.
pub fn apply_edit(raw: &str, old_text: &str, new_text: &str) -> Result<AppliedEdit, EditError> {
    let (has_bom, body) = split_bom(raw);
    let ending = LineEnding::detect(body);

    let content = to_canonical(body);
    let old = to_canonical(old_text);
    let new = to_canonical(new_text);

    let found = find_text(&content, &old).ok_or(EditError::TextNotFound)?;

    let count = fold(&content).matches(fold(&old).as_str()).count();
    if count > 1 {
        return Err(EditError::Ambiguous { count });
    }

    let updated = found.splice(&new);
    if updated == found.buffer() {
        return Err(EditError::NoOp);
    }

    let first_changed_line = first_changed_line(found.buffer().as_bytes(), updated.as_bytes());
    let mut out = String::with_capacity(updated.len() + BOM.len_utf8());
    if has_bom {
        out.push(BOM);
    }
    out.push_str(&from_canonical(&updated, ending));

    Ok(AppliedEdit {
        content: out,
        match_kind: found.kind,
        first_changed_line,
    })
}

/// Exact-only edit of content that is not valid UTF-8. Bytes outside the
/// matched span are preserved verbatim; uniqueness is still counted in folded
/// space over a lossy decoding, so the rules match [`apply_edit`].
pub fn apply_edit_bytes(
    raw: &[u8],
    old_text: &str,
    new_text: &str,
) -> Result<AppliedEdit<Vec<u8>>, EditError> {
    let (has_bom, body) = split_bom_bytes(raw);
    let ending = LineEnding::detect_bytes(body);

    let content = to_canonical_bytes(body);
    let old = to_canonical(old_text);
    let new = to_canonical(new_text);

    let start = find_bytes(&content, old.as_bytes()).ok_or(EditError::TextNotFound)?;

    let count = fold(&String::from_utf8_lossy(&content))
        .matches(fold(&old).as_str())
        .count();
    if count > 1 {
        return Err(EditError::Ambiguous { count });
    }

    let end = start + old.len();
    let mut updated = Vec::with_capacity(content.len() - old.len() + new.len());
    updated.extend_from_slice(&content[..start]);
    updated.extend_from_slice(new.as_bytes());
    updated.extend_from_slice(&content[end..]);
    if updated == content {
        return Err(EditError::NoOp);
    }

    let first_changed_line = first_changed_line(&content, &updated);
    let mut out = Vec::with_capacity(updated.len() + BOM_BYTES.len());
    if has_bom {
        out.extend_from_slice(BOM_BYTES);
    }
    out.extend_from_slice(&from_canonical_bytes(&updated, ending));

    Ok(AppliedEdit {
        content: out,
        match_kind: MatchKind::Exact,
        first_changed_line,
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn first_changed_line(before: &[u8], after: &[u8]) -> usize {
    let prefix = before
        .iter()
        .zip(after)
        .take_while(|(a, b)| a == b)
        .count();
    before[..prefix].iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_edit_exact() {
        let edit = apply_edit("fn main() {\n    old();\n}\n", "old();", "new();").unwrap();
        assert_eq!(edit.content, "fn main() {\n    new();\n}\n");
        assert_eq!(edit.match_kind, MatchKind::Exact);
        assert_eq!(edit.first_changed_line, 2);
    }

    #[test]
    fn test_apply_edit_preserves_crlf() {
        let edit = apply_edit("Hello\r\nWorld\r\n", "World", "Rust").unwrap();
        assert_eq!(edit.content, "Hello\r\nRust\r\n");
    }

    #[test]
    fn test_apply_edit_crlf_old_text_matches_lf() {
        let edit = apply_edit("a\r\nb\r\nc\r\n", "a\nb", "x\r\ny").unwrap();
        assert_eq!(edit.content, "x\r\ny\r\nc\r\n");
    }

    #[test]
    fn test_apply_edit_preserves_bom() {
        let edit = apply_edit("\u{FEFF}key = 1\n", "1", "2").unwrap();
        assert_eq!(edit.content, "\u{FEFF}key = 2\n");
    }

    #[test]
    fn test_apply_edit_fuzzy_quotes() {
        let edit = apply_edit("msg = “hi”\n", "msg = \"hi\"", "msg = \"bye\"").unwrap();
        assert_eq!(edit.match_kind, MatchKind::Fuzzy);
        assert_eq!(edit.content, "msg = \"bye\"\n");
    }

    #[test]
    fn test_apply_edit_not_found() {
        assert_eq!(
            apply_edit("abc\n", "xyz", "q").unwrap_err(),
            EditError::TextNotFound
        );
    }

    #[test]
    fn test_apply_edit_ambiguous_across_quote_styles() {
        let raw = "say \"x\"\nsay “x”\n";
        assert_eq!(
            apply_edit(raw, "say \"x\"", "y").unwrap_err(),
            EditError::Ambiguous { count: 2 }
        );
    }

    #[test]
    fn test_apply_edit_ambiguous_plain() {
        assert_eq!(
            apply_edit("x = 1\nx = 1\nx = 1\n", "x = 1", "x = 2").unwrap_err(),
            EditError::Ambiguous { count: 3 }
        );
    }

    #[test]
    fn test_apply_edit_noop() {
        assert_eq!(
            apply_edit("same\n", "same", "same").unwrap_err(),
            EditError::NoOp
        );
    }

    #[test]
    fn test_apply_edit_twice_fails_second_time() {
        let first = apply_edit("value: old\n", "old", "new").unwrap();
        assert_eq!(
            apply_edit(&first.content, "old", "new").unwrap_err(),
            EditError::TextNotFound
        );
    }

    #[test]
    fn test_apply_edit_empty_old_text() {
        // Matches at every boundary of a non-empty file.
        assert_eq!(
            apply_edit("abc", "", "x").unwrap_err(),
            EditError::Ambiguous { count: 4 }
        );
        let edit = apply_edit("", "", "fresh\n").unwrap();
        assert_eq!(edit.content, "fresh\n");
        assert_eq!(edit.match_kind, MatchKind::Exact);
    }

    #[test]
    fn test_fuzzy_edit_rewrites_from_folded_buffer() {
        let raw = "title: “Intro”  \nsay “hi”\nend\t\n";
        let edit = apply_edit(raw, "say \"hi\"", "say \"bye\"").unwrap();
        assert_eq!(edit.match_kind, MatchKind::Fuzzy);
        // Quotes and trailing whitespace outside the match are folded too.
        assert_eq!(edit.content, "title: \"Intro\"\nsay \"bye\"\nend\n");
        // Line numbers are relative to the folded buffer.
        assert_eq!(edit.first_changed_line, 2);
    }

    #[test]
    fn test_fuzzy_edit_keeps_crlf_and_bom() {
        let raw = "\u{FEFF}a \u{2014} b\r\nkeep\r\n";
        let edit = apply_edit(raw, "a - b", "a + b").unwrap();
        assert_eq!(edit.match_kind, MatchKind::Fuzzy);
        assert_eq!(edit.content, "\u{FEFF}a + b\r\nkeep\r\n");
    }

    #[test]
    fn test_apply_edit_bytes_preserves_invalid_sequences() {
        let raw = b"\xEF\xBB\xBFname=\xFF\xFE\r\nvalue=old\r\n";
        let edit = apply_edit_bytes(raw, "value=old", "value=new").unwrap();
        assert_eq!(
            edit.content,
            b"\xEF\xBB\xBFname=\xFF\xFE\r\nvalue=new\r\n".to_vec()
        );
        assert_eq!(edit.first_changed_line, 2);
    }

    #[test]
    fn test_apply_edit_bytes_rejections() {
        let raw = b"\xFFrow\nrow\n";
        assert_eq!(
            apply_edit_bytes(raw, "row", "x").unwrap_err(),
            EditError::Ambiguous { count: 2 }
        );
        assert_eq!(
            apply_edit_bytes(raw, "missing", "x").unwrap_err(),
            EditError::TextNotFound
        );
        assert_eq!(
            apply_edit_bytes(b"\xFFkeep\n", "keep", "keep").unwrap_err(),
            EditError::NoOp
        );
        // No folding on raw bytes: curly quotes must match exactly.
        let curly = ["\u{201C}q\u{201D}".as_bytes(), b"\xFF"].concat();
        assert_eq!(
            apply_edit_bytes(&curly, "\"q\"", "x").unwrap_err(),
            EditError::TextNotFound
        );
    }

    #[test]
    fn test_apply_edit_delete_text() {
        let edit = apply_edit("keep\ndrop\nkeep2\n", "drop\n", "").unwrap();
        assert_eq!(edit.content, "keep\nkeep2\n");
        assert_eq!(edit.first_changed_line, 2);
    }
}
