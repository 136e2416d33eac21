//! Byte-level framing of text files: byte-order mark and line-ending style.
//!
//! Matching happens on canonical LF text; the original framing is restored
//! before the file is written back.

/// UTF-8 encoded byte-order mark (U+FEFF).
pub const BOM: char = '\u{FEFF}';
pub const BOM_BYTES: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Line terminator convention of a file, decided by its first terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// CRLF when the first `\n` is preceded by `\r`; LF otherwise, including
    /// text with no line breaks.
    pub fn detect(body: &str) -> Self {
        Self::detect_bytes(body.as_bytes())
    }

    pub fn detect_bytes(body: &[u8]) -> Self {
        match body.iter().position(|&b| b == b'\n') {
            Some(idx) if idx > 0 && body[idx - 1] == b'\r' => Self::CrLf,
            _ => Self::Lf,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Split a leading byte-order mark off `raw`. Returns whether one was present
/// and the remaining body.
pub fn split_bom(raw: &str) -> (bool, &str) {
    match raw.strip_prefix(BOM) {
        Some(body) => (true, body),
        None => (false, raw),
    }
}

/// Replace every `\r\n` and every lone `\r` with `\n`.
pub fn to_canonical(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Re-apply `ending` to canonical LF text.
pub fn from_canonical(text: &str, ending: LineEnding) -> String {
    match ending {
        LineEnding::CrLf => text.replace('\n', "\r\n"),
        LineEnding::Lf => text.to_string(),
    }
}

/// Byte counterpart of [`split_bom`], for text that is not valid UTF-8.
pub fn split_bom_bytes(raw: &[u8]) -> (bool, &[u8]) {
    match raw.strip_prefix(BOM_BYTES) {
        Some(body) => (true, body),
        None => (false, raw),
    }
}

/// Byte counterpart of [`to_canonical`].
pub fn to_canonical_bytes(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut iter = text.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' {
            if iter.peek() == Some(&&b'\n') {
                iter.next();
            }
            out.push(b'\n');
        } else {
            out.push(b);
        }
    }
    out
}

/// Byte counterpart of [`from_canonical`].
pub fn from_canonical_bytes(text: &[u8], ending: LineEnding) -> Vec<u8> {
    match ending {
        LineEnding::Lf => text.to_vec(),
        LineEnding::CrLf => {
            let mut out = Vec::with_capacity(text.len() + text.len() / 16);
            for &b in text {
                if b == b'\n' {
                    out.push(b'\r');
                }
                out.push(b);
            }
            out
        }
    }
}
