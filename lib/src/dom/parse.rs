use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The bytes are not UTF-8.
    InvalidUtf8,
    /// A NUL byte: the file is binary, not markup.
    NulByte,
}

/// Input that cannot be treated as an HTML document at all.
///
/// Malformed markup is not an error: the HTML5 parsing algorithm recovers
/// from anything, and the recoveries are listed by
/// [`Document::parse_errors`](crate::dom::Document::parse_errors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub(crate) fn at(kind: ParseErrorKind, input: &[u8], offset: usize) -> Self {
        let offset = offset.min(input.len());
        let before = &input[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        ParseError { kind, offset, line, column: offset - line_start + 1 }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::InvalidUtf8 => write!(f, "input is not valid UTF-8"),
            ParseErrorKind::NulByte => write!(f, "unexpected NUL byte"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}, column {}", self.kind, self.line, self.column)
    }
}

impl std::error::Error for ParseError { }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        let error = ParseError::at(ParseErrorKind::NulByte, b"ab\ncd\0", 5);
        assert_eq!((error.line, error.column), (2, 3));
        assert_eq!(error.to_string(), "unexpected NUL byte at line 2, column 3");
    }
}
