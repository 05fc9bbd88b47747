use std::ops::Range;

/// How a fragment contributes to its chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `<<name>>=`
    Define,
    /// `<<name>>+`
    Append,
}

/// A raw chunk contribution as it appears in a document, before merging.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub name: String,
    pub mode: Mode,
    /// Body lines between the opener and the `@` terminator, without line endings.
    pub lines: Vec<String>,
    /// Byte span of the opener line.
    pub header: Range<usize>,
    /// Byte span from the opener through the terminator.
    pub span: Range<usize>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}
