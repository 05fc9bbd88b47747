use crate::chunk::fragment::Fragment;
use crate::warning::Warning;

/// The chunk content of one literate source, in document order.
/// Prose between fragments is not retained.
#[derive(Debug, Clone)]
pub struct Document {
    pub fragments: Vec<Fragment>,
    /// Malformed fragments that were dropped during extraction.
    pub warnings: Vec<Warning>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
