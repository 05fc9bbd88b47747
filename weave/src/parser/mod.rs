mod scanner;

use crate::document::Document;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Extract every well-formed fragment from the source.
    /// Extraction never fails; malformed fragments become warnings.
    pub fn parse(&self) -> Document {
        extract(&self.source, self.file_id)
    }
}

/// Extract the fragments of one document.
pub fn extract(source: &str, source_id: usize) -> Document {
    let (fragments, warnings) = scanner::scan_fragments(source, source_id);
    log::trace!(
        "source {}: {} fragment(s), {} warning(s)",
        source_id,
        fragments.len(),
        warnings.len()
    );
    Document {
        fragments,
        warnings,
        source_id,
    }
}
