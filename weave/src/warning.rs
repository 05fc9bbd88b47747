use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

/// A non-fatal problem found while extracting or merging chunks,
/// with source location information.
#[derive(Debug, Clone)]
pub struct Warning {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    /// Text attached to the primary label.
    pub label: Option<String>,
    /// Secondary locations, possibly in other files.
    pub related: Vec<Related>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Related {
    pub file_id: usize,
    pub span: Range<usize>,
    pub message: String,
}

impl Warning {
    pub fn new(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        Warning {
            message: message.into(),
            span,
            file_id,
            label: None,
            related: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_related(
        mut self,
        file_id: usize,
        span: Range<usize>,
        message: impl Into<String>,
    ) -> Self {
        self.related.push(Related {
            file_id,
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let mut primary = Label::primary(self.file_id, self.span.clone());
        if let Some(label) = &self.label {
            primary = primary.with_message(label);
        }
        let mut labels = vec![primary];
        labels.extend(self.related.iter().map(|r| {
            Label::secondary(r.file_id, r.span.clone()).with_message(&r.message)
        }));
        Diagnostic::warning()
            .with_message(&self.message)
            .with_labels(labels)
            .with_notes(self.notes.clone())
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
