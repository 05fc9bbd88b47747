use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;
use weave::chunk::Origin;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("undefined chunk `{name}` referenced from `{chunk}`")]
    UndefinedChunk { chunk: String, name: String },
    #[error("reference cycle detected: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },
    #[error(
        "no fixpoint after {passes} expansion passes (still unresolved: {})",
        .unresolved.join(", ")
    )]
    PassLimitExceeded {
        passes: usize,
        unresolved: Vec<String>,
    },
}

/// An expansion error enriched with source location information.
#[derive(Debug)]
pub struct DiagnosticError {
    pub error: ExpandError,
    pub span: Option<Range<usize>>,
    pub source_id: usize,
}

impl DiagnosticError {
    /// Attach the location where `chunk` was established.
    pub fn at(error: ExpandError, origin: &Origin) -> Self {
        DiagnosticError {
            error,
            span: Some(origin.span.clone()),
            source_id: origin.source_id,
        }
    }

    /// Convert to a codespan-reporting Diagnostic. Errors without a span
    /// render as a bare message.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let diagnostic = Diagnostic::error().with_message(self.error.to_string());
        match (&self.span, &self.error) {
            (Some(span), ExpandError::UndefinedChunk { name, .. }) => diagnostic
                .with_labels(vec![
                    Label::primary(self.source_id, span.clone())
                        .with_message(format!("this chunk references `<<{}>>`", name)),
                ])
                .with_notes(vec![format!("no fragment defines `<<{}>>=`", name)]),
            (Some(span), ExpandError::CycleDetected { .. }) => diagnostic
                .with_labels(vec![
                    Label::primary(self.source_id, span.clone())
                        .with_message("cycle starts here"),
                ])
                .with_notes(vec![
                    "a chunk may not include itself, directly or indirectly".to_string(),
                ]),
            (Some(span), _) => {
                diagnostic.with_labels(vec![Label::primary(self.source_id, span.clone())])
            }
            (None, _) => diagnostic,
        }
    }
}

impl From<ExpandError> for DiagnosticError {
    fn from(error: ExpandError) -> Self {
        DiagnosticError {
            error,
            span: None,
            source_id: 0,
        }
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for DiagnosticError {}
