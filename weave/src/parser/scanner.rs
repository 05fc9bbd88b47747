use std::ops::Range;

use crate::chunk::fragment::{Fragment, Mode};
use crate::chunk::reference::parse_marker;
use crate::warning::Warning;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Scan source text line by line and collect fragments in document order.
pub fn scan_fragments(source: &str, source_id: usize) -> (Vec<Fragment>, Vec<Warning>) {
    let mut state = ScanState::new(source_id);
    for (line, span) in lines_with_spans(source) {
        state.process_line(line, span);
    }
    state.finalize()
}

// ---------------------------------------------------------------------------
// Scan state
// ---------------------------------------------------------------------------

struct ScanState<'a> {
    source_id: usize,
    /// `None` while outside a fragment (prose).
    open: Option<OpenFragment<'a>>,
    fragments: Vec<Fragment>,
    warnings: Vec<Warning>,
}

struct OpenFragment<'a> {
    name: &'a str,
    mode: Mode,
    header: Range<usize>,
    lines: Vec<&'a str>,
}

impl OpenFragment<'_> {
    fn into_fragment(self, span_end: usize, source_id: usize) -> Fragment {
        Fragment {
            name: self.name.to_string(),
            mode: self.mode,
            lines: self.lines.into_iter().map(str::to_string).collect(),
            span: self.header.start..span_end,
            header: self.header,
            source_id,
        }
    }
}

impl<'a> ScanState<'a> {
    fn new(source_id: usize) -> Self {
        ScanState {
            source_id,
            open: None,
            fragments: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn process_line(&mut self, line: &'a str, span: Range<usize>) {
        if let Some((name, mode)) = parse_opener(line) {
            // An opener inside a body means the previous fragment was never closed.
            if let Some(open) = self.open.take() {
                self.warnings.push(
                    unterminated(&open, self.source_id)
                        .with_related(self.source_id, span.clone(), "next chunk opened here")
                        .with_note("the fragment was dropped"),
                );
            }
            self.open = Some(OpenFragment {
                name,
                mode,
                header: span,
                lines: Vec::new(),
            });
            return;
        }

        if is_terminator(line) {
            // A stray `@` in prose is ignored.
            if let Some(open) = self.open.take() {
                self.fragments
                    .push(open.into_fragment(span.end, self.source_id));
            }
            return;
        }

        if let Some(open) = self.open.as_mut() {
            open.lines.push(line);
        }
    }

    fn finalize(mut self) -> (Vec<Fragment>, Vec<Warning>) {
        if let Some(open) = self.open.take() {
            self.warnings.push(
                unterminated(&open, self.source_id)
                    .with_note("reached end of input before `@`; the fragment was dropped"),
            );
        }
        (self.fragments, self.warnings)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unterminated(open: &OpenFragment<'_>, source_id: usize) -> Warning {
    Warning::new(
        format!("unterminated chunk `{}`", open.name),
        open.header.clone(),
        source_id,
    )
    .with_label("opened here")
}

/// `<<name>>=` or `<<name>>+`, surrounded by optional whitespace.
fn parse_opener(line: &str) -> Option<(&str, Mode)> {
    let trimmed = line.trim();
    let (marker, mode) = if let Some(marker) = trimmed.strip_suffix('=') {
        (marker, Mode::Define)
    } else if let Some(marker) = trimmed.strip_suffix('+') {
        (marker, Mode::Append)
    } else {
        return None;
    };
    parse_marker(marker).map(|name| (name, mode))
}

fn is_terminator(line: &str) -> bool {
    line.trim() == "@"
}

/// Lines without their `\n` / `\r\n` endings, paired with byte spans.
fn lines_with_spans(source: &str) -> impl Iterator<Item = (&str, Range<usize>)> {
    let mut offset = 0;
    source.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);
        (line, start..start + line.len())
    })
}
