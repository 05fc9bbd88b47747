use weave::ChunkMap;
use weave::chunk::reference::Reference;

use crate::error::{DiagnosticError, ExpandError};
use crate::graph;

#[derive(Debug, Clone, Default)]
pub struct ExpandOptions {
    /// Upper bound on expansion passes. Defaults to one more than the number
    /// of chunks, which no acyclic store needs to exceed.
    pub max_passes: Option<usize>,
}

/// What an expansion run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandReport {
    /// Passes run, including the final pass that found nothing to substitute.
    pub passes: usize,
    /// Reference lines replaced across all passes.
    pub substitutions: usize,
}

/// Expand every chunk to its fixpoint: no chunk contains a reference line.
///
/// The reference graph is validated first, so undefined references and
/// cycles fail before any chunk is touched. Running this on an already
/// resolved map performs one pass and no substitutions.
pub fn expand(chunks: &mut ChunkMap, options: &ExpandOptions) -> Result<ExpandReport, DiagnosticError> {
    graph::validate(chunks)?;

    let limit = options.max_passes.unwrap_or(chunks.len() + 1);
    let mut report = ExpandReport::default();

    loop {
        if report.passes >= limit {
            // A map that reached its fixpoint within the cap is not an error.
            let Some(first) = chunks.unresolved().next() else {
                break;
            };
            let error = ExpandError::PassLimitExceeded {
                passes: report.passes,
                unresolved: chunks.unresolved().map(|c| c.name.clone()).collect(),
            };
            return Err(DiagnosticError::at(error, &first.origin));
        }

        let substitutions = expand_pass(chunks)?;
        report.passes += 1;
        report.substitutions += substitutions;
        log::debug!(
            "expansion pass {}: {} substitution(s)",
            report.passes,
            substitutions
        );

        if substitutions == 0 {
            break;
        }
    }

    Ok(report)
}

/// Run a single pass over every chunk in store order and return the number of
/// reference lines substituted.
///
/// Each reference line is replaced by the referenced chunk's lines as they are
/// at that moment, so chunks earlier in the order are seen with this pass's
/// updates. Substituted lines are not rescanned until the next pass.
pub fn expand_pass(chunks: &mut ChunkMap) -> Result<usize, DiagnosticError> {
    let mut substitutions = 0;

    for index in 0..chunks.len() {
        let Some(chunk) = chunks.get_index(index) else {
            continue;
        };
        if chunk.is_resolved() {
            continue;
        }

        let mut expanded = Vec::with_capacity(chunk.lines.len());
        for line in &chunk.lines {
            let Some(reference) = Reference::parse(line) else {
                expanded.push(line.clone());
                continue;
            };
            let target = chunks.lines(reference.name).ok_or_else(|| {
                DiagnosticError::at(
                    ExpandError::UndefinedChunk {
                        chunk: chunk.name.clone(),
                        name: reference.name.to_string(),
                    },
                    &chunk.origin,
                )
            })?;
            expanded.extend(target.iter().map(|l| reference.indent_line(l)));
            substitutions += 1;
        }

        if let Some(chunk) = chunks.get_index_mut(index) {
            chunk.lines = expanded;
        }
    }

    Ok(substitutions)
}
