pub mod error;
pub mod expand;
pub mod graph;
pub mod select;

use std::collections::BTreeMap;

use weave::{ChunkMap, Document, RedefinePolicy, Warning};

pub use error::{DiagnosticError, ExpandError};
pub use expand::{ExpandOptions, ExpandReport, expand, expand_pass};
pub use select::{select_files, select_files_with};

#[derive(Debug, Clone, Default)]
pub struct TangleOptions {
    pub redefine: RedefinePolicy,
    pub max_passes: Option<usize>,
}

/// The outcome of a full merge → expand → select run.
#[derive(Debug, Clone)]
pub struct Tangled {
    /// Output filename → content.
    pub files: BTreeMap<String, String>,
    /// Every chunk, fully resolved.
    pub chunks: ChunkMap,
    /// Extraction and merge warnings, in input order.
    pub warnings: Vec<Warning>,
    pub report: ExpandReport,
}

/// Merge the fragments of all documents (in the given order), expand them to
/// the fixpoint and select the output files.
pub fn tangle<I>(documents: I, options: &TangleOptions) -> Result<Tangled, DiagnosticError>
where
    I: IntoIterator<Item = Document>,
{
    let mut warnings = Vec::new();
    let mut fragments = Vec::new();
    for document in documents {
        warnings.extend(document.warnings);
        fragments.extend(document.fragments);
    }

    let merged = weave::merge(fragments, options.redefine);
    warnings.extend(merged.warnings);
    let mut chunks = merged.chunks;

    let report = expand(
        &mut chunks,
        &ExpandOptions {
            max_passes: options.max_passes,
        },
    )?;
    let files = select_files(&chunks);

    Ok(Tangled {
        files,
        chunks,
        warnings,
        report,
    })
}

/// [`tangle`] over raw texts; each text's index is its source id.
pub fn tangle_sources(sources: &[&str], options: &TangleOptions) -> Result<Tangled, DiagnosticError> {
    tangle(
        sources
            .iter()
            .enumerate()
            .map(|(id, source)| weave::extract(source, id)),
        options,
    )
}
