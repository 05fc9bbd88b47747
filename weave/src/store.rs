use std::collections::HashMap;

use crate::chunk::fragment::{Fragment, Mode};
use crate::chunk::{Chunk, ChunkMap, Origin};
use crate::warning::Warning;

/// What a second `<<name>>=` does to a chunk that already has content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedefinePolicy {
    /// The new body replaces the existing lines. Later appends accumulate onto it.
    #[default]
    Replace,
    /// The new body is concatenated onto the existing lines, like an append.
    Accumulate,
}

/// Result of folding fragments into a chunk store.
#[derive(Debug, Clone)]
pub struct Merged {
    pub chunks: ChunkMap,
    /// One warning per define that hit an existing chunk.
    pub warnings: Vec<Warning>,
}

/// Fold fragments, in document order, into a name → lines mapping.
pub fn merge<I>(fragments: I, policy: RedefinePolicy) -> Merged
where
    I: IntoIterator<Item = Fragment>,
{
    let mut chunks = ChunkMap::new();
    let mut warnings = Vec::new();
    // First `define` seen for each name.
    let mut defined: HashMap<String, Origin> = HashMap::new();

    for fragment in fragments {
        let Fragment {
            name,
            mode,
            lines,
            header,
            source_id,
            ..
        } = fragment;
        let origin = Origin {
            source_id,
            span: header,
        };

        let Some(chunk) = chunks.get_mut(&name) else {
            log::trace!("new chunk `{}`", name);
            if mode == Mode::Define {
                defined.insert(name.clone(), origin.clone());
            }
            chunks.insert(Chunk::new(name, lines, origin));
            continue;
        };

        match mode {
            Mode::Append => chunk.lines.extend(lines),
            Mode::Define => {
                warnings.push(redefinition_warning(
                    &name,
                    &origin,
                    defined.get(&name).unwrap_or(&chunk.origin),
                    defined.contains_key(&name),
                    policy,
                ));
                match policy {
                    RedefinePolicy::Replace => {
                        chunk.lines = lines;
                        chunk.origin = origin.clone();
                    }
                    RedefinePolicy::Accumulate => chunk.lines.extend(lines),
                }
                defined.entry(name).or_insert(origin);
            }
        }
    }

    Merged { chunks, warnings }
}

fn redefinition_warning(
    name: &str,
    at: &Origin,
    previous: &Origin,
    previously_defined: bool,
    policy: RedefinePolicy,
) -> Warning {
    let (message, previous_label) = if previously_defined {
        (format!("chunk `{}` is defined more than once", name), "first defined here")
    } else {
        (format!("chunk `{}` is defined after being appended to", name), "first appended here")
    };
    let note = match policy {
        RedefinePolicy::Replace => "the earlier content was replaced; use `+` to append",
        RedefinePolicy::Accumulate => "the new body was appended to the earlier content",
    };
    Warning::new(message, at.span.clone(), at.source_id)
        .with_label("redefined here")
        .with_related(previous.source_id, previous.span.clone(), previous_label)
        .with_note(note)
}
