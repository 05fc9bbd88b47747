use std::collections::BTreeMap;

use weave::{ChunkMap, is_file_chunk};

/// Output filename → rendered content for every file-designating chunk.
pub fn select_files(chunks: &ChunkMap) -> BTreeMap<String, String> {
    select_files_with(chunks, is_file_chunk)
}

/// Like [`select_files`], with a different notion of which names are files.
pub fn select_files_with<F>(chunks: &ChunkMap, is_file: F) -> BTreeMap<String, String>
where
    F: Fn(&str) -> bool,
{
    chunks
        .iter()
        .filter(|chunk| is_file(&chunk.name))
        .map(|chunk| (chunk.name.clone(), chunk.render()))
        .collect()
}
