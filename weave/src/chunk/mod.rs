pub mod fragment;
pub mod reference;

use std::collections::HashMap;
use std::ops::Range;

use crate::chunk::reference::Reference;

/// Whether a chunk name designates an output file.
///
/// Every file-selection decision goes through this predicate.
pub fn is_file_chunk(name: &str) -> bool {
    name.contains('.')
}

/// Where a chunk was established in the sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub source_id: usize,
    /// Byte span of the opener line.
    pub span: Range<usize>,
}

/// A named, ordered sequence of lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// The chunk name, without `<<`/`>>` delimiters.
    pub name: String,
    pub lines: Vec<String>,
    pub origin: Origin,
}

impl Chunk {
    pub fn new(name: impl Into<String>, lines: Vec<String>, origin: Origin) -> Self {
        Chunk {
            name: name.into(),
            lines,
            origin,
        }
    }

    pub fn is_file(&self) -> bool {
        is_file_chunk(&self.name)
    }

    /// Reference lines in body order.
    pub fn references(&self) -> impl Iterator<Item = Reference<'_>> {
        self.lines.iter().filter_map(|line| Reference::parse(line))
    }

    /// True once no line of the body is a reference line.
    pub fn is_resolved(&self) -> bool {
        self.references().next().is_none()
    }

    /// The body as written to disk: lines joined by `\n`.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Chunk name → chunk, iterated in first-appearance order.
///
/// Expansion visits chunks in this order, so it is fixed for a given input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMap {
    chunks: Vec<Chunk>,
    index: HashMap<String, usize>,
}

impl ChunkMap {
    pub fn new() -> Self {
        ChunkMap::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Chunk> {
        self.index.get(name).map(|&i| &self.chunks[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Chunk> {
        self.index.get(name).map(|&i| &mut self.chunks[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut Chunk> {
        self.chunks.get_mut(index)
    }

    /// Current lines of a chunk.
    pub fn lines(&self, name: &str) -> Option<&[String]> {
        self.get(name).map(|c| c.lines.as_slice())
    }

    /// Insert a chunk. An existing chunk of the same name is replaced in
    /// place (keeping its position) and returned.
    pub fn insert(&mut self, chunk: Chunk) -> Option<Chunk> {
        match self.index.get(&chunk.name) {
            Some(&i) => Some(std::mem::replace(&mut self.chunks[i], chunk)),
            None => {
                self.index.insert(chunk.name.clone(), self.chunks.len());
                self.chunks.push(chunk);
                None
            }
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.name.as_str())
    }

    /// Chunks that still contain reference lines.
    pub fn unresolved(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|c| !c.is_resolved())
    }
}

impl<'a> IntoIterator for &'a ChunkMap {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
