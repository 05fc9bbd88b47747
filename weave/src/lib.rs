pub mod chunk;
pub mod document;
pub mod parser;
pub mod store;
pub mod warning;

pub use chunk::{Chunk, ChunkMap, is_file_chunk};
pub use document::Document;
pub use parser::extract;
pub use store::{Merged, RedefinePolicy, merge};
pub use warning::Warning;
