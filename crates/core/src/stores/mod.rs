pub mod memory;
pub mod opensearch;

pub use memory::{discover_corpus_files, MemoryChunkStore};
pub use opensearch::OpenSearchChunkStore;
