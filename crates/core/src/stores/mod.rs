pub mod chroma;
pub mod memory;

pub use chroma::ChromaStore;
pub use memory::MemoryStore;
