// Adapters layer: concrete StoreClient implementations.

pub mod memory;

pub use memory::MemoryStore;
