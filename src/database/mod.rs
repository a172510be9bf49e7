pub mod memory;
pub mod pg_store;
pub mod pool;
pub mod store;

pub use memory::MemoryStore;
pub use pg_store::PgStore;
pub use store::Store;
