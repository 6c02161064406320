//! Chat store adapters.

pub mod memory_repo;
pub mod sqlite_repo;

pub use memory_repo::MemoryRepo;
pub use sqlite_repo::SqliteRepo;
