//! In-memory session store for single-node deployments and tests.

pub mod glob;
pub mod store;

pub use store::MemorySessionStore;
