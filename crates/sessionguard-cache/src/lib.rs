//! # sessionguard-cache
//!
//! Session store implementations for SessionGuard:
//!
//! - **redis**: shared store for multi-node deployments, using the
//!   [redis](https://crates.io/crates/redis) crate and Lua scripts for
//!   atomic multi-key updates
//! - **memory**: in-process store for single-node use and tests
//!
//! The backend is selected at runtime based on configuration.

pub mod keys;
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use memory::MemorySessionStore;
pub use provider::SessionStoreManager;
