//! Application configuration snapshots.
//!
//! Configuration rows live in a scoped key/value store: `global` rows apply
//! everywhere, environment rows (`dev`, `prod`) override them. A
//! [`ConfigCache`] merges the two scopes into an [`AppConfig`] snapshot and
//! serves it from memory inside a TTL, with an explicit
//! `load`/`refresh`/`invalidate` lifecycle so the cache can be constructed,
//! injected, and tested like any other component.

mod cache;
mod error;
mod memory;
mod store;

pub use cache::{AppConfig, ConfigCache};
pub use error::ConfigError;
pub use memory::MemoryConfigStore;
pub use store::{ConfigEntry, ConfigScope, ConfigStore};
