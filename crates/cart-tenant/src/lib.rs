//! Tenant credential records and their lifecycle.
//!
//! One record per tenant, keyed by client id, holding Stripe keys, webhook
//! signing secrets, and shipping-carrier credentials. Every field that
//! semantically represents a secret is stored wrapped
//! (`ENCRYPTED(<base64>)`, via [`cart_vault`]); publishable keys are public
//! by design and stored as-is.
//!
//! Writes are partial merges: a request supplies only the fields it wants
//! to change, everything else retains its stored value. Concurrent writers
//! to the same record are last-writer-wins at the record level, with no
//! optimistic-concurrency token; this is an accepted limitation of the
//! read-merge-write pattern.
//!
//! Storage backends are pluggable behind [`TenantStore`]: an in-memory map
//! for tests and development, and a Postgres document table behind the
//! `postgres` feature.

mod directory;
mod error;
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod provider;
mod record;
mod store;

pub use directory::{
    ActiveCredentials, CarrierCredentials, CarrierProvider, CredentialView, TenantDirectory,
};
pub use error::{StoreError, TenantError};
#[cfg(feature = "memory")]
pub use memory::MemoryTenantStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresTenantStore;
pub use provider::{build_store, StoreConfig};
pub use record::{CredentialField, Mode, TenantPatch, TenantRecord};
pub use store::TenantStore;
