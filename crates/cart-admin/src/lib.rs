//! Admin and public HTTP API for the tenant credential platform.
//!
//! Serves credential management (`/admin/stripe-keys`), tenant
//! configuration (`/admin/tenant-config`), the public configuration subset
//! (`/public/tenant-config`), and webhook test delivery
//! (`/admin/webhook-test`). Caller identity comes from a JWT bearer token;
//! the ownership check against the target client id decides whether secret
//! fields are disclosed as plaintext or masked.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use config::AdminConfig;
pub use error::AdminError;
pub use server::{build_state, router, run};
pub use state::AppState;
