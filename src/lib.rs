//! Session-key authorization for ERC-4337 user operations
//!
//! This crate re-exports the workspace members so applications can depend on a
//! single package:
//!
//! - [`core`]: allow-list trees, session claims, circuit inputs and signature
//!   composition (always available)
//! - [`ethereum`]: user operations, bundler/paymaster clients and the session
//!   pipeline (`ethereum` feature, on by default)
//! - [`noir`]: `nargo`/`bb` proof backend (`noir` feature)
//!
//! ```toml
//! [dependencies]
//! zksession = { version = "0.1", features = ["full"] }
//! ```

pub use zksession_core as core;

#[cfg(feature = "ethereum")]
pub use zksession_ethereum as ethereum;

#[cfg(feature = "noir")]
pub use zksession_noir as noir;
