//! Command implementations for the zksession CLI tool

pub mod session;
pub mod tree;

pub use session::{cmd_open_session, cmd_send};
pub use tree::{cmd_allowlist_root, cmd_build_inputs, cmd_claims_root};
