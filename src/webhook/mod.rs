//! Inbound webhook authentication and filtering.

pub mod filter;
pub mod signature;

pub use filter::{decide, resolve_commit, FilterDecision};
pub use signature::{compute_signature, format_signature_header, verify_signature};
