//! Credential hashing, session tokens and the request auth gate.
//!
//! # Responsibility
//! - Hash and verify passwords (`password`).
//! - Sign and verify opaque session tokens (`token`).
//! - Track which tokens are still live per identity (`registry`).
//! - Resolve a bearer header into a trusted identity context (`gate`).
//!
//! # Invariants
//! - Token verification alone never authenticates a request; the gate also
//!   requires the token to be present in the identity's active set.
//! - Tokens carry no expiry claim. A token stays valid until revoked.

pub mod gate;
pub mod password;
pub mod registry;
pub mod token;
