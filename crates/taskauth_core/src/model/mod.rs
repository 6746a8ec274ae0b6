//! Domain records for identities and the tasks they own.
//!
//! # Responsibility
//! - Define canonical record shapes and their field-level validation.
//! - Define the closed sets of client-updatable fields per record type.
//!
//! # Invariants
//! - Every record is identified by a store-assigned `Uuid`.
//! - Password hashes and session tokens have no outward serialization.

pub mod identity;
pub mod patch;
pub mod task;
