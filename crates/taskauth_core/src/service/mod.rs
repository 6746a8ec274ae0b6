//! Use-case services composed from the store, auth and model layers.
//!
//! # Responsibility
//! - `credential_store`: identity creation, profile patches, credential lookup.
//! - `account_service`: session lifecycle and self-service account operations.
//! - `task_service`: ownership-scoped task CRUD.
//!
//! # Invariants
//! - Services stay storage-agnostic; they only see repository traits.
//! - Owner scoping is applied before any task read or write.

pub mod account_service;
pub mod credential_store;
pub mod task_service;
