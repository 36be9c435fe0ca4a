//! SQL text assembly and safety checks.
//!
//! # Responsibility
//! - Compose statements from typed inputs (builder).
//! - Validate identifiers and caller fragments before emission (ident,
//!   guard).
//!
//! # Invariants
//! - Nothing in this module executes SQL; it only produces text plus
//!   bind vectors for the client layer.

pub mod builder;
pub mod guard;
pub mod ident;
