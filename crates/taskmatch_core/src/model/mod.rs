//! Domain model for projects, staff and work items.
//!
//! # Responsibility
//! - Define plain records shared by repositories, matching and services.
//! - Keep storage-specific encoding (status text, flags) out of callers.
//!
//! # Invariants
//! - All identities are SQLite integer row ids and are never reused.
//! - Records are read models; writes go through repositories.

pub mod directory;
pub mod plan;
pub mod work;
