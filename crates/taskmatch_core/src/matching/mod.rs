//! Skill matching primitives: token scoring and candidate pool selection.
//!
//! # Responsibility
//! - Score candidates against work items by literal token overlap.
//! - Build the deterministic candidate pool for one assignment run.
//!
//! # Invariants
//! - Matching is case-insensitive and purely literal: no stemming, no
//!   synonyms, no fuzzy comparison.
//! - Pool order only depends on backing data, never on hash iteration.

pub mod pool;
pub mod score;
