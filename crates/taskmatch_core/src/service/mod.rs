//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the HTTP and CLI layers decoupled from storage details.

pub mod assignment_service;
pub mod directory_service;
pub mod plan_service;
