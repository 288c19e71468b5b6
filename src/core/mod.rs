//! core
//!
//! Configuration schema and loading.
//!
//! # Design Principles
//!
//! - Schemas are strict: unknown keys are rejected
//! - Defaults live in accessors, not in the file
//! - Validation runs on every load and before every write

pub mod config;
