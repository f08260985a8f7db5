//! core
//!
//! Shared building blocks for bam.
//!
//! # Modules
//!
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Paths stored inside scene files
//!
//! # Design Principles
//!
//! - Schemas are strict and self-describing
//! - Stored paths stay raw bytes until they meet the local filesystem

pub mod config;
pub mod paths;
