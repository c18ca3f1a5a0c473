//! # rdfdoc
//!
//! Multi-pass resolution and denormalization of an RDF corpus into one
//! self-contained JSON document per primary entity.
//!
//! A primary entity's description is scattered across blank nodes and
//! independent "satellite" entities that many primaries share. The pipeline
//! joins them back together in three passes over partitioned N-Triples:
//!
//! - `resolve`: materialize one-hop property paths into flat literals,
//! - `index`: record, for every satellite, the primaries that reference it,
//! - `convert`: fan every triple out to each document that needs it and
//!   assemble the documents as bulk-index lines.
//!
//! ## Example
//!
//! ```rust
//! use rdfdoc::config::ResolutionRules;
//! use rdfdoc::Result;
//!
//! fn example() -> Result<()> {
//!     let rules = ResolutionRules::parse(
//!         "resolve=http://example.org/hasLocation\npredicates=\nparents=\n",
//!         "http://example.org/org/",
//!     )?;
//!     assert!(rules.resolve.contains("http://example.org/hasLocation"));
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_borrows_for_generic_args)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::new_without_default)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_update)]
#![allow(clippy::return_self_not_must_use)]

/// Document assembly, JSON shaping and bulk output
pub mod assembly;

/// Resolution rules
pub mod config;

/// Core data structures and types
pub mod core;

pub mod error;

/// Local map/shuffle/reduce executor
pub mod execution;

/// Satellite index build and lookup
pub mod indexing;

/// N-Triples and properties parsing
pub mod parsing;

/// Stage drivers
pub mod pipeline;

pub mod resolution;

pub mod routing;

pub mod storage;

// Re-export commonly used types
pub use error::{Error, Result};
