//! Surveyor: stable placeholder names for obfuscated artifacts.
//!
//! Surveyor assigns deterministic placeholder names (`class_17`, `method_42`,
//! `field_3`) to the obfuscated symbols of a binary artifact and keeps those
//! names stable across successive releases. It consumes a pre-built structural
//! index of the artifact; it never parses class files itself.
//!
//! The crate is organized leaves-first:
//! - Ordering key for deterministic traversal
//! - Naming ledger: append-only record of every name ever minted
//! - Match correlator: old-version to new-version symbol correspondence
//! - Hierarchy resolver: ancestor sets and override suppression
//! - Interface unifier: shared names for sibling-interface signatures
//! - Constructor side table: names the primary mapping format cannot carry
//! - Generator: the classification pass itself

pub mod constructors;
pub mod error;
pub mod generator;
pub mod hierarchy;
pub mod index;
pub mod ledger;
pub mod mapping;
pub mod matches;
pub mod order;
pub mod types;
pub mod unifier;
pub mod util;

pub use error::{Result, SurveyorError};
pub use generator::{Generator, GeneratorConfig, GeneratorInputs, RunOutput, RunReport};
