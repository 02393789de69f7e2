#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for Sprig.
//!
//! - [`types`]: the closed type representation, unification, assignability,
//!   generic binding and the Go mapping.
//! - [`utils`]: Go identifier and literal helpers shared by the generator.

pub mod types;
pub mod utils;


pub use types::{Bindings, PrimitiveKind, RecordField, Type, TypeScheme, UnifyError};
