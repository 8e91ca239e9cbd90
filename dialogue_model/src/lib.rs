//! # Dialogue Model
//!
//! The authored-content crate - interactions, their ordered dialogue elements,
//! and the choice options that link one interaction to the next.
//! This crate holds plain value types only; indexing, validation and the
//! format codecs live in `dialogue_graph`.

pub mod interaction;
pub mod schema;

pub use interaction::*;
pub use schema::*;
