//! Format codecs.
//!
//! - [`json`]: the engine-facing flat node array
//! - [`script`]: the human-authorable line-oriented script

pub mod json;
pub mod script;
