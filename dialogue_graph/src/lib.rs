//! # Dialogue Graph
//!
//! Storage, indexing, validation and format conversion for graphs of
//! [`dialogue_model::Interaction`]s.
//!
//! ## Core Components
//!
//! - **store**: `InteractionStore` with in-memory and file-per-interaction backends
//! - **index**: `InteractionService`, which keeps a child-to-parents index over a store
//! - **validation**: structural checks over flattened nodes, including cycle detection
//! - **codec**: the engine JSON node format and the authoring script format
//!
//! Export is all-or-nothing: a graph with validation errors is never written.

pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod node;
pub mod store;
pub mod validation;

pub use config::*;
pub use error::*;
pub use index::*;
pub use node::*;
pub use store::*;
pub use validation::*;
