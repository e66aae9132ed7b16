//! Data model of the composition protocol.
//!
//! - [`node`] - configuration fragments and allow-list pruning
//! - [`options`] - the `{builder, settings}` value and the settings merge
//! - [`field`] - scalar field declarations and input coercion
//! - [`catalog`] - built-in node kinds grouped into families

/// Built-in node kinds.
pub mod catalog;

/// Scalar field declarations.
pub mod field;

/// Configuration fragments.
pub mod node;

/// The options value exchanged across the tree.
pub mod options;

pub use catalog::{Family, FormSchema};
pub use node::ConfigNode;
pub use options::{Options, Settings};
