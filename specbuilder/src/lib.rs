//! # specbuilder
//!
//! Composable editors for nested, type-tagged query spec options.
//!
//! A host renders widgets and persists a single JSON value,
//! `{ "builder": ..., "settings": {...} }`. This crate holds the editor tree
//! behind those widgets and the rules by which edits travel through it:
//!
//! - a fragment's shape is chosen from its `type` tag through a registry,
//!   and switching tags prunes every field the new kind does not declare;
//! - edits deep in the tree are returned as full option values and merged
//!   by each parent on the way to the root;
//! - list rows carry identities that survive insertion, removal and
//!   reordering, so nested editors keep their state.
//!
//! ## Quick Start
//!
//! ```rust
//! use specbuilder::{Action, Address, Family, Options, Session};
//!
//! let mut session = Session::new(Family::Aggregation, Options::default());
//! session.apply(&Address::root(), Action::Pick("cardinality".into()));
//! session.apply(
//!     &Address::root().child(),
//!     Action::AddRow { list: "fields".into() },
//! );
//!
//! let json = serde_json::to_value(session.options()).unwrap();
//! assert_eq!(json["builder"]["fields"], serde_json::json!([{}]));
//! ```
//!
//! ## Modules
//!
//! - [`data`] - fragments, options, field declarations and built-in kinds
//! - [`editor`] - dispatchers, forms, list editors and event routing
//! - [`session`] - host adapter: persistence and change listeners

#[macro_use]
extern crate log;

/// Fragments, options and node kind declarations.
pub mod data;

/// Editors and event routing.
pub mod editor;

/// Errors raised inside the editor tree.
pub mod error;

/// Host adapter.
pub mod session;

pub use data::{ConfigNode, Family, Options, Settings};
pub use editor::{Action, Address, RowId, Step, TypeDispatcher};
pub use error::EditError;
pub use serde_json::Value;
pub use session::Session;
