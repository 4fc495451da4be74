//! Hierarchical category tree engine.
//!
//! A nested taxonomy is kept in an arena, projected into level-tagged flat
//! rows for display, and edited through [`engine::CategoryEngine`], which
//! republishes the whole tree on every change.

pub mod broadcast;
pub mod config;
pub mod engine;
pub mod error;
pub mod expand_state;
pub mod identity;
pub mod mutation;
pub mod node;
pub mod projector;
pub mod seed;
pub mod selection;
pub mod tree;

pub use engine::CategoryEngine;
pub use error::{CategoryError, Result};
pub use node::{CategoryId, CategoryNode, CategoryRecord, ROOT_PARENT_ID};
pub use projector::{CategoryFlatNode, FlatId};
