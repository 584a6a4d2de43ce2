//! Chain Module
//!
//! Ordered chain management over the flat settings store: the
//! per-plugin attribute adapter ([`store`]), the ordered chain model
//! with its mutations ([`model`]), and plugin state persistence
//! ([`state`]).

pub mod model;
pub mod state;
pub mod store;

pub use model::{ChainEntry, ChainModel};
pub use store::AttributeStore;
