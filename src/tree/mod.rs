//! The node tree: wire types, pure derivations, selection, the cached
//! store and drag-and-drop.

pub mod dnd;
pub mod model;
pub mod node;
pub mod selection;
pub mod store;
