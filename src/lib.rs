//! An ordered map backed by an AVL tree.
//!
//! `AvlMap` keeps its entries sorted by key and stays height-balanced across
//! arbitrary insert/remove sequences, so lookup, insertion, and deletion are
//! all O(log n). Nodes live in an index-based arena with a free list rather
//! than behind individual allocations; removed slots are recycled by later
//! insertions.
//!
//! Unlike the std maps, [`AvlMap::insert`] refuses duplicates instead of
//! overwriting: inserting an existing key returns `false` and leaves the
//! stored value untouched.

mod avl_map;
mod error;

pub use avl_map::{AvlMap, Iter};
pub use error::MapError;
