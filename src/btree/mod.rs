//! B+tree index page format.
//!
//! This module specifies the on-disk byte layout of leaf and internal nodes
//! ([`LeafPage`], [`InternalPage`]) and single-node insert/lookup over that
//! layout. Splitting a full node, merging underfull siblings, growing a new
//! root, and maintaining parent back-pointers across a multi-level tree are
//! deliberately not implemented: those are tree-level operations layered on
//! top of this page format, and this core does not specify them.

pub mod page;
pub mod type_info;

pub use page::{InternalPage, LeafPage, COMMON_HEADER_SIZE, INTERNAL_HEADER_SIZE, LEAF_HEADER_SIZE};
pub use type_info::TypeInfo;
