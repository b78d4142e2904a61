//! A growing arena of fixed-size slots with free-list recycling.
//!
//! A [Pyramid] maps pages which grow geometrically as they are exhausted (16 slots, then 256, then 4096, ... by
//! default).  Freed slots go on an intrusive free list which is always consulted first, so allocation and
//! deallocation are O(1) and pointers are never invalidated until they are freed or the arena is dropped.  Memory is
//! only ever given back to the system when the whole arena goes away.
//!
//! The arena deals in uninitialized storage only.  Constructing and dropping items is left to a typed layer on top,
//! for example the node pools in `pooled_lists`.  Generic containers can use any [NodeAllocator].
mod allocator;
mod error;
mod page;
mod pyramid;

pub use allocator::*;
pub use error::*;
pub use pyramid::*;
