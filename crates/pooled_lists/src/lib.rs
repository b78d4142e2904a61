//! Linked lists whose nodes live in shared, arena-backed pools.
//!
//! A [NodePool] (or a [ForwardListPool]) owns the memory, carved out of a [pyramid::Pyramid] unless told otherwise,
//! and any number of lists borrow it.  The lists themselves only own link topology.  This makes node allocation a
//! free-list pop in the steady state, and lets lists which share a pool keep their nodes close together.
//!
//! Elements are addressed by [Position]s, which stay valid until their element is erased no matter what else happens
//! to the list.  Since nothing can check that, the methods taking them are `unsafe`; [CursorMut] and the iterators are
//! the safe way in.
mod cursor;
mod forward_list;
mod list;
mod node_pool;
mod ordered_list;

pub use cursor::CursorMut;
pub use forward_list::{FwdIter, FwdIterMut, FwdPosition, ForwardList, ForwardListNode, ForwardListPool};
pub use list::{Iter, IterMut, List, ListNode, Position};
pub use node_pool::NodePool;
pub use ordered_list::OrderedList;

pub use pyramid::{NodeAllocator, Pyramid, PyramidConfig, PyramidError, Result};
