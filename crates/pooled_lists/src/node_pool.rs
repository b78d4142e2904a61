use std::cell::UnsafeCell;
use std::ptr::NonNull;

use pyramid::{NodeAllocator, Pyramid, PyramidConfig, Result};

use crate::list::ListNode;

/// An allocator which can be used through a shared reference.
///
/// Several lists share one pool by borrowing it, so the pool has to be able to allocate through `&self`.  Access is
/// confined to [ArenaCell::with], and nothing which runs inside `with` can reach user code, so there is never more than
/// one live `&mut A`.
pub(crate) struct ArenaCell<A> {
    inner: UnsafeCell<A>,
}

impl<A: NodeAllocator> ArenaCell<A> {
    pub(crate) fn new(alloc: A) -> Self {
        ArenaCell {
            inner: UnsafeCell::new(alloc),
        }
    }

    /// `f` must not drop items, run comparators, or touch this cell again.
    #[inline(always)]
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        // Fine: the cell is !Sync and `with` never nests.
        f(unsafe { &mut *self.inner.get() })
    }

    /// Allocate a slot and move `node` into it.
    #[inline]
    pub(crate) fn emplace(&self, node: A::Item) -> Result<NonNull<A::Item>> {
        let ptr = self.with(|a| a.allocate())?;
        unsafe { ptr.as_ptr().write(node) };
        Ok(ptr)
    }

    /// Drop the node in place, then give its slot back.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from [ArenaCell::emplace] on this cell and not have been disposed of or extracted since.
    #[inline]
    pub(crate) unsafe fn dispose(&self, ptr: NonNull<A::Item>) {
        // The drop runs before we borrow the allocator; it may well come back into this pool.
        unsafe { ptr.as_ptr().drop_in_place() };
        self.with(|a| unsafe { a.deallocate(ptr) });
    }

    /// Move the node out, then give its slot back.
    ///
    /// # Safety
    ///
    /// As [ArenaCell::dispose].
    #[inline]
    pub(crate) unsafe fn extract(&self, ptr: NonNull<A::Item>) -> A::Item {
        let node = unsafe { ptr.as_ptr().read() };
        self.with(|a| unsafe { a.deallocate(ptr) });
        node
    }
}

/// A typed pool of nodes for [crate::List] and [crate::OrderedList].
///
/// The pool owns one allocator and does nothing but construct items into fresh slots and destroy them again; all link
/// topology belongs to the lists.  Any number of lists may borrow the same pool at once, and the borrow checker makes
/// sure the pool outlives all of them.
///
/// Cloning a pool gives a new, empty pool.
pub struct NodePool<T, A: NodeAllocator<Item = ListNode<T>> = Pyramid<ListNode<T>>> {
    arena: ArenaCell<A>,
}

impl<T, A: NodeAllocator<Item = ListNode<T>>> NodePool<T, A> {
    pub fn new() -> Self {
        Self::with_allocator(A::default())
    }

    pub fn with_allocator(alloc: A) -> Self {
        NodePool {
            arena: ArenaCell::new(alloc),
        }
    }

    /// Construct a node holding `item`.  Its links are left dangling for the list to fill in.
    pub fn create(&self, item: T) -> Result<NonNull<ListNode<T>>> {
        self.arena.emplace(ListNode::unlinked(item))
    }

    /// Drop the node's item and give the slot back to the allocator.
    ///
    /// # Safety
    ///
    /// `node` must have come from [NodePool::create] on this pool, must not be linked into any list, and must not
    /// have been destroyed or taken already.
    pub unsafe fn destroy(&self, node: NonNull<ListNode<T>>) {
        unsafe { self.arena.dispose(node) }
    }

    /// Like [NodePool::destroy], but hands the item back instead of dropping it.
    ///
    /// # Safety
    ///
    /// As [NodePool::destroy].
    pub unsafe fn take(&self, node: NonNull<ListNode<T>>) -> T {
        unsafe { self.arena.extract(node) }.into_item()
    }
}

impl<T> NodePool<T> {
    pub fn with_config(config: PyramidConfig) -> Self {
        Self::with_allocator(Pyramid::with_config(config))
    }

    /// Nodes currently constructed.
    pub fn live(&self) -> usize {
        self.arena.with(|a| a.live())
    }

    /// Slots across all pages of the underlying arena.
    pub fn capacity(&self) -> usize {
        self.arena.with(|a| a.capacity())
    }

    pub fn page_count(&self) -> usize {
        self.arena.with(|a| a.page_count())
    }
}

impl<T, A: NodeAllocator<Item = ListNode<T>>> Default for NodePool<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: NodeAllocator<Item = ListNode<T>>> Clone for NodePool<T, A> {
    fn clone(&self) -> Self {
        Self::with_allocator(self.arena.with(|a| a.clone()))
    }
}

impl<T, A: NodeAllocator<Item = ListNode<T>>> std::fmt::Debug for NodePool<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodePool").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use drop_probe::DropProbe;

    #[test]
    fn test_create_destroy() {
        let pool = NodePool::<String>::new();
        let node = pool.create("hello".to_string()).unwrap();
        assert_eq!(pool.live(), 1);
        assert_eq!(unsafe { node.as_ref() }.item(), "hello");

        unsafe { pool.destroy(node) };
        assert_eq!(pool.live(), 0);

        // The slot comes straight back.
        let again = pool.create("again".to_string()).unwrap();
        assert_eq!(again, node);
        assert_eq!(unsafe { pool.take(again) }, "again");
    }

    #[test]
    fn test_destroy_drops_once() {
        let probe = DropProbe::new();
        let pool = NodePool::<_>::new();

        let (h1, v1) = probe.probe(1u32);
        let (h2, v2) = probe.probe(2u32);
        let n1 = pool.create(v1).unwrap();
        let n2 = pool.create(v2).unwrap();
        probe.assert_exact(0);

        unsafe { pool.destroy(n1) };
        h1.assert_dropped();
        h2.assert_alive();
        probe.assert_exact(1);

        let taken = unsafe { pool.take(n2) };
        h2.assert_alive();
        assert_eq!(*taken, 2);
        drop(taken);
        h2.assert_dropped();
        probe.assert_exact(2);
    }

    #[test]
    fn test_clone_is_empty() {
        let pool = NodePool::<u8>::with_config(PyramidConfig {
            first_page_slots: 1,
            growth_factor: 2,
        });
        let node = pool.create(1).unwrap();
        let cloned = pool.clone();
        assert_eq!(cloned.live(), 0);
        assert_eq!(cloned.page_count(), 0);
        unsafe { pool.destroy(node) };
    }
}
