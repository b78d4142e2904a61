use std::ptr::NonNull;

use crate::error::Result;
use crate::pyramid::Pyramid;

/// What a node-based container needs from an allocator of fixed-size nodes.
///
/// Instances are cheap to make: [Default] and [Clone] both give a fresh, empty allocator rather than a handle to an
/// existing one.  A container which is moved takes its allocator with it ([NodeAllocator::PROPAGATE_ON_MOVE]), and all
/// instances of one type claim to be interchangeable ([NodeAllocator::IS_ALWAYS_EQUAL]).  That claim only holds for
/// instances which really are the same live allocator; Rust containers should always deallocate through the instance
/// that allocated.
///
/// # Safety
///
/// Pointers returned from `allocate` must be aligned for and valid for reads and writes of one `Item`, must not alias
/// any other live allocation, and must stay valid until deallocated or the allocator is dropped.
pub unsafe trait NodeAllocator: Default + Clone {
    type Item;

    /// The same allocator, for a different item type.
    type Rebind<U>: NodeAllocator<Item = U>;

    const PROPAGATE_ON_MOVE: bool = true;
    const IS_ALWAYS_EQUAL: bool = true;

    fn allocate(&mut self) -> Result<NonNull<Self::Item>>;

    /// # Safety
    ///
    /// `ptr` must have come from `allocate` on this instance and not have been deallocated since.
    unsafe fn deallocate(&mut self, ptr: NonNull<Self::Item>);

    /// A fresh allocator of `U` configured like this one.
    fn rebind<U>(&self) -> Self::Rebind<U>;

    /// Allocate `n` items.  Node containers only ever ask for one.
    fn allocate_n(&mut self, n: usize) -> Result<NonNull<Self::Item>> {
        debug_assert_eq!(n, 1, "Node allocators hand out one item at a time");
        self.allocate()
    }

    /// # Safety
    ///
    /// As [NodeAllocator::deallocate], with `n` being the count passed to `allocate_n`.
    unsafe fn deallocate_n(&mut self, ptr: NonNull<Self::Item>, n: usize) {
        debug_assert_eq!(n, 1, "Node allocators hand out one item at a time");
        unsafe { self.deallocate(ptr) }
    }
}

unsafe impl<T> NodeAllocator for Pyramid<T> {
    type Item = T;
    type Rebind<U> = Pyramid<U>;

    #[inline]
    fn allocate(&mut self) -> Result<NonNull<T>> {
        Pyramid::allocate(self)
    }

    #[inline]
    unsafe fn deallocate(&mut self, ptr: NonNull<T>) {
        unsafe { Pyramid::deallocate(self, ptr) }
    }

    fn rebind<U>(&self) -> Pyramid<U> {
        Pyramid::with_config(*self.config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::PyramidConfig;

    fn churn<A: NodeAllocator<Item = u32>>(alloc: &mut A) -> NonNull<u32> {
        let a = alloc.allocate_n(1).unwrap();
        unsafe { alloc.deallocate_n(a, 1) };
        alloc.allocate().unwrap()
    }

    #[test]
    fn test_generic_use() {
        let mut arena = Pyramid::<u32>::new();
        let first = churn(&mut arena);
        assert_eq!(arena.live(), 1);
        unsafe { NodeAllocator::deallocate(&mut arena, first) };
        assert_eq!(arena.live(), 0);
    }

    #[test]
    fn test_rebind_keeps_config() {
        let config = PyramidConfig {
            first_page_slots: 3,
            growth_factor: 5,
        };
        let arena = Pyramid::<u32>::with_config(config);
        let rebound: Pyramid<String> = arena.rebind();
        assert_eq!(rebound.config(), &config);
        assert_eq!(rebound.page_count(), 0);
    }

    #[test]
    fn test_contract_constants() {
        assert!(<Pyramid<u8> as NodeAllocator>::PROPAGATE_ON_MOVE);
        assert!(<Pyramid<u8> as NodeAllocator>::IS_ALWAYS_EQUAL);
    }
}
