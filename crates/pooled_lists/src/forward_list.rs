use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

use pyramid::{NodeAllocator, Pyramid, PyramidConfig, Result};

use crate::node_pool::ArenaCell;

#[repr(C)]
pub(crate) struct FwdLink {
    next: Option<NonNull<FwdLink>>,
}

/// A node of a [ForwardList].
#[repr(C)]
pub struct ForwardListNode<T> {
    #[allow(dead_code)]
    link: FwdLink,
    item: T,
}

impl<T> ForwardListNode<T> {
    fn unlinked(item: T) -> Self {
        ForwardListNode {
            link: FwdLink { next: None },
            item,
        }
    }
}

#[inline(always)]
unsafe fn item_ref<'a, T>(link: NonNull<FwdLink>) -> &'a T {
    unsafe { &(*link.cast::<ForwardListNode<T>>().as_ptr()).item }
}

#[inline(always)]
unsafe fn item_mut<'a, T>(link: NonNull<FwdLink>) -> &'a mut T {
    unsafe { &mut (*link.cast::<ForwardListNode<T>>().as_ptr()).item }
}

/// Names an element of a [ForwardList], its before-the-beginning head, or the end.
///
/// Like [crate::Position], nothing tracks these, so the operations which accept one are `unsafe`.
pub struct FwdPosition<T> {
    /// `None` is the end.
    link: Option<NonNull<FwdLink>>,
    _phantom: PhantomData<*const T>,
}

impl<T> FwdPosition<T> {
    fn new(link: Option<NonNull<FwdLink>>) -> Self {
        FwdPosition {
            link,
            _phantom: PhantomData,
        }
    }
}

impl<T> Clone for FwdPosition<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FwdPosition<T> {}

impl<T> PartialEq for FwdPosition<T> {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link
    }
}

impl<T> Eq for FwdPosition<T> {}

impl<T> std::fmt::Debug for FwdPosition<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.link {
            Some(l) => f.debug_tuple("FwdPosition").field(&l.as_ptr()).finish(),
            None => f.write_str("FwdPosition(end)"),
        }
    }
}

/// A singly-linked list.
///
/// The list itself is only a head link and a borrow of the [ForwardListPool] which made it; everything which adds or
/// removes nodes goes through the pool.  Dropping the list destroys whatever is still in it, so
/// [ForwardListPool::destroy_list] is only needed to empty a list early.
pub struct ForwardList<'p, T, A: NodeAllocator<Item = ForwardListNode<T>> = Pyramid<ForwardListNode<T>>> {
    pool: &'p ForwardListPool<T, A>,

    /// Boxed, so that [ForwardList::before_begin] survives moves of the list.
    head: NonNull<FwdLink>,

    _owns: PhantomData<T>,
}

fn new_head() -> NonNull<FwdLink> {
    NonNull::from(Box::leak(Box::new(FwdLink { next: None })))
}

impl<'p, T, A: NodeAllocator<Item = ForwardListNode<T>>> ForwardList<'p, T, A> {
    pub fn pool(&self) -> &'p ForwardListPool<T, A> {
        self.pool
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }

    /// The head, which precedes the first element.  Only useful with the `_after` operations.
    pub fn before_begin(&self) -> FwdPosition<T> {
        FwdPosition::new(Some(self.head))
    }

    pub fn begin(&self) -> FwdPosition<T> {
        FwdPosition::new(self.first())
    }

    pub fn end(&self) -> FwdPosition<T> {
        FwdPosition::new(None)
    }

    pub fn front(&self) -> Option<&T> {
        self.first().map(|l| unsafe { item_ref(l) })
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.first().map(|l| unsafe { item_mut(l) })
    }

    /// # Safety
    ///
    /// `pos` must be a live element of this list: not the head and not the end.
    pub unsafe fn get(&self, pos: FwdPosition<T>) -> &T {
        debug_assert!(pos.link.is_some(), "The end holds no item");
        unsafe { item_ref(pos.link.unwrap_unchecked()) }
    }

    /// # Safety
    ///
    /// As [ForwardList::get].
    pub unsafe fn get_mut(&mut self, pos: FwdPosition<T>) -> &mut T {
        debug_assert!(pos.link.is_some(), "The end holds no item");
        unsafe { item_mut(pos.link.unwrap_unchecked()) }
    }

    /// The position after `pos`.  The end stays at the end.
    ///
    /// # Safety
    ///
    /// `pos` must be a position of this list.
    pub unsafe fn next(&self, pos: FwdPosition<T>) -> FwdPosition<T> {
        FwdPosition::new(pos.link.and_then(|l| unsafe { (*l.as_ptr()).next }))
    }

    /// Move every element into a new list bound to the same pool, leaving this one empty.
    ///
    /// [ForwardList::before_begin] moves with the elements.
    pub fn take(&mut self) -> Self {
        let taken = ForwardList {
            pool: self.pool,
            head: self.head,
            _owns: PhantomData,
        };
        self.head = new_head();
        taken
    }

    pub fn iter(&self) -> FwdIter<'_, T> {
        FwdIter {
            cur: self.first(),
            _phantom: PhantomData,
        }
    }

    pub fn iter_mut(&mut self) -> FwdIterMut<'_, T> {
        FwdIterMut {
            cur: self.first(),
            _phantom: PhantomData,
        }
    }

    fn first(&self) -> Option<NonNull<FwdLink>> {
        unsafe { (*self.head.as_ptr()).next }
    }
}

impl<'p, T, A: NodeAllocator<Item = ForwardListNode<T>>> Drop for ForwardList<'p, T, A> {
    fn drop(&mut self) {
        unsafe {
            self.pool.release_chain(self.head);
            drop(Box::from_raw(self.head.as_ptr()));
        }
    }
}

impl<'p, 'q, T: PartialEq, A, B> PartialEq<ForwardList<'q, T, B>> for ForwardList<'p, T, A>
where
    A: NodeAllocator<Item = ForwardListNode<T>>,
    B: NodeAllocator<Item = ForwardListNode<T>>,
{
    fn eq(&self, other: &ForwardList<'q, T, B>) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<'p, T: Eq, A: NodeAllocator<Item = ForwardListNode<T>>> Eq for ForwardList<'p, T, A> {}

impl<'p, T: std::fmt::Debug, A: NodeAllocator<Item = ForwardListNode<T>>> std::fmt::Debug for ForwardList<'p, T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, 'p, T, A: NodeAllocator<Item = ForwardListNode<T>>> IntoIterator for &'a ForwardList<'p, T, A> {
    type Item = &'a T;
    type IntoIter = FwdIter<'a, T>;

    fn into_iter(self) -> FwdIter<'a, T> {
        self.iter()
    }
}

pub struct FwdIter<'a, T> {
    cur: Option<NonNull<FwdLink>>,
    _phantom: PhantomData<&'a T>,
}

impl<'a, T> Iterator for FwdIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let link = self.cur?;
        unsafe {
            self.cur = (*link.as_ptr()).next;
            Some(item_ref(link))
        }
    }
}

impl<'a, T> FusedIterator for FwdIter<'a, T> {}

pub struct FwdIterMut<'a, T> {
    cur: Option<NonNull<FwdLink>>,
    _phantom: PhantomData<&'a mut T>,
}

impl<'a, T> Iterator for FwdIterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        let link = self.cur?;
        unsafe {
            self.cur = (*link.as_ptr()).next;
            Some(item_mut(link))
        }
    }
}

impl<'a, T> FusedIterator for FwdIterMut<'a, T> {}

/// Makes [ForwardList]s and does all of their node work.
///
/// Every list borrows the pool which created it.  Operations that are handed a list check that it came from this
/// pool and panic otherwise, since its nodes would otherwise be returned to the wrong arena.
///
/// Cloning a pool gives a new, empty pool.
pub struct ForwardListPool<T, A: NodeAllocator<Item = ForwardListNode<T>> = Pyramid<ForwardListNode<T>>> {
    arena: ArenaCell<A>,
}

impl<T, A: NodeAllocator<Item = ForwardListNode<T>>> ForwardListPool<T, A> {
    pub fn new() -> Self {
        Self::with_allocator(A::default())
    }

    pub fn with_allocator(alloc: A) -> Self {
        ForwardListPool {
            arena: ArenaCell::new(alloc),
        }
    }

    pub fn create_list(&self) -> ForwardList<'_, T, A> {
        ForwardList {
            pool: self,
            head: new_head(),
            _owns: PhantomData,
        }
    }

    /// Destroy every element of `list`, leaving it empty.
    pub fn destroy_list(&self, list: &mut ForwardList<'_, T, A>) {
        self.check_owner(list);
        unsafe { self.release_chain(list.head) };
    }

    /// Construct `value` and link it just after `pos`, returning its position.  O(1).
    ///
    /// # Safety
    ///
    /// `pos` must be [ForwardList::before_begin] or a live element of `list`.
    pub unsafe fn insert_after(
        &self,
        list: &mut ForwardList<'_, T, A>,
        pos: FwdPosition<T>,
        value: T,
    ) -> Result<FwdPosition<T>> {
        self.check_owner(list);
        debug_assert!(pos.link.is_some(), "Cannot insert after the end");
        unsafe { self.link_new(pos.link.unwrap_unchecked(), value) }
    }

    /// Destroy the element after `pos`, returning the position which then follows `pos`.  O(1).
    ///
    /// There being nothing after `pos` is not an error: the list is left alone and the end is returned.
    ///
    /// # Safety
    ///
    /// `pos` must be [ForwardList::before_begin], a live element of `list`, or the end.
    pub unsafe fn erase_after(&self, list: &mut ForwardList<'_, T, A>, pos: FwdPosition<T>) -> FwdPosition<T> {
        self.check_owner(list);
        let Some(at) = pos.link else {
            return FwdPosition::new(None);
        };
        unsafe {
            if let Some(victim) = self.unlink_after(at) {
                self.arena.dispose(victim.cast());
            }
            FwdPosition::new((*at.as_ptr()).next)
        }
    }

    /// Insert `value` before the first element which does not precede it under `less`.  O(n).
    pub fn insert_by(
        &self,
        list: &mut ForwardList<'_, T, A>,
        value: T,
        mut less: impl FnMut(&T, &T) -> bool,
    ) -> Result<FwdPosition<T>> {
        self.check_owner(list);
        let mut prev = list.head;
        unsafe {
            while let Some(next) = (*prev.as_ptr()).next {
                if !less(item_ref(next), &value) {
                    break;
                }
                prev = next;
            }
            self.link_new(prev, value)
        }
    }

    /// Destroy the first element for which `differs(element, value)` is false, skipping over every element for which
    /// it holds.  Returns whether one was found.  O(n).
    pub fn erase_by(
        &self,
        list: &mut ForwardList<'_, T, A>,
        value: &T,
        mut differs: impl FnMut(&T, &T) -> bool,
    ) -> bool {
        self.check_owner(list);
        let mut prev = list.head;
        unsafe {
            while let Some(next) = (*prev.as_ptr()).next {
                if !differs(item_ref(next), value) {
                    self.unlink_after(prev);
                    self.arena.dispose(next.cast());
                    return true;
                }
                prev = next;
            }
        }
        false
    }

    pub fn push_front(&self, list: &mut ForwardList<'_, T, A>, value: T) -> Result<()> {
        self.check_owner(list);
        unsafe { self.link_new(list.head, value) }.map(|_| ())
    }

    pub fn pop_front(&self, list: &mut ForwardList<'_, T, A>) -> Option<T> {
        self.check_owner(list);
        unsafe {
            let node = self.unlink_after(list.head)?;
            Some(self.arena.extract(node.cast()).item)
        }
    }

    fn check_owner(&self, list: &ForwardList<'_, T, A>) {
        assert!(
            std::ptr::eq(list.pool, self),
            "This list was created by a different pool"
        );
    }

    unsafe fn link_new(&self, after: NonNull<FwdLink>, value: T) -> Result<FwdPosition<T>> {
        let link = self.arena.emplace(ForwardListNode::unlinked(value))?.cast::<FwdLink>();
        unsafe {
            (*link.as_ptr()).next = (*after.as_ptr()).next;
            (*after.as_ptr()).next = Some(link);
        }
        Ok(FwdPosition::new(Some(link)))
    }

    /// Unlink and return the node after `at`, if any.
    unsafe fn unlink_after(&self, at: NonNull<FwdLink>) -> Option<NonNull<FwdLink>> {
        unsafe {
            let victim = (*at.as_ptr()).next?;
            (*at.as_ptr()).next = (*victim.as_ptr()).next;
            Some(victim)
        }
    }

    /// Detach everything after `head` and destroy it.
    unsafe fn release_chain(&self, head: NonNull<FwdLink>) {
        unsafe {
            let mut cur = (*head.as_ptr()).next.take();
            while let Some(link) = cur {
                cur = (*link.as_ptr()).next;
                self.arena.dispose(link.cast());
            }
        }
    }
}

impl<T: Ord, A: NodeAllocator<Item = ForwardListNode<T>>> ForwardListPool<T, A> {
    /// Insert `value` before the first element which is not less than it.
    pub fn insert(&self, list: &mut ForwardList<'_, T, A>, value: T) -> Result<FwdPosition<T>> {
        self.insert_by(list, value, T::lt)
    }
}

impl<T: PartialEq, A: NodeAllocator<Item = ForwardListNode<T>>> ForwardListPool<T, A> {
    /// Destroy the first element equal to `value`.  Returns whether one was found.
    pub fn erase(&self, list: &mut ForwardList<'_, T, A>, value: &T) -> bool {
        self.erase_by(list, value, T::ne)
    }
}

impl<T> ForwardListPool<T> {
    pub fn with_config(config: PyramidConfig) -> Self {
        Self::with_allocator(Pyramid::with_config(config))
    }

    pub fn live(&self) -> usize {
        self.arena.with(|a| a.live())
    }

    pub fn capacity(&self) -> usize {
        self.arena.with(|a| a.capacity())
    }

    pub fn page_count(&self) -> usize {
        self.arena.with(|a| a.page_count())
    }
}

impl<T, A: NodeAllocator<Item = ForwardListNode<T>>> Default for ForwardListPool<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: NodeAllocator<Item = ForwardListNode<T>>> Clone for ForwardListPool<T, A> {
    fn clone(&self) -> Self {
        Self::with_allocator(self.arena.with(|a| a.clone()))
    }
}

impl<T, A: NodeAllocator<Item = ForwardListNode<T>>> std::fmt::Debug for ForwardListPool<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardListPool").finish_non_exhaustive()
    }
}
