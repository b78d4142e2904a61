use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

use pyramid::{NodeAllocator, Pyramid, Result};

use crate::node_pool::NodePool;

/// The link half of a node.  The sentinel is a bare `Links` with no item after it.
#[repr(C)]
pub(crate) struct Links {
    next: NonNull<Links>,
    prev: NonNull<Links>,
}

/// A node of a [List]: links first, so that a pointer to the node is also a pointer to its links, then the item.
#[repr(C)]
pub struct ListNode<T> {
    // Only ever reached through a cast of the node pointer.
    #[allow(dead_code)]
    links: Links,
    item: T,
}

impl<T> ListNode<T> {
    pub(crate) fn unlinked(item: T) -> Self {
        ListNode {
            links: Links {
                next: NonNull::dangling(),
                prev: NonNull::dangling(),
            },
            item,
        }
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub(crate) fn into_item(self) -> T {
        self.item
    }
}

#[inline(always)]
pub(crate) unsafe fn next_of(link: NonNull<Links>) -> NonNull<Links> {
    unsafe { (*link.as_ptr()).next }
}

#[inline(always)]
pub(crate) unsafe fn prev_of(link: NonNull<Links>) -> NonNull<Links> {
    unsafe { (*link.as_ptr()).prev }
}

/// Splice `new` into the chain just before `at`.
#[inline(always)]
unsafe fn link_before(at: NonNull<Links>, new: NonNull<Links>) {
    unsafe {
        let prev = (*at.as_ptr()).prev;
        (*new.as_ptr()).next = at;
        (*new.as_ptr()).prev = prev;
        (*prev.as_ptr()).next = new;
        (*at.as_ptr()).prev = new;
    }
}

/// Take `link` out of its chain.  Its own pointers are left stale.
#[inline(always)]
unsafe fn unlink(link: NonNull<Links>) {
    unsafe {
        let prev = (*link.as_ptr()).prev;
        let next = (*link.as_ptr()).next;
        (*prev.as_ptr()).next = next;
        (*next.as_ptr()).prev = prev;
    }
}

#[inline(always)]
pub(crate) unsafe fn item_ref<'a, T>(link: NonNull<Links>) -> &'a T {
    unsafe { &(*link.cast::<ListNode<T>>().as_ptr()).item }
}

#[inline(always)]
pub(crate) unsafe fn item_mut<'a, T>(link: NonNull<Links>) -> &'a mut T {
    unsafe { &mut (*link.cast::<ListNode<T>>().as_ptr()).item }
}

fn new_sentinel() -> NonNull<Links> {
    let sentinel = NonNull::from(Box::leak(Box::new(Links {
        next: NonNull::dangling(),
        prev: NonNull::dangling(),
    })));

    unsafe {
        (*sentinel.as_ptr()).next = sentinel;
        (*sentinel.as_ptr()).prev = sentinel;
    }

    sentinel
}

/// Names an element of a [List], or its end.
///
/// Positions are plain handles: they stay valid across any insertion, rearrangement, or erasure of *other* elements,
/// and across moves of the list value itself, but nothing checks them.  That is why the methods which accept one are
/// `unsafe`.
pub struct Position<T> {
    link: NonNull<Links>,
    _phantom: PhantomData<*const T>,
}

impl<T> Position<T> {
    #[inline(always)]
    pub(crate) fn new(link: NonNull<Links>) -> Self {
        Position {
            link,
            _phantom: PhantomData,
        }
    }

    #[inline(always)]
    pub(crate) fn link(self) -> NonNull<Links> {
        self.link
    }
}

impl<T> Clone for Position<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Position<T> {}

impl<T> PartialEq for Position<T> {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link
    }
}

impl<T> Eq for Position<T> {}

impl<T> std::fmt::Debug for Position<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Position").field(&self.link.as_ptr()).finish()
    }
}

/// A circular doubly-linked list whose nodes live in a borrowed [NodePool].
///
/// The list owns only its link topology; node memory comes from the pool, which may back any number of lists at once.
/// A sentinel closes the chain into a circle, so the empty list is just the sentinel pointing at itself, and
/// [List::end] never needs special-casing.
///
/// Lists can't be cloned: copying nodes into a shared pool has no single obvious owner.  Moving is fine, and
/// [List::take] gives the moved-from-but-still-usable behaviour.
pub struct List<'p, T, A: NodeAllocator<Item = ListNode<T>> = Pyramid<ListNode<T>>> {
    pool: &'p NodePool<T, A>,

    /// Boxed so that moving the list does not move the sentinel out from under the nodes.
    sentinel: NonNull<Links>,

    len: usize,
    _owns: PhantomData<T>,
}

impl<'p, T, A: NodeAllocator<Item = ListNode<T>>> List<'p, T, A> {
    pub fn new(pool: &'p NodePool<T, A>) -> Self {
        List {
            pool,
            sentinel: new_sentinel(),
            len: 0,
            _owns: PhantomData,
        }
    }

    /// Build a list holding `values` in order.
    pub fn from_iter_in(pool: &'p NodePool<T, A>, values: impl IntoIterator<Item = T>) -> Result<Self> {
        let mut list = Self::new(pool);
        list.try_extend(values)?;
        Ok(list)
    }

    /// Append every value, stopping at the first allocation failure.
    pub fn try_extend(&mut self, values: impl IntoIterator<Item = T>) -> Result<()> {
        for v in values {
            self.push_back(v)?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &'p NodePool<T, A> {
        self.pool
    }

    /// Clear the list, then switch it to a different pool.
    pub fn set_pool(&mut self, pool: &'p NodePool<T, A>) {
        self.clear();
        self.pool = pool;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.len == 0, unsafe { next_of(self.sentinel) } == self.sentinel);
        self.len == 0
    }

    pub fn begin(&self) -> Position<T> {
        Position::new(unsafe { next_of(self.sentinel) })
    }

    pub fn end(&self) -> Position<T> {
        Position::new(self.sentinel)
    }

    pub fn front(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { item_ref(next_of(self.sentinel)) })
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { item_mut(next_of(self.sentinel)) })
    }

    pub fn back(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { item_ref(prev_of(self.sentinel)) })
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { item_mut(prev_of(self.sentinel)) })
    }

    /// Construct `value` in the pool and link it just before `before`, returning its position.  O(1).
    ///
    /// # Safety
    ///
    /// `before` must be a position of this list: a live element or [List::end].
    pub unsafe fn insert(&mut self, before: Position<T>, value: T) -> Result<Position<T>> {
        let link = unsafe { self.insert_link(before.link(), value) }?;
        Ok(Position::new(link))
    }

    /// Unlink and destroy the element at `pos`, returning the position which followed it.  O(1).
    ///
    /// # Safety
    ///
    /// `pos` must be a live element of this list, not [List::end].
    pub unsafe fn erase(&mut self, pos: Position<T>) -> Position<T> {
        Position::new(unsafe { self.erase_link(pos.link()) })
    }

    pub fn push_back(&mut self, value: T) -> Result<()> {
        unsafe { self.insert_link(self.sentinel, value) }.map(|_| ())
    }

    pub fn push_front(&mut self, value: T) -> Result<()> {
        unsafe { self.insert_link(next_of(self.sentinel), value) }.map(|_| ())
    }

    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { self.take_link(prev_of(self.sentinel)) })
    }

    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { self.take_link(next_of(self.sentinel)) })
    }

    /// Move the element at `source` so that it sits just before `before`.  O(1).
    ///
    /// This is a pure relink: nothing is constructed, dropped, or moved in memory, and every position stays valid.
    /// `before` equal to `source`, or to the element already after it, leaves the list as it was.
    ///
    /// # Safety
    ///
    /// `source` must be a live element of this list and `before` a position of this list.
    pub unsafe fn rearrange(&mut self, source: Position<T>, before: Position<T>) {
        let (source, before) = (source.link(), before.link());
        debug_assert_ne!(source, self.sentinel, "The end position cannot be rearranged");

        if source == before {
            return;
        }

        unsafe {
            unlink(source);
            link_before(before, source);
        }
    }

    /// # Safety
    ///
    /// `pos` must be a live element of this list.
    pub unsafe fn get(&self, pos: Position<T>) -> &T {
        debug_assert_ne!(pos.link(), self.sentinel, "The end position holds no item");
        unsafe { item_ref(pos.link()) }
    }

    /// # Safety
    ///
    /// `pos` must be a live element of this list.
    pub unsafe fn get_mut(&mut self, pos: Position<T>) -> &mut T {
        debug_assert_ne!(pos.link(), self.sentinel, "The end position holds no item");
        unsafe { item_mut(pos.link()) }
    }

    /// The position after `pos`.  Stepping past the last element gives [List::end], and past the end gives
    /// [List::begin].
    ///
    /// # Safety
    ///
    /// `pos` must be a position of this list.
    pub unsafe fn next(&self, pos: Position<T>) -> Position<T> {
        Position::new(unsafe { next_of(pos.link()) })
    }

    /// The position before `pos`, wrapping like [List::next].
    ///
    /// # Safety
    ///
    /// `pos` must be a position of this list.
    pub unsafe fn prev(&self, pos: Position<T>) -> Position<T> {
        Position::new(unsafe { prev_of(pos.link()) })
    }

    /// Destroy every element through the pool.
    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }

        // Detach first: a panicking drop must not leave links to freed nodes behind.
        let mut cur = unsafe { next_of(self.sentinel) };
        unsafe {
            (*self.sentinel.as_ptr()).next = self.sentinel;
            (*self.sentinel.as_ptr()).prev = self.sentinel;
        }
        let count = std::mem::replace(&mut self.len, 0);

        for _ in 0..count {
            unsafe {
                let following = next_of(cur);
                self.pool.destroy(cur.cast());
                cur = following;
            }
        }
    }

    /// Move every element into a new list, leaving this one empty and still bound to the same pool.  O(1).
    ///
    /// Positions of elements stay valid and now belong to the returned list, including its [List::end].
    pub fn take(&mut self) -> Self {
        let taken = List {
            pool: self.pool,
            sentinel: self.sentinel,
            len: self.len,
            _owns: PhantomData,
        };
        self.sentinel = new_sentinel();
        self.len = 0;
        taken
    }

    pub fn iter(&self) -> Iter<'_, T> {
        unsafe {
            Iter {
                head: next_of(self.sentinel),
                tail: prev_of(self.sentinel),
                remaining: self.len,
                _phantom: PhantomData,
            }
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        unsafe {
            IterMut {
                head: next_of(self.sentinel),
                tail: prev_of(self.sentinel),
                remaining: self.len,
                _phantom: PhantomData,
            }
        }
    }

    pub(crate) fn sentinel(&self) -> NonNull<Links> {
        self.sentinel
    }

    pub(crate) unsafe fn insert_link(&mut self, before: NonNull<Links>, value: T) -> Result<NonNull<Links>> {
        let link = self.pool.create(value)?.cast::<Links>();
        unsafe { link_before(before, link) };
        self.len += 1;
        Ok(link)
    }

    /// Returns the link which followed the erased one.
    pub(crate) unsafe fn erase_link(&mut self, link: NonNull<Links>) -> NonNull<Links> {
        debug_assert_ne!(link, self.sentinel, "The end position cannot be erased");
        unsafe {
            let following = next_of(link);
            unlink(link);
            self.len -= 1;
            self.pool.destroy(link.cast());
            following
        }
    }

    pub(crate) unsafe fn take_link(&mut self, link: NonNull<Links>) -> T {
        debug_assert_ne!(link, self.sentinel, "The end position cannot be erased");
        unsafe {
            unlink(link);
            self.len -= 1;
            self.pool.take(link.cast())
        }
    }

    /// Walk the chain both ways and check it against `len`.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        unsafe {
            let mut cur = self.sentinel;
            for _ in 0..=self.len {
                let next = next_of(cur);
                assert_eq!(prev_of(next), cur, "next/prev disagree");
                cur = next;
            }
            assert_eq!(cur, self.sentinel, "Chain is longer or shorter than len");
        }
    }
}

impl<'p, T, A: NodeAllocator<Item = ListNode<T>>> Drop for List<'p, T, A> {
    fn drop(&mut self) {
        self.clear();
        unsafe { drop(Box::from_raw(self.sentinel.as_ptr())) };
    }
}

impl<'p, 'q, T: PartialEq, A, B> PartialEq<List<'q, T, B>> for List<'p, T, A>
where
    A: NodeAllocator<Item = ListNode<T>>,
    B: NodeAllocator<Item = ListNode<T>>,
{
    fn eq(&self, other: &List<'q, T, B>) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<'p, T: Eq, A: NodeAllocator<Item = ListNode<T>>> Eq for List<'p, T, A> {}

impl<'p, T: std::fmt::Debug, A: NodeAllocator<Item = ListNode<T>>> std::fmt::Debug for List<'p, T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, 'p, T, A: NodeAllocator<Item = ListNode<T>>> IntoIterator for &'a List<'p, T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, 'p, T, A: NodeAllocator<Item = ListNode<T>>> IntoIterator for &'a mut List<'p, T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

/// Borrowing iterator over a [List], front to back.
pub struct Iter<'a, T> {
    head: NonNull<Links>,
    tail: NonNull<Links>,
    remaining: usize,
    _phantom: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let link = self.head;
        unsafe {
            self.head = next_of(link);
            Some(item_ref(link))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let link = self.tail;
        unsafe {
            self.tail = prev_of(link);
            Some(item_ref(link))
        }
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
impl<'a, T> FusedIterator for Iter<'a, T> {}

impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self {
        Iter {
            head: self.head,
            tail: self.tail,
            remaining: self.remaining,
            _phantom: PhantomData,
        }
    }
}

/// Mutably borrowing iterator over a [List], front to back.
pub struct IterMut<'a, T> {
    head: NonNull<Links>,
    tail: NonNull<Links>,
    remaining: usize,
    _phantom: PhantomData<&'a mut T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let link = self.head;
        unsafe {
            self.head = next_of(link);
            Some(item_mut(link))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    fn next_back(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let link = self.tail;
        unsafe {
            self.tail = prev_of(link);
            Some(item_mut(link))
        }
    }
}

impl<'a, T> ExactSizeIterator for IterMut<'a, T> {}
impl<'a, T> FusedIterator for IterMut<'a, T> {}
