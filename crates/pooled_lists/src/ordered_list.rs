use pyramid::{NodeAllocator, Pyramid, Result};

use crate::list::{Iter, List, ListNode, Position};
use crate::node_pool::NodePool;

/// A [List] kept in ascending order.
///
/// Storage is exactly that of [List]; the order is maintained by where things are inserted.  Items may be mutated in
/// place through [OrderedList::get_mut], after which [OrderedList::reorder] must be called on that element before
/// anything else touches the list.  [OrderedList::update] does both in one step.
///
/// Every `_by` method takes a strict "less" comparator, which must be the same one on every call.
pub struct OrderedList<'p, T, A: NodeAllocator<Item = ListNode<T>> = Pyramid<ListNode<T>>> {
    list: List<'p, T, A>,
}

impl<'p, T, A: NodeAllocator<Item = ListNode<T>>> OrderedList<'p, T, A> {
    pub fn new(pool: &'p NodePool<T, A>) -> Self {
        OrderedList {
            list: List::new(pool),
        }
    }

    /// Insert `value` before the first element which does not precede it.  O(n) to find the spot, O(1) to link.
    pub fn insert_by(&mut self, value: T, mut less: impl FnMut(&T, &T) -> bool) -> Result<Position<T>> {
        let list = &mut self.list;
        let mut at = list.begin();
        unsafe {
            while at != list.end() && less(list.get(at), &value) {
                at = list.next(at);
            }
            list.insert(at, value)
        }
    }

    /// Move the element at `pos` to wherever it now belongs.
    ///
    /// Only the neighbourhood is walked: first leftward while the element ranks before its left neighbour, otherwise
    /// rightward while it ranks after its right one.  Elements which compare equal are never stepped over.  The node
    /// is relinked, not reconstructed, so `pos` stays valid.
    ///
    /// # Safety
    ///
    /// `pos` must be a live element of this list.
    pub unsafe fn reorder_by(&mut self, pos: Position<T>, mut less: impl FnMut(&T, &T) -> bool) {
        unsafe {
            if !self.reorder_left(pos, &mut less) {
                self.reorder_right(pos, &mut less);
            }
        }
    }

    unsafe fn reorder_left(&mut self, pos: Position<T>, less: &mut impl FnMut(&T, &T) -> bool) -> bool {
        let list = &mut self.list;
        unsafe {
            if pos == list.begin() {
                return false;
            }

            let item = list.get(pos);
            let left = list.prev(pos);
            if !less(item, list.get(left)) {
                return false;
            }

            let mut stop = list.prev(left);
            while stop != list.end() && less(item, list.get(stop)) {
                stop = list.prev(stop);
            }
            let before = list.next(stop);
            list.rearrange(pos, before);
        }
        true
    }

    unsafe fn reorder_right(&mut self, pos: Position<T>, less: &mut impl FnMut(&T, &T) -> bool) {
        let list = &mut self.list;
        unsafe {
            let right = list.next(pos);
            if right == list.end() {
                return;
            }

            let item = list.get(pos);
            if !less(list.get(right), item) {
                return;
            }

            let mut stop = list.next(right);
            while stop != list.end() && less(list.get(stop), item) {
                stop = list.next(stop);
            }
            list.rearrange(pos, stop);
        }
    }

    /// Run `f` on the item at `pos`, then put it back in order.
    ///
    /// # Safety
    ///
    /// `pos` must be a live element of this list.
    pub unsafe fn update_by(&mut self, pos: Position<T>, f: impl FnOnce(&mut T), less: impl FnMut(&T, &T) -> bool) {
        unsafe {
            f(self.list.get_mut(pos));
            self.reorder_by(pos, less);
        }
    }

    pub fn is_sorted_by(&self, mut less: impl FnMut(&T, &T) -> bool) -> bool {
        self.list
            .iter()
            .zip(self.list.iter().skip(1))
            .all(|(a, b)| !less(b, a))
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn begin(&self) -> Position<T> {
        self.list.begin()
    }

    pub fn end(&self) -> Position<T> {
        self.list.end()
    }

    pub fn front(&self) -> Option<&T> {
        self.list.front()
    }

    pub fn back(&self) -> Option<&T> {
        self.list.back()
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.list.pop_front()
    }

    pub fn pop_back(&mut self) -> Option<T> {
        self.list.pop_back()
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    /// See [List::take].
    pub fn take(&mut self) -> Self {
        OrderedList {
            list: self.list.take(),
        }
    }

    /// # Safety
    ///
    /// `pos` must be a live element of this list.
    pub unsafe fn erase(&mut self, pos: Position<T>) -> Position<T> {
        unsafe { self.list.erase(pos) }
    }

    /// # Safety
    ///
    /// `pos` must be a live element of this list.
    pub unsafe fn get(&self, pos: Position<T>) -> &T {
        unsafe { self.list.get(pos) }
    }

    /// Mutable access to an item.  If the change affects ordering, reorder the element before doing anything else
    /// with the list.
    ///
    /// # Safety
    ///
    /// `pos` must be a live element of this list.
    pub unsafe fn get_mut(&mut self, pos: Position<T>) -> &mut T {
        unsafe { self.list.get_mut(pos) }
    }

    /// # Safety
    ///
    /// As [List::next].
    pub unsafe fn next(&self, pos: Position<T>) -> Position<T> {
        unsafe { self.list.next(pos) }
    }

    /// # Safety
    ///
    /// As [List::prev].
    pub unsafe fn prev(&self, pos: Position<T>) -> Position<T> {
        unsafe { self.list.prev(pos) }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.list.iter()
    }

    pub fn as_list(&self) -> &List<'p, T, A> {
        &self.list
    }
}

impl<'p, T: Ord, A: NodeAllocator<Item = ListNode<T>>> OrderedList<'p, T, A> {
    /// Build a list by inserting each value in turn.
    pub fn from_iter_in(pool: &'p NodePool<T, A>, values: impl IntoIterator<Item = T>) -> Result<Self> {
        let mut list = Self::new(pool);
        for v in values {
            list.insert(v)?;
        }
        Ok(list)
    }

    pub fn insert(&mut self, value: T) -> Result<Position<T>> {
        self.insert_by(value, T::lt)
    }

    /// # Safety
    ///
    /// `pos` must be a live element of this list.
    pub unsafe fn reorder(&mut self, pos: Position<T>) {
        unsafe { self.reorder_by(pos, T::lt) }
    }

    /// # Safety
    ///
    /// `pos` must be a live element of this list.
    pub unsafe fn update(&mut self, pos: Position<T>, f: impl FnOnce(&mut T)) {
        unsafe { self.update_by(pos, f, T::lt) }
    }

    pub fn is_sorted(&self) -> bool {
        self.is_sorted_by(T::lt)
    }
}

impl<'p, 'q, T: PartialEq, A, B> PartialEq<OrderedList<'q, T, B>> for OrderedList<'p, T, A>
where
    A: NodeAllocator<Item = ListNode<T>>,
    B: NodeAllocator<Item = ListNode<T>>,
{
    fn eq(&self, other: &OrderedList<'q, T, B>) -> bool {
        self.list == other.list
    }
}

impl<'p, T: Eq, A: NodeAllocator<Item = ListNode<T>>> Eq for OrderedList<'p, T, A> {}

impl<'p, T: std::fmt::Debug, A: NodeAllocator<Item = ListNode<T>>> std::fmt::Debug for OrderedList<'p, T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.list, f)
    }
}

impl<'a, 'p, T, A: NodeAllocator<Item = ListNode<T>>> IntoIterator for &'a OrderedList<'p, T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn contents<T: Clone>(list: &OrderedList<'_, T>) -> Vec<T> {
        list.as_list().assert_consistent();
        list.iter().cloned().collect()
    }

    #[test]
    fn test_insert() {
        let pool = NodePool::<i32>::new();
        let mut target = OrderedList::new(&pool);

        target.insert(1).unwrap();
        assert_eq!(contents(&target), vec![1]);
        target.insert(4).unwrap();
        assert_eq!(contents(&target), vec![1, 4]);
        target.insert(2).unwrap();
        assert_eq!(contents(&target), vec![1, 2, 4]);
        target.insert(3).unwrap();
        assert_eq!(contents(&target), vec![1, 2, 3, 4]);

        target.clear();
        assert!(target.is_empty());
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn test_reorder() {
        let pool = NodePool::<i32>::new();
        let mut target = OrderedList::new(&pool);

        unsafe {
            let pos = target.insert(3).unwrap();
            target.reorder(pos);
            assert_eq!(contents(&target), vec![3]);

            let pos = target.insert(5).unwrap();
            target.reorder(pos);
            assert_eq!(contents(&target), vec![3, 5]);

            let pos = target.insert(4).unwrap();
            target.reorder(pos);
            assert_eq!(contents(&target), vec![3, 4, 5]);

            *target.get_mut(pos) = 1;
            target.reorder(pos);
            assert_eq!(contents(&target), vec![1, 3, 5]);
            assert_eq!(target.begin(), pos);

            let pos = target.insert(2).unwrap();
            *target.get_mut(pos) = 4;
            target.reorder(pos);
            assert_eq!(contents(&target), vec![1, 3, 4, 5]);
        }
    }

    #[test]
    fn test_update_moves_both_ways() {
        let pool = NodePool::<i32>::new();
        let mut target = OrderedList::from_iter_in(&pool, [5, 3, 4]).unwrap();
        assert_eq!(contents(&target), vec![3, 4, 5]);

        let first = target.begin();
        unsafe {
            target.update(first, |v| *v = 1);
            assert_eq!(contents(&target), vec![1, 4, 5]);

            target.update(first, |v| *v = 10);
            assert_eq!(contents(&target), vec![4, 5, 10]);
            assert_eq!(target.prev(target.end()), first);

            target.update(first, |v| *v = 4);
            assert_eq!(contents(&target), vec![4, 4, 5]);
        }
        assert!(target.is_sorted());
        assert_eq!(pool.live(), 3);
    }

    #[test]
    fn test_equal_keys_are_not_stepped_over() {
        let pool = NodePool::<(u8, char)>::new();
        let by_key = |a: &(u8, char), b: &(u8, char)| a.0 < b.0;
        let mut target = OrderedList::new(&pool);
        target.insert_by((2, 'a'), by_key).unwrap();
        let pos = target.insert_by((9, 'b'), by_key).unwrap();
        target.insert_by((2, 'c'), by_key).unwrap();
        assert_eq!(contents(&target), vec![(2, 'c'), (2, 'a'), (9, 'b')]);

        unsafe { target.update_by(pos, |v| v.0 = 2, by_key) };
        assert_eq!(contents(&target), vec![(2, 'c'), (2, 'a'), (2, 'b')]);
    }

    #[test]
    fn test_descending_comparator() {
        let pool = NodePool::<u32>::new();
        let mut target = OrderedList::new(&pool);
        let greater = |a: &u32, b: &u32| a > b;
        for v in [2, 7, 1, 9] {
            target.insert_by(v, greater).unwrap();
        }
        assert_eq!(contents(&target), vec![9, 7, 2, 1]);
        assert!(target.is_sorted_by(greater));
        assert!(!target.is_sorted());
    }

    #[test]
    fn test_erase_and_pop() {
        let pool = NodePool::<i32>::new();
        let mut target = OrderedList::from_iter_in(&pool, [3, 1, 2]).unwrap();
        unsafe {
            let second = target.next(target.begin());
            assert_eq!(*target.get(second), 2);
            target.erase(second);
        }
        assert_eq!(target.front(), Some(&1));
        assert_eq!(target.back(), Some(&3));
        assert_eq!(target.pop_front(), Some(1));
        assert_eq!(target.pop_back(), Some(3));
        assert_eq!(target.len(), 0);
    }

    proptest! {
        #[test]
        fn permutation_ends_sorted(values in Just((0..64).collect::<Vec<i32>>()).prop_shuffle()) {
            let pool = NodePool::<i32>::new();
            let mut target = OrderedList::new(&pool);
            for v in values {
                target.insert(v).unwrap();
                prop_assert!(target.is_sorted());
            }
            prop_assert_eq!(contents(&target), (0..64).collect::<Vec<_>>());
        }

        #[test]
        fn updates_keep_order(
            initial in proptest::collection::vec(-50i32..50, 1..40),
            updates in proptest::collection::vec((any::<prop::sample::Index>(), -50i32..50), 0..100),
        ) {
            let pool = NodePool::<i32>::new();
            let mut target = OrderedList::new(&pool);
            let mut positions = vec![];
            for v in initial.iter().copied() {
                positions.push(target.insert(v).unwrap());
            }

            let mut model = initial;
            for (index, value) in updates {
                let i = index.index(positions.len());
                unsafe { target.update(positions[i], |v| *v = value) };
                model[i] = value;
                prop_assert!(target.is_sorted());
            }

            model.sort();
            prop_assert_eq!(contents(&target), model);
        }
    }
}
