use std::ptr::NonNull;

use pyramid::{NodeAllocator, Pyramid, Result};

use crate::list::{item_mut, item_ref, next_of, prev_of, Links, List, ListNode, Position};

/// A safe way to walk and edit a [List] without holding on to [Position]s.
///
/// The cursor always sits on an element or on the end.  Moving wraps around through the end just like
/// [List::next] does, and removing the current element moves the cursor to the one after it.
pub struct CursorMut<'a, 'p, T, A: NodeAllocator<Item = ListNode<T>> = Pyramid<ListNode<T>>> {
    list: &'a mut List<'p, T, A>,
    current: NonNull<Links>,
}

impl<'p, T, A: NodeAllocator<Item = ListNode<T>>> List<'p, T, A> {
    /// A cursor on the first element, or on the end if the list is empty.
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, 'p, T, A> {
        let current = self.begin().link();
        CursorMut { list: self, current }
    }

    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, 'p, T, A> {
        let current = self.sentinel();
        CursorMut { list: self, current }
    }

    /// # Safety
    ///
    /// `pos` must be a position of this list.
    pub unsafe fn cursor_at_mut(&mut self, pos: Position<T>) -> CursorMut<'_, 'p, T, A> {
        CursorMut {
            list: self,
            current: pos.link(),
        }
    }
}

impl<'a, 'p, T, A: NodeAllocator<Item = ListNode<T>>> CursorMut<'a, 'p, T, A> {
    pub fn position(&self) -> Position<T> {
        Position::new(self.current)
    }

    pub fn is_at_end(&self) -> bool {
        self.current == self.list.sentinel()
    }

    pub fn current(&mut self) -> Option<&mut T> {
        if self.is_at_end() {
            return None;
        }
        Some(unsafe { item_mut(self.current) })
    }

    pub fn peek(&self) -> Option<&T> {
        if self.is_at_end() {
            return None;
        }
        Some(unsafe { item_ref(self.current) })
    }

    pub fn move_next(&mut self) {
        self.current = unsafe { next_of(self.current) };
    }

    pub fn move_prev(&mut self) {
        self.current = unsafe { prev_of(self.current) };
    }

    /// Insert `value` before the current element; the cursor does not move.
    pub fn insert_before(&mut self, value: T) -> Result<Position<T>> {
        let link = unsafe { self.list.insert_link(self.current, value) }?;
        Ok(Position::new(link))
    }

    /// Unlink the current element and hand its item back, moving to the element after it.  Does nothing at the end.
    pub fn remove_current(&mut self) -> Option<T> {
        if self.is_at_end() {
            return None;
        }
        let link = self.current;
        unsafe {
            self.current = next_of(link);
            Some(self.list.take_link(link))
        }
    }

    /// Like [CursorMut::remove_current], but drops the item.  Returns whether anything was erased.
    pub fn erase_current(&mut self) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.current = unsafe { self.list.erase_link(self.current) };
        true
    }

    pub fn as_list(&self) -> &List<'p, T, A> {
        self.list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::NodePool;

    #[test]
    fn test_walk_and_edit() {
        let pool = NodePool::<i32>::new();
        let mut list = List::from_iter_in(&pool, 1..=6).unwrap();

        let mut cursor = list.cursor_front_mut();
        while !cursor.is_at_end() {
            let even = cursor.peek().is_some_and(|v| v % 2 == 0);
            if even {
                assert!(cursor.erase_current());
            } else {
                *cursor.current().unwrap() *= 10;
                cursor.move_next();
            }
        }
        assert!(!cursor.erase_current());
        assert_eq!(cursor.remove_current(), None);

        list.assert_consistent();
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![10, 30, 50]);
        assert_eq!(pool.live(), 3);
    }

    #[test]
    fn test_insert_before_and_wrap() {
        let pool = NodePool::<&str>::new();
        let mut list = List::new(&pool);

        let mut cursor = list.cursor_end_mut();
        cursor.insert_before("b").unwrap();
        cursor.move_next();
        assert_eq!(cursor.peek(), Some(&"b"));
        cursor.insert_before("a").unwrap();
        cursor.move_prev();
        cursor.move_prev();
        assert!(cursor.is_at_end());
        cursor.insert_before("c").unwrap();
        assert_eq!(cursor.as_list().len(), 3);

        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_current_returns_item() {
        let pool = NodePool::<String>::new();
        let mut list = List::from_iter_in(&pool, ["x", "y"].map(String::from)).unwrap();

        let last = unsafe { list.prev(list.end()) };
        let mut cursor = unsafe { list.cursor_at_mut(last) };
        assert_eq!(cursor.position(), last);
        assert_eq!(cursor.remove_current().as_deref(), Some("y"));
        assert!(cursor.is_at_end());

        assert_eq!(list.len(), 1);
        assert_eq!(pool.live(), 1);
    }
}
