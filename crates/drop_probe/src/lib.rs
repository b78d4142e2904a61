//! Check that values stored in pooled containers are dropped, and dropped once.
//!
//! Containers which construct and destroy items by hand can get this wrong in three ways: forgetting to drop,
//! dropping twice, or dropping the wrong item.  Make a [DropProbe], wrap test values with [DropProbe::probe], and store
//! the returned [Probed] values in the container.  The matching [ProbeHandle] says whether that particular value is
//! still alive, and the probe counts drops overall.
//!
//! Everything here is single-threaded, as are the containers under test.
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Counters {
    drops: Cell<u64>,
}

/// Hands out [Probed] values and counts how many of them have dropped.
#[derive(Debug, Clone, Default)]
pub struct DropProbe {
    counters: Rc<Counters>,
}

/// A value whose drop is observed by a [DropProbe].
///
/// Derefs to the wrapped value, and compares by it.
#[derive(Debug)]
pub struct Probed<T> {
    data: T,
    /// If the same memory is dropped twice, the `Rc` below may already be gone.  This flag is more likely to still be
    /// sitting in the slot.
    previously_dropped: bool,
    dropped: Rc<Cell<bool>>,
    counters: Rc<Counters>,
}

/// Says whether one particular [Probed] value has dropped.
#[derive(Debug, Clone)]
pub struct ProbeHandle {
    dropped: Rc<Cell<bool>>,
}

impl DropProbe {
    pub fn new() -> Self {
        Default::default()
    }

    /// Wrap a value, returning a handle to watch it with.
    pub fn probe<T>(&self, data: T) -> (ProbeHandle, Probed<T>) {
        let dropped = Rc::new(Cell::new(false));
        let probed = Probed {
            data,
            previously_dropped: false,
            dropped: dropped.clone(),
            counters: self.counters.clone(),
        };
        (ProbeHandle { dropped }, probed)
    }

    /// Drops observed so far.
    pub fn drops(&self) -> u64 {
        self.counters.drops.get()
    }

    #[track_caller]
    pub fn assert_exact(&self, drops: u64) {
        let cur = self.drops();
        assert_eq!(cur, drops, "Expected exactly {} drops but found {}", drops, cur);
    }

    #[track_caller]
    pub fn assert_at_most(&self, drops: u64) {
        let cur = self.drops();
        assert!(
            cur <= drops,
            "Expected at most {} drops but found {}",
            drops,
            cur
        );
    }
}

impl<T> Probed<T> {
    pub fn get(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Probed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::DerefMut for Probed<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T: PartialEq> PartialEq for Probed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<T: Eq> Eq for Probed<T> {}

impl<T: PartialOrd> PartialOrd for Probed<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.data.partial_cmp(&other.data)
    }
}

impl<T: Ord> Ord for Probed<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.data.cmp(&other.data)
    }
}

impl<T> Drop for Probed<T> {
    fn drop(&mut self) {
        assert!(
            !self.previously_dropped && !self.dropped.get(),
            "The same value was dropped twice"
        );
        self.previously_dropped = true;
        self.dropped.set(true);
        self.counters.drops.set(self.counters.drops.get() + 1);
    }
}

impl ProbeHandle {
    pub fn is_alive(&self) -> bool {
        !self.dropped.get()
    }

    pub fn is_dropped(&self) -> bool {
        !self.is_alive()
    }

    #[track_caller]
    pub fn assert_alive(&self) {
        assert!(self.is_alive(), "The probed value has been dropped");
    }

    #[track_caller]
    pub fn assert_dropped(&self) {
        assert!(self.is_dropped(), "The probed value has not been dropped yet");
    }
}
