use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::Result;
use crate::page::{self, PageHeader, Slot};

/// Configuration for a [Pyramid].
///
/// The defaults give pages of 16, 256, 4096, ... slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidConfig {
    /// How many slots go on the first page?
    ///
    /// Default is 16.  Zero is treated as 1.
    pub first_page_slots: usize,

    /// Each page holds this many times the slots of the previous one.
    ///
    /// Default is 16.  Zero is treated as 1, which gives pages of a constant size.
    pub growth_factor: usize,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        PyramidConfig {
            first_page_slots: 16,
            growth_factor: 16,
        }
    }
}

/// A growing arena of fixed-size slots for one type, with free-list recycling.
///
/// Allocation pops the free list if possible, otherwise bumps a cursor through the current page, otherwise maps a new
/// page larger than the last by [PyramidConfig::growth_factor].  Pages are never moved, resized, or given back until
/// the arena is dropped, so a pointer stays good until it is deallocated or the arena goes away.
///
/// The arena only hands out storage.  It never initializes, reads, or drops items; that is the job of whoever
/// allocated them.
///
/// Cloning gives a new, empty arena with the same configuration rather than a copy of the contents, which is what
/// node-based containers expect when they clone their allocator.
pub struct Pyramid<T> {
    /// Newest page, or `None` before the first allocation.
    page: Option<NonNull<PageHeader>>,

    /// First slot of the newest page; dangling when there are no pages.
    slots: NonNull<Slot<T>>,

    /// Slots on the newest page.
    page_capacity: usize,

    /// Index of the next never-used slot on the newest page.
    cursor: usize,

    next_page_slots: usize,
    free: Option<NonNull<Slot<T>>>,

    page_count: usize,
    capacity: usize,
    live: usize,

    config: PyramidConfig,
    _phantom: PhantomData<T>,
}

impl<T> Pyramid<T> {
    pub fn new() -> Self {
        Self::with_config(Default::default())
    }

    pub fn with_config(config: PyramidConfig) -> Self {
        let config = PyramidConfig {
            first_page_slots: config.first_page_slots.max(1),
            growth_factor: config.growth_factor.max(1),
        };

        Pyramid {
            page: None,
            slots: NonNull::dangling(),
            page_capacity: 0,
            cursor: 0,
            next_page_slots: config.first_page_slots,
            free: None,
            page_count: 0,
            capacity: 0,
            live: 0,
            config,
            _phantom: PhantomData,
        }
    }

    pub fn config(&self) -> &PyramidConfig {
        &self.config
    }

    /// How many pages have been mapped so far?
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Total slots across all pages, whether used or not.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently handed out.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Size of the page which will be mapped on the next exhaustion.
    pub fn next_page_slots(&self) -> usize {
        self.next_page_slots
    }

    /// Get uninitialized storage for one `T`.
    ///
    /// The returned pointer is suitably aligned and valid for reads and writes of a `T` until it is passed to
    /// [Pyramid::deallocate] or the arena is dropped.  Fails only if the system allocator cannot provide a new page.
    #[inline]
    pub fn allocate(&mut self) -> Result<NonNull<T>> {
        let slot = match self.free {
            Some(slot) => {
                self.free = unsafe { Slot::next_free(slot) };
                slot
            }
            None => self.bump()?,
        };

        self.live += 1;
        Ok(Slot::item_ptr(slot))
    }

    /// Return a slot to the arena.
    ///
    /// The item in the slot is not dropped.  The slot goes to the front of the free list and is the next one handed
    /// out.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from [Pyramid::allocate] on this same arena and must not have been deallocated since.
    #[inline]
    pub unsafe fn deallocate(&mut self, ptr: NonNull<T>) {
        debug_assert!(self.live > 0, "Deallocation from an arena with no live slots");

        let slot = Slot::from_item_ptr(ptr);
        unsafe { Slot::set_next_free(slot, self.free) };
        self.free = Some(slot);
        self.live -= 1;
    }

    /// Move the whole arena out, leaving a fresh empty one with the same configuration behind.
    pub fn take(&mut self) -> Self {
        let fresh = Self::with_config(self.config);
        std::mem::replace(self, fresh)
    }

    #[inline]
    fn bump(&mut self) -> Result<NonNull<Slot<T>>> {
        if self.cursor == self.page_capacity {
            self.grow()?;
        }

        // In bounds: cursor < page_capacity after growing.
        let slot = unsafe { NonNull::new_unchecked(self.slots.as_ptr().add(self.cursor)) };
        self.cursor += 1;
        Ok(slot)
    }

    #[cold]
    fn grow(&mut self) -> Result<()> {
        let slots = self.next_page_slots;

        let new_page = page::allocate_page::<T>(slots, self.page).map_err(|e| {
            log::warn!("Pyramid could not grow past {} pages: {}", self.page_count, e);
            e
        })?;

        self.page = Some(new_page.header);
        self.slots = new_page.first_slot;
        self.page_capacity = slots;
        self.cursor = 0;
        self.next_page_slots = slots.saturating_mul(self.config.growth_factor);
        self.page_count += 1;
        self.capacity += slots;

        log::debug!(
            "Pyramid mapped page {} with {} slots ({} bytes); next page will hold {}",
            self.page_count,
            slots,
            new_page.bytes,
            self.next_page_slots
        );

        Ok(())
    }
}

impl<T> Default for Pyramid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Pyramid<T> {
    /// A new empty arena with the same configuration; the contents are not copied.
    fn clone(&self) -> Self {
        Self::with_config(self.config)
    }
}

impl<T> Drop for Pyramid<T> {
    fn drop(&mut self) {
        let freed = unsafe { page::release_pages::<T>(self.page.take()) };
        if freed != 0 {
            log::trace!(
                "Pyramid released {} pages ({} slots, {} still live)",
                freed,
                self.capacity,
                self.live
            );
        }
    }
}

impl<T> std::fmt::Debug for Pyramid<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pyramid")
            .field("page_count", &self.page_count)
            .field("capacity", &self.capacity)
            .field("live", &self.live)
            .field("next_page_slots", &self.next_page_slots)
            .field("config", &self.config)
            .finish()
    }
}

// The arena exclusively owns its pages.
unsafe impl<T: Send> Send for Pyramid<T> {}
