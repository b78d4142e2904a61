use std::alloc::Layout;
use std::mem::{ManuallyDrop, MaybeUninit};
use std::ptr::NonNull;

use crate::error::{PyramidError, Result};

/// One cell of a page.
///
/// While free, the slot is a link in the free list.  While allocated, it is storage for exactly one item which the
/// arena never reads or drops.  Both views start at offset 0.
#[repr(C)]
pub(crate) union Slot<T> {
    next_free: Option<NonNull<Slot<T>>>,
    item: ManuallyDrop<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    #[inline(always)]
    pub(crate) fn item_ptr(slot: NonNull<Slot<T>>) -> NonNull<T> {
        slot.cast()
    }

    #[inline(always)]
    pub(crate) fn from_item_ptr(item: NonNull<T>) -> NonNull<Slot<T>> {
        item.cast()
    }

    /// Read the free-list view of a slot.
    ///
    /// # Safety
    ///
    /// The slot must be on the free list, which means the link was the last thing written to it.
    #[inline(always)]
    pub(crate) unsafe fn next_free(slot: NonNull<Slot<T>>) -> Option<NonNull<Slot<T>>> {
        unsafe { std::ptr::addr_of!((*slot.as_ptr()).next_free).read() }
    }

    /// Overwrite the slot with a free-list link.  Whatever item was there is forgotten, not dropped.
    ///
    /// # Safety
    ///
    /// The slot must be inside a live page.
    #[inline(always)]
    pub(crate) unsafe fn set_next_free(slot: NonNull<Slot<T>>, next: Option<NonNull<Slot<T>>>) {
        unsafe { std::ptr::addr_of_mut!((*slot.as_ptr()).next_free).write(next) };
    }
}

/// Lives at the front of every page.
///
/// Pages form a LIFO chain through `previous`, newest first.
#[repr(C)]
pub(crate) struct PageHeader {
    previous: Option<NonNull<PageHeader>>,
    slots: usize,
}

/// A freshly mapped page.
pub(crate) struct NewPage<T> {
    pub(crate) header: NonNull<PageHeader>,
    pub(crate) first_slot: NonNull<Slot<T>>,
    pub(crate) bytes: usize,
}

/// Work out the layout of a page with `slots` slots, and the offset of the first slot.
pub(crate) fn page_layout<T>(slots: usize) -> Result<(Layout, usize)> {
    let too_big = || PyramidError::OutOfMemory {
        slots,
        bytes: slots.saturating_mul(std::mem::size_of::<Slot<T>>()),
    };

    let array = Layout::array::<Slot<T>>(slots).map_err(|_| too_big())?;
    let (layout, offset) = Layout::new::<PageHeader>()
        .extend(array)
        .map_err(|_| too_big())?;
    Ok((layout.pad_to_align(), offset))
}

/// Ask the system allocator for a page of `slots` slots which links back to `previous`.
///
/// The slots are left uninitialized.
pub(crate) fn allocate_page<T>(
    slots: usize,
    previous: Option<NonNull<PageHeader>>,
) -> Result<NewPage<T>> {
    assert!(slots > 0);
    let (layout, offset) = page_layout::<T>(slots)?;

    // The layout is never zero-sized: it always includes the header.
    let raw = unsafe { std::alloc::alloc(layout) };
    let Some(raw) = NonNull::new(raw) else {
        return Err(PyramidError::OutOfMemory {
            slots,
            bytes: layout.size(),
        });
    };

    let header = raw.cast::<PageHeader>();
    unsafe {
        header.as_ptr().write(PageHeader { previous, slots });
    }

    // In bounds: offset comes from the same layout we just allocated.
    let first_slot = unsafe { NonNull::new_unchecked(raw.as_ptr().add(offset)).cast() };

    Ok(NewPage {
        header,
        first_slot,
        bytes: layout.size(),
    })
}

/// Free every page in the chain starting at `newest`, returning how many were freed.
///
/// # Safety
///
/// Every page in the chain must have come from [allocate_page] with the same `T`, and nothing may point into them
/// afterwards.
pub(crate) unsafe fn release_pages<T>(newest: Option<NonNull<PageHeader>>) -> usize {
    let mut freed = 0;
    let mut cur = newest;

    while let Some(page) = cur {
        let PageHeader { previous, slots } = unsafe { page.as_ptr().read() };
        // This layout was computed successfully when the page was made.
        if let Ok((layout, _)) = page_layout::<T>(slots) {
            unsafe { std::alloc::dealloc(page.as_ptr().cast(), layout) };
        }
        freed += 1;
        cur = previous;
    }

    freed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_is_at_least_a_link() {
        assert_eq!(
            std::mem::size_of::<Slot<u8>>(),
            std::mem::size_of::<usize>()
        );
        assert_eq!(std::mem::size_of::<Slot<[u64; 4]>>(), 32);
        assert_eq!(std::mem::size_of::<Slot<()>>(), std::mem::size_of::<usize>());
    }

    #[test]
    fn test_layout_overflow_is_out_of_memory() {
        let got = page_layout::<u64>(usize::MAX / 2);
        assert!(matches!(got, Err(PyramidError::OutOfMemory { .. })));
    }

    #[test]
    fn test_page_chain() {
        let first = allocate_page::<u32>(4, None).unwrap();
        let second = allocate_page::<u32>(16, Some(first.header)).unwrap();

        // The slots of both pages must be writable end to end.
        unsafe {
            for i in 0..4 {
                Slot::item_ptr(NonNull::new_unchecked(first.first_slot.as_ptr().add(i)))
                    .as_ptr()
                    .write(i as u32);
            }
            for i in 0..16 {
                Slot::item_ptr(NonNull::new_unchecked(second.first_slot.as_ptr().add(i)))
                    .as_ptr()
                    .write(i as u32);
            }
        }

        assert!(second.bytes > first.bytes);
        assert_eq!(unsafe { release_pages::<u32>(Some(second.header)) }, 2);
    }

    #[test]
    fn test_first_slot_is_aligned() {
        #[repr(align(64))]
        struct Wide(#[allow(dead_code)] u8);

        let page = allocate_page::<Wide>(3, None).unwrap();
        assert_eq!(page.first_slot.as_ptr() as usize % 64, 0);
        unsafe { release_pages::<Wide>(Some(page.header)) };
    }
}
