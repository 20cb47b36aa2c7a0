use core::{cmp, fmt, marker::PhantomData, ptr::NonNull};

use crate::{free_block::FreeBlock, Anchor, ClassStats, Offset};

/// A contiguous run of equally sized blocks plus the free list threaded through them
pub struct Class {
    block_size: usize,
    block_count: usize,
    // byte offsets from the start of the region
    start: usize,
    end: usize,
    free: Option<Offset>,
    used: usize,
    highwater: usize,
}

impl Class {
    /* Constructors */
    /// Carves `block_count` blocks out of the region starting `start` bytes into it
    ///
    /// All the blocks end up in the free list, lowest address first
    ///
    /// NOTE(safety) the span must lie within the region and must not overlap any other class
    pub unsafe fn layout(
        anchor: Anchor,
        start: usize,
        block_size: usize,
        block_count: usize,
    ) -> Self {
        let mut next = None;
        for i in (0..block_count).rev() {
            let block = anchor.block(start + i * block_size);
            FreeBlock::from_parts(block, next);
            next = Some(anchor.offset(block));
        }

        Class {
            block_size,
            block_count,
            start,
            end: start + block_count * block_size,
            free: next,
            used: 0,
            highwater: 0,
        }
    }

    /* Getters */
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn has_free(&self) -> bool {
        self.free.is_some()
    }

    pub fn stats(&self) -> ClassStats {
        ClassStats {
            block_size: self.block_size,
            block_count: self.block_count,
            used: self.used,
            free: self.block_count - self.used,
            highwater: self.highwater,
        }
    }

    /* Miscellaneous */
    /// Whether a request of `size` bytes can be served by this class
    pub fn fits(&self, size: usize) -> bool {
        size <= self.block_size
    }

    /// Whether the byte at `offset` is the first byte of one of this class' blocks
    pub fn is_block_start(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end && (offset - self.start) % self.block_size == 0
    }

    /// Pops the head of the free list
    pub unsafe fn pop(&mut self, anchor: Anchor) -> Option<NonNull<u8>> {
        let head = anchor.ptr(self.free?);
        self.free = FreeBlock::from_block(head).next_free();

        self.used += 1;
        self.highwater = cmp::max(self.highwater, self.used);

        Some(head)
    }

    /// Pushes `block` onto the head of the free list
    ///
    /// NOTE(safety) `block` must be a block of this class that's currently handed out
    pub unsafe fn push(&mut self, anchor: Anchor, block: NonNull<u8>) {
        debug_assert!(self.is_block_start(anchor.byte_offset(block)));
        debug_assert!(self.used > 0);

        FreeBlock::from_block(block).set_next_free(self.free);
        self.free = Some(anchor.offset(block));
        self.used -= 1;
    }

    pub fn free_list(&self, anchor: Anchor) -> FreeList<'_> {
        FreeList {
            anchor,
            head: self.free,
            _marker: PhantomData,
        }
    }
}

/// Iterator over the blocks in a class' free list, most recently freed first
pub struct FreeList<'a> {
    anchor: Anchor,
    head: Option<Offset>,
    // freeze the `Class`
    _marker: PhantomData<&'a Class>,
}

impl Iterator for FreeList<'_> {
    type Item = NonNull<u8>;

    fn next(&mut self) -> Option<NonNull<u8>> {
        let head = self.head?;
        unsafe {
            let block = self.anchor.ptr(head);
            self.head = FreeBlock::from_block(block).next_free();
            Some(block)
        }
    }
}

/// `Debug` view of a class that can walk its free list
pub struct ClassView<'a> {
    pub anchor: Anchor,
    pub class: &'a Class,
}

impl fmt::Debug for ClassView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("block_size", &self.class.block_size)
            .field("block_count", &self.class.block_count)
            .field("used", &self.class.used)
            .field("free_list", &List(self))
            .finish()
    }
}

struct List<'a, 'b>(&'a ClassView<'b>);

impl fmt::Debug for List<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.class.free_list(self.0.anchor))
            .finish()
    }
}
