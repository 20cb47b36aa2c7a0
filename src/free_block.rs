use core::{ops, ptr::NonNull};

use crate::{consts, Offset};

/// Written at the start of every block that sits in a free list
#[repr(C)]
#[repr(align(4))]
pub struct FreeBlockHeader {
    next_free: Option<Offset>,
}

impl FreeBlockHeader {
    /* Setters */
    pub fn set_next_free(&mut self, next_free: Option<Offset>) {
        self.next_free = next_free;
    }

    /* Getters */
    pub fn next_free(&self) -> Option<Offset> {
        self.next_free
    }
}

#[repr(transparent)]
pub struct FreeBlock<'a> {
    header: &'a mut FreeBlockHeader,
}

impl<'a> FreeBlock<'a> {
    /* Constructors */
    /// NOTE(safety) `block` must point to the start of a block that is not handed out
    pub unsafe fn from_block(block: NonNull<u8>) -> Self {
        debug_assert_eq!(block.as_ptr() as usize % usize::from(consts::ALIGN_SIZE), 0);

        FreeBlock {
            header: &mut *block.cast::<FreeBlockHeader>().as_ptr(),
        }
    }

    /// Turns `block` into an unlinked free block, overwriting its first word
    pub unsafe fn from_parts(block: NonNull<u8>, next_free: Option<Offset>) -> Self {
        let header = block.cast::<FreeBlockHeader>();
        debug_assert_eq!(header.as_ptr() as usize % usize::from(consts::ALIGN_SIZE), 0);

        header.as_ptr().write(FreeBlockHeader { next_free });

        FreeBlock::from_block(block)
    }
}

impl ops::Deref for FreeBlock<'_> {
    type Target = FreeBlockHeader;

    fn deref(&self) -> &FreeBlockHeader {
        self.header
    }
}

impl ops::DerefMut for FreeBlock<'_> {
    fn deref_mut(&mut self) -> &mut FreeBlockHeader {
        self.header
    }
}
