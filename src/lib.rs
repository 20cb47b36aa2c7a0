//! A size-class pool allocator with 16-bit pointer compression for memory-constrained systems
//!
//! # Features
//!
//! - Carves a single caller-supplied buffer into a handful of *classes* of fixed-size blocks; the
//!   number of blocks of each class is derived from a tiny growth formula so a single set of
//!   class descriptors scales to any buffer size
//!
//! - `alloc` and `free` are a scan over the classes plus one free list push / pop; there's no
//!   splitting, no coalescing and no per-allocation header (*zero* metadata overhead)
//!
//! - `realloc` migrates an allocation to a smaller class when one has room, or to a larger one
//!   when the current block is too small
//!
//! - Pointers handed out by the pool (and pointers registered in a ROM table) can be compressed
//!   into 16-bit values
//!
//! # Example
//!
//! ```
//! use pool16::{ClassConfig, Pool};
//!
//! #[repr(align(4))]
//! struct Aligned<T>(T);
//!
//! let mut memory = Aligned([0u8; 4096]);
//!
//! // 16-byte blocks grow with `t`; the 64-byte class always gets (at least) 1 KiB
//! let classes = [ClassConfig::new(16, 10, 0), ClassConfig::new(64, 0, 1024)];
//! let mut pool = Pool::new(&mut memory.0, &classes).unwrap();
//!
//! let x = pool.alloc(12).unwrap();
//! let y = unsafe { pool.realloc(Some(x), 40) }.unwrap();
//! assert_eq!(pool.usable_size(y), Some(64));
//!
//! let compressor = pool.compressor(None).unwrap();
//! let v = compressor.encode(Some(y)).unwrap();
//! assert_eq!(compressor.decode(v), Some(y));
//!
//! unsafe { pool.free(Some(y)) };
//! ```
//!
//! # Sizing classes
//!
//! Each class is described by a [`ClassConfig`]: its block size plus two coefficients, `a` and
//! `b`. For a scaling parameter `t` the class asks for `a * t + b` bytes worth of blocks. The pool
//! picks the largest `t` in `0..=T_MAX` whose block counts fit in the buffer and then gives the
//! remaining bytes to the largest classes first. See [`plan()`].
//!
//! Use `b` to reserve a fixed amount of memory for a class and `a` to say how greedy the class
//! should be with the rest of the buffer, relative to the other classes.
//!
//! # Diagnostics
//!
//! The planner and the pool report their decisions through the [`log`] facade: one `trace` line
//! per search step and leftover distribution, one `debug` line per class layout. Pick the level at
//! compile time with `log`'s `max_level_*` features.
//!
//! # Cargo features
//!
//! - `ufmt`: implements `ufmt::uDebug` for the pool and its statistics
//!
//! # Limitations
//!
//! All blocks are 4-byte aligned and the free lists store 32-bit offsets, which limits a pool to
//! 16 GiB. The [`Compressor`] additionally requires that the pool spans less than
//! `4 * ROM_BASE` bytes (~248 KiB) so in-pool values never collide with ROM values.

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
#![deny(rust_2018_compatibility)]
#![deny(rust_2018_idioms)]

use core::{fmt, marker::PhantomData, num::NonZeroU32, ptr::NonNull};

use log::{debug, trace};

pub use crate::{
    compress::{Compressor, RomTable},
    consts::{ALIGN_SIZE, MAX_ROM_ENTRIES, ROM_BASE, T_MAX},
    error::Error,
    plan::{plan, ClassConfig, Plan},
    stats::{ClassStats, PoolStats},
};
use crate::class::{Class, ClassView};

#[macro_use]
mod macros;
mod class;
mod compress;
mod consts;
mod error;
mod free_block;
mod plan;
mod stats;
mod util;

/// Position of a block in `ALIGN_SIZE` units, counted from one unit before the start of the region
type Offset = NonZeroU32;

/// All internal *offsets* are relative to this "anchor"
///
/// The anchor sits `ALIGN_SIZE` bytes before the first block so no block has an offset of zero
#[derive(Clone, Copy)]
struct Anchor {
    base: NonNull<u8>,
}

impl Anchor {
    fn new(base: NonNull<u8>) -> Self {
        debug_assert_eq!(base.as_ptr() as usize % usize::from(consts::ALIGN_SIZE), 0);

        Anchor { base }
    }

    fn base(self) -> NonNull<u8> {
        self.base
    }

    /// Number of bytes between the start of the region and `ptr`
    fn byte_offset(self, ptr: NonNull<u8>) -> usize {
        (ptr.as_ptr() as usize).wrapping_sub(self.base.as_ptr() as usize)
    }

    // NOTE(safety) `byte_offset` must be within the region
    unsafe fn block(self, byte_offset: usize) -> NonNull<u8> {
        NonNull::new_unchecked(self.base.as_ptr().add(byte_offset))
    }

    fn offset(self, block: NonNull<u8>) -> Offset {
        let byte_offset = self.byte_offset(block);
        debug_assert_eq!(byte_offset % usize::from(consts::ALIGN_SIZE), 0);

        let units = (byte_offset >> consts::ALIGN_SIZE_LOG2) + 1;
        // `Pool::new` rejects regions whose offsets don't fit in a `u32`
        Offset::new(units as u32).unwrap_or_else(|| unsafe { assume_unreachable!() })
    }

    // NOTE(safety) `offset` must point into the region
    unsafe fn ptr(self, offset: Offset) -> NonNull<u8> {
        self.block((offset.get() as usize - 1) << consts::ALIGN_SIZE_LOG2)
    }
}

/// A pool of fixed-size blocks carved out of a single memory region
///
/// `N` is the number of size classes
pub struct Pool<'m, const N: usize> {
    anchor: Anchor,
    // bytes covered by the classes
    len: usize,
    classes: [Class; N],
    used_bytes: usize,
    highwater_bytes: usize,
    _memory: PhantomData<&'m mut [u8]>,
}

// The pool owns its region; different pools may live on different threads
unsafe impl<const N: usize> Send for Pool<'_, N> {}

impl<'m, const N: usize> Pool<'m, N> {
    /* Constructors */
    /// Lays out the size classes described by `configs` in `memory`
    ///
    /// `configs` must be sorted by ascending block size. Block sizes are rounded up to a multiple
    /// of `ALIGN_SIZE` bytes.
    ///
    /// Note that `memory` may not be fully utilized due to alignment requirements: the start of
    /// `memory` is rounded up to `ALIGN_SIZE` bytes and the bytes left after the last block can't
    /// hold a block of any class. Align `memory` to `ALIGN_SIZE` bytes to avoid any padding.
    pub fn new(memory: &'m mut [u8], configs: &[ClassConfig; N]) -> Result<Self, Error> {
        let align = usize::from(consts::ALIGN_SIZE);
        let ptr = memory.as_mut_ptr();

        // align the pointer
        let (start, _) = util::round_up(ptr as usize, align);
        let padding = start - ptr as usize;
        let len = memory.len().saturating_sub(padding);

        if (len >> consts::ALIGN_SIZE_LOG2) >= u32::MAX as usize {
            return Err(Error::RegionTooLarge);
        }

        let plan = plan::plan(len, configs)?;

        // `plan` succeeded so at least one block (and the padding) fits in `memory`
        let anchor = Anchor::new(unsafe { NonNull::new_unchecked(ptr.add(padding)) });

        let mut start = 0;
        let classes = core::array::from_fn(|i| {
            let size = plan.block_sizes()[i];
            let count = plan.block_counts()[i];
            let class = unsafe { Class::layout(anchor, start, size, count) };

            debug!(
                "class {}: {} block(s) of {} bytes at {:#x}..{:#x}",
                i,
                count,
                size,
                start,
                class.end()
            );

            start = class.end();
            class
        });

        Ok(Pool {
            anchor,
            len: plan.total(),
            classes,
            used_bytes: 0,
            highwater_bytes: 0,
            _memory: PhantomData,
        })
    }

    /* Public API */
    /// Returns a block of at least `size` bytes, aligned to `ALIGN_SIZE` bytes
    ///
    /// The block comes from the smallest class that fits `size` and still has free blocks. Returns
    /// `None` when `size` is zero or when no such class exists; the pool is left untouched.
    pub fn alloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }

        match self.find_class(0, size) {
            Some(i) => self.take(i),
            None => {
                trace!("alloc({}): out of memory", size);
                None
            }
        }
    }

    /// Returns the block referenced by `ptr` to the pool; does nothing if `ptr` is `None`
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `alloc` or `realloc` on this pool and must not have been
    /// freed since.
    pub unsafe fn free(&mut self, ptr: Option<NonNull<u8>>) {
        if let Some(ptr) = ptr {
            let i = self.owner(ptr);
            self.give_back(i, ptr);
        }
    }

    /// Resizes the allocation referenced by `ptr` to `new_size` bytes
    ///
    /// - `realloc(None, n)` behaves like `alloc(n)`
    /// - `realloc(Some(ptr), 0)` behaves like `free(Some(ptr))` and returns `None`
    /// - When the block is large enough the allocation moves to the smallest smaller class that
    ///   fits `new_size` and has a free block, copying the first `new_size` bytes. If there's no
    ///   such class `ptr` is returned unchanged
    /// - When the block is too small the allocation moves to the first larger class that fits
    ///   `new_size` and has a free block, copying the *whole* old block. If there's no such class
    ///   `None` is returned and `ptr` remains valid
    ///
    /// # Safety
    ///
    /// Same as [`Pool::free`].
    pub unsafe fn realloc(
        &mut self,
        ptr: Option<NonNull<u8>>,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        let ptr = match ptr {
            Some(ptr) => ptr,
            None => return self.alloc(new_size),
        };

        if new_size == 0 {
            self.free(Some(ptr));
            return None;
        }

        let i = self.owner(ptr);
        let old_size = self.classes[i].block_size();

        if new_size <= old_size {
            // shrink into a smaller class, if one has room
            let j = if let Some(j) = self.find_class(0, new_size).filter(|&j| j < i) {
                j
            } else {
                return Some(ptr);
            };

            let new_ptr = self.take(j)?;
            core::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), new_size);
            self.give_back(i, ptr);

            trace!("realloc({}): class {} -> class {}", new_size, i, j);

            Some(new_ptr)
        } else {
            let j = if let Some(j) = self.find_class(i + 1, new_size) {
                j
            } else {
                trace!("realloc({}): no room above class {}", new_size, i);
                return None;
            };

            let new_ptr = self.take(j)?;
            // NOTE the caller's logical size is unknown so the whole block is copied
            core::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_size);
            self.give_back(i, ptr);

            trace!("realloc({}): class {} -> class {}", new_size, i, j);

            Some(new_ptr)
        }
    }

    /// Creates the compressor for pointers into this pool and, optionally, a ROM table
    ///
    /// The compressor copies what it needs from the pool so the pool can keep serving requests;
    /// the blocks it decodes to are only meaningful while the pool's memory is alive.
    pub fn compressor<'r>(&self, rom: Option<RomTable<'r>>) -> Result<Compressor<'r>, Error> {
        Compressor::new(self.anchor, self.len, rom)
    }

    /* Introspection */
    /// Number of size classes
    pub fn class_count(&self) -> usize {
        N
    }

    /// Index of the class `ptr` belongs to, or `None` if `ptr` is not the start of one of this
    /// pool's blocks
    pub fn class_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let offset = self.anchor.byte_offset(ptr);
        if offset >= self.len {
            return None;
        }

        self.classes
            .iter()
            .position(|class| offset < class.end())
            .filter(|&i| self.classes[i].is_block_start(offset))
    }

    /// Whether `ptr` is the start of one of this pool's blocks
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.class_of(ptr).is_some()
    }

    /// Size of the block backing `ptr`
    pub fn usable_size(&self, ptr: NonNull<u8>) -> Option<usize> {
        self.class_of(ptr).map(|i| self.classes[i].block_size())
    }

    /// Occupancy of the class at `index`
    pub fn class_stats(&self, index: usize) -> Option<ClassStats> {
        self.classes.get(index).map(Class::stats)
    }

    /// Occupancy of the whole pool
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            used_bytes: self.used_bytes,
            free_bytes: self.len - self.used_bytes,
            highwater_bytes: self.highwater_bytes,
        }
    }

    /* Private API */
    /// First class at or after `from` that fits `size` and has a free block
    fn find_class(&self, from: usize, size: usize) -> Option<usize> {
        self.classes
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, class)| class.fits(size) && class.has_free())
            .map(|(i, _)| i)
    }

    fn take(&mut self, i: usize) -> Option<NonNull<u8>> {
        let class = &mut self.classes[i];
        let block = unsafe { class.pop(self.anchor)? };

        self.used_bytes += class.block_size();
        if self.used_bytes > self.highwater_bytes {
            self.highwater_bytes = self.used_bytes;
        }

        Some(block)
    }

    unsafe fn give_back(&mut self, i: usize, block: NonNull<u8>) {
        let class = &mut self.classes[i];
        class.push(self.anchor, block);
        self.used_bytes -= class.block_size();
    }

    /// Index of the class that owns `ptr`
    ///
    /// The classes are laid out back to back in ascending order so the first class that ends
    /// after `ptr` owns it
    unsafe fn owner(&self, ptr: NonNull<u8>) -> usize {
        let offset = self.anchor.byte_offset(ptr);
        debug_assert!(offset < self.len, "{:?} is not part of this pool", ptr);

        self.classes
            .iter()
            .position(|class| offset < class.end())
            .unwrap_or_else(|| assume_unreachable!())
    }
}

struct Classes<'a, 'm, const N: usize>(&'a Pool<'m, N>);

impl<const N: usize> fmt::Debug for Classes<'_, '_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let anchor = self.0.anchor;
        f.debug_list()
            .entries(self.0.classes.iter().map(|class| ClassView { anchor, class }))
            .finish()
    }
}

impl<const N: usize> fmt::Debug for Pool<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("base", &self.anchor.base())
            .field("len", &self.len)
            .field("stats", &self.stats())
            .field("classes", &Classes(self))
            .finish()
    }
}

#[cfg(feature = "ufmt")]
impl<const N: usize> ufmt::uDebug for Pool<'_, N> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.debug_struct("Pool")?
            .field("len", &(self.len as u32))?
            .field("stats", &self.stats())?
            .field("classes", &ClassStatsList(self))?
            .finish()
    }
}

#[cfg(feature = "ufmt")]
struct ClassStatsList<'a, 'm, const N: usize>(&'a Pool<'m, N>);

#[cfg(feature = "ufmt")]
impl<const N: usize> ufmt::uDebug for ClassStatsList<'_, '_, N> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.debug_list()?
            .entries(self.0.classes.iter().map(Class::stats))?
            .finish()
    }
}
